use std::sync::{Mutex, MutexGuard};

use super::error::{MailError, Result};
use super::message::{LabelChange, Message, MessageRef, LABEL_UNREAD};
use super::MailService;
use crate::query::MailQuery;

#[derive(Debug, Default)]
struct State {
    messages: Vec<Message>,
    modifications: Vec<(String, LabelChange)>,
}

/// A mailbox held in memory. Search matches phrases case-insensitively
/// against the subject and decoded bodies, and returns messages in
/// insertion order.
#[derive(Debug, Default)]
pub struct MemoryMailbox {
    state: Mutex<State>,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        let mailbox = Self::new();
        for message in messages {
            mailbox.push(message);
        }
        mailbox
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push(&self, message: Message) {
        self.state().messages.push(message);
    }

    pub fn labels(&self, id: &str) -> Option<Vec<String>> {
        self.state()
            .messages
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.label_ids.clone())
    }

    /// Every modify call received, in order.
    pub fn modifications(&self) -> Vec<(String, LabelChange)> {
        self.state().modifications.clone()
    }

    fn matches(message: &Message, query: &MailQuery) -> bool {
        if query.is_unread_only() && !message.has_label(LABEL_UNREAD) {
            return false;
        }
        let subject = message.subject().to_lowercase();
        if let Some(phrase) = query.subject_phrase() {
            if !subject.contains(&phrase.to_lowercase()) {
                return false;
            }
        }
        if query.phrases().is_empty() {
            return true;
        }
        let text = format!("{}\n{}", subject, message.searchable_text().to_lowercase());
        query
            .phrases()
            .iter()
            .all(|phrase| text.contains(&phrase.to_lowercase()))
    }
}

impl MailService for MemoryMailbox {
    fn search(&self, query: &MailQuery) -> Result<Vec<MessageRef>> {
        Ok(self
            .state()
            .messages
            .iter()
            .filter(|m| Self::matches(m, query))
            .map(|m| MessageRef {
                id: m.id.clone(),
                thread_id: None,
            })
            .collect())
    }

    fn get(&self, id: &str) -> Result<Message> {
        self.state()
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| MailError::NotFound { id: id.to_string() })
    }

    fn modify(&self, id: &str, change: &LabelChange) -> Result<()> {
        let mut state = self.state();
        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| MailError::NotFound { id: id.to_string() })?;
        change.apply(&mut message.label_ids);
        state.modifications.push((id.to_string(), change.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> MailQuery {
        MailQuery::new()
            .subject("you sent a file")
            .phrase("from your kindle")
            .unread_only(true)
    }

    #[test]
    fn test_search_filters_subject_phrase_and_unread() {
        let mailbox = MemoryMailbox::with_messages([
            Message::html("1", "You sent a file \"A\"", "<p>Sent from your Kindle</p>"),
            Message::html("2", "Weekly digest", "<p>Sent from your Kindle</p>"),
            Message::html("3", "You sent a file \"B\"", "<p>hello</p>"),
        ]);

        let hits = mailbox.search(&query()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");

        mailbox
            .modify("1", &LabelChange::mark_read_and_archive())
            .unwrap();
        assert!(mailbox.search(&query()).unwrap().is_empty());
        assert_eq!(mailbox.labels("1"), Some(Vec::new()));
        assert_eq!(mailbox.modifications().len(), 1);
    }

    #[test]
    fn test_get_unknown_message() {
        let mailbox = MemoryMailbox::new();
        assert!(matches!(mailbox.get("x"), Err(MailError::NotFound { .. })));
    }
}
