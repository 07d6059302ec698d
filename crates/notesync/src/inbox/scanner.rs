use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::InboxConfig;
use crate::error::ExtractionError;
use crate::mail::{LabelChange, MailError, MailService, Message, MessageRef};
use crate::query::MailQuery;

static QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]+)""#).unwrap());

/// The first double-quoted substring of `subject`, or `fallback`.
pub fn filename_from_subject(subject: &str, fallback: &str) -> String {
    QUOTED
        .captures(subject)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// One matched notification message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub subject: String,
    pub filename: String,
    html_body: Option<String>,
}

impl Candidate {
    pub fn from_message(message: &Message, fallback_filename: &str) -> Self {
        let subject = message.subject().to_string();
        let filename = filename_from_subject(&subject, fallback_filename);
        let html_body = match message.html_body() {
            Ok(html) => Some(html),
            Err(e) => {
                debug!(message_id = %message.id, "No usable HTML body: {}", e);
                None
            }
        };
        Self {
            id: message.id.clone(),
            subject,
            filename,
            html_body,
        }
    }

    pub fn html_body(&self) -> Result<&str, ExtractionError> {
        self.html_body
            .as_deref()
            .ok_or_else(|| ExtractionError::NoHtmlBody {
                message_id: self.id.clone(),
            })
    }
}

/// A matched message that could not be fetched.
#[derive(Debug)]
pub struct CandidateFailure {
    pub message_id: String,
    pub error: MailError,
}

/// Finds notification messages and marks them consumed.
pub struct InboxScanner {
    mail: Arc<dyn MailService>,
    query: MailQuery,
    fallback_filename: String,
}

impl InboxScanner {
    pub fn new(mail: Arc<dyn MailService>, config: &InboxConfig) -> Self {
        let query = MailQuery::new()
            .subject(config.subject_phrase.as_str())
            .phrase(config.body_phrase.as_str())
            .unread_only(config.unread_only);
        Self {
            mail,
            query,
            fallback_filename: config.fallback_filename.clone(),
        }
    }

    pub fn query(&self) -> &MailQuery {
        &self.query
    }

    pub fn search(&self) -> Result<Vec<MessageRef>, MailError> {
        let refs = self.mail.search(&self.query)?;
        info!(query = %self.query.render(), matches = refs.len(), "Searched inbox");
        Ok(refs)
    }

    pub fn load(&self, message: &MessageRef) -> Result<Candidate, MailError> {
        let message = self.mail.get(&message.id)?;
        Ok(Candidate::from_message(&message, &self.fallback_filename))
    }

    /// Search, then load every hit. A hit that cannot be fetched becomes a
    /// [`CandidateFailure`] instead of aborting the rest.
    pub fn find_candidates(&self) -> Result<Vec<Result<Candidate, CandidateFailure>>, MailError> {
        let refs = self.search()?;
        Ok(refs
            .iter()
            .map(|message| {
                self.load(message).map_err(|error| {
                    warn!(message_id = %message.id, "Failed to fetch message: {}", error);
                    CandidateFailure {
                        message_id: message.id.clone(),
                        error,
                    }
                })
            })
            .collect())
    }

    /// Removes the unread and inbox labels so the message is not matched again.
    pub fn mark_consumed(&self, message_id: &str) -> Result<(), MailError> {
        self.mail
            .modify(message_id, &LabelChange::mark_read_and_archive())?;
        debug!(message_id = %message_id, "Marked message read and archived");
        Ok(())
    }
}
