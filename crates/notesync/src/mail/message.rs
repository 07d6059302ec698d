use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

pub const LABEL_UNREAD: &str = "UNREAD";
pub const LABEL_INBOX: &str = "INBOX";

/// A search hit: just enough to fetch the full message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartBody {
    /// URL-safe base64, padding optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: PartBody,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl MessagePart {
    /// Depth-first search for the first part with the given MIME type and inline data.
    pub fn find(&self, mime_type: &str) -> Option<&MessagePart> {
        if self.mime_type.eq_ignore_ascii_case(mime_type) && self.body.data.is_some() {
            return Some(self);
        }
        self.parts.iter().find_map(|part| part.find(mime_type))
    }

    pub fn decoded_text(&self) -> Result<String, ExtractionError> {
        let data = self.body.data.as_deref().unwrap_or_default();
        decode_body(data)
    }

    fn leaf(mime_type: &str, text: &str) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            body: PartBody {
                data: Some(URL_SAFE.encode(text)),
                size: text.len() as u64,
            },
            ..Self::default()
        }
    }
}

/// A full message as returned by `format=full`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub payload: MessagePart,
}

impl Message {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn subject(&self) -> &str {
        self.header("Subject").unwrap_or_default()
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.label_ids.iter().any(|l| l == label)
    }

    /// The decoded HTML body, wherever it sits in the MIME tree.
    pub fn html_body(&self) -> Result<String, ExtractionError> {
        self.payload
            .find("text/html")
            .ok_or_else(|| ExtractionError::NoHtmlBody {
                message_id: self.id.clone(),
            })?
            .decoded_text()
    }

    /// All decoded text/plain and text/html bodies, for local full-text matching.
    pub fn searchable_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.payload, &mut out);
        out
    }

    /// An unread inbox message with a `multipart/alternative` plain + HTML body.
    pub fn html(id: &str, subject: &str, html: &str) -> Self {
        let plain = Self::plain(id, subject, "");
        Self {
            payload: MessagePart {
                mime_type: "multipart/alternative".to_string(),
                headers: plain.payload.headers,
                parts: vec![
                    MessagePart::leaf("text/plain", "Open this message in HTML."),
                    MessagePart::leaf("text/html", html),
                ],
                ..MessagePart::default()
            },
            ..plain
        }
    }

    /// An unread inbox message with a single text/plain body.
    pub fn plain(id: &str, subject: &str, text: &str) -> Self {
        let mut payload = MessagePart::leaf("text/plain", text);
        payload.headers.push(Header {
            name: "Subject".to_string(),
            value: subject.to_string(),
        });
        Self {
            id: id.to_string(),
            label_ids: vec![LABEL_UNREAD.to_string(), LABEL_INBOX.to_string()],
            snippet: String::new(),
            payload,
        }
    }
}

fn collect_text(part: &MessagePart, out: &mut String) {
    let is_text = part.mime_type.eq_ignore_ascii_case("text/plain")
        || part.mime_type.eq_ignore_ascii_case("text/html");
    if is_text {
        if let Ok(text) = part.decoded_text() {
            out.push_str(&text);
            out.push('\n');
        }
    }
    for child in &part.parts {
        collect_text(child, out);
    }
}

/// Decodes URL-safe base64 with or without padding into UTF-8 text.
pub fn decode_body(data: &str) -> Result<String, ExtractionError> {
    let trimmed = data.trim().trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|e| ExtractionError::InvalidEncoding(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExtractionError::InvalidEncoding(e.to_string()))
}

/// Labels to add to and remove from a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelChange {
    #[serde(rename = "addLabelIds", skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<String>,
    #[serde(rename = "removeLabelIds", skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
}

impl LabelChange {
    /// Removes `UNREAD` and `INBOX`.
    pub fn mark_read_and_archive() -> Self {
        Self {
            add: Vec::new(),
            remove: vec![LABEL_UNREAD.to_string(), LABEL_INBOX.to_string()],
        }
    }

    pub fn apply(&self, labels: &mut Vec<String>) {
        labels.retain(|l| !self.remove.contains(l));
        for label in &self.add {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_body_nested() {
        let inner = Message::html("m1", "s", "<p>hello</p>");
        let nested = Message {
            payload: MessagePart {
                mime_type: "multipart/mixed".to_string(),
                headers: inner.payload.headers.clone(),
                parts: vec![inner.payload.clone()],
                ..MessagePart::default()
            },
            ..inner
        };
        assert_eq!(nested.html_body().unwrap(), "<p>hello</p>");
        assert_eq!(nested.subject(), "s");
    }

    #[test]
    fn test_missing_html_body() {
        let msg = Message::plain("m2", "subject", "text only");
        assert!(matches!(
            msg.html_body(),
            Err(ExtractionError::NoHtmlBody { message_id }) if message_id == "m2"
        ));
    }

    #[test]
    fn test_decode_body_with_and_without_padding() {
        assert_eq!(decode_body("aGk=").unwrap(), "hi");
        assert_eq!(decode_body("aGk").unwrap(), "hi");
        assert!(decode_body("!!!").is_err());
    }

    #[test]
    fn test_parse_gmail_payload() {
        let json = r#"{
            "id": "abc",
            "labelIds": ["UNREAD", "INBOX"],
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [{"name": "subject", "value": "You sent a file \"Notes\""}],
                "body": {"size": 0},
                "parts": [
                    {"mimeType": "text/html", "body": {"size": 2, "data": "PGI-"}}
                ]
            }
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.subject(), "You sent a file \"Notes\"");
        assert!(msg.has_label(LABEL_UNREAD));
        assert_eq!(msg.html_body().unwrap(), "<b>");
    }

    #[test]
    fn test_label_change() {
        let change = LabelChange::mark_read_and_archive();
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["removeLabelIds"][0], "UNREAD");
        assert!(json.get("addLabelIds").is_none());

        let mut labels = vec!["UNREAD".to_string(), "INBOX".to_string(), "X".to_string()];
        change.apply(&mut labels);
        assert_eq!(labels, vec!["X".to_string()]);
    }
}
