//! Mail collaborator: search, fetch and relabel messages.

mod error;
mod gmail;
mod memory;
mod message;

pub use error::{MailError, Result};
pub use gmail::{GmailClient, GMAIL_API_BASE};
pub use memory::MemoryMailbox;
pub use message::{
    decode_body, Header, LabelChange, Message, MessagePart, MessageRef, PartBody, LABEL_INBOX,
    LABEL_UNREAD,
};

use crate::query::MailQuery;

pub trait MailService: Send + Sync {
    /// Ids of messages matching `query`, in the order the service returns them.
    fn search(&self, query: &MailQuery) -> Result<Vec<MessageRef>>;

    /// The full message including headers and MIME parts.
    fn get(&self, id: &str) -> Result<Message>;

    fn modify(&self, id: &str, change: &LabelChange) -> Result<()>;
}
