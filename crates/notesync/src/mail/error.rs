use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mail request '{operation}' failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },

    #[error("Mail request '{operation}' returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to decode '{operation}' response: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    #[error("Message '{id}' not found")]
    NotFound { id: String },
}

pub type Result<T> = std::result::Result<T, MailError>;
