use std::path::PathBuf;
use thiserror::Error;

use crate::auth::AuthError;
use crate::checkpoint::CheckpointError;
use crate::mail::MailError;
use crate::secrets::SecretError;
use crate::storage::StorageError;
use crate::summarize::CompletionError;

#[derive(Error, Debug)]
pub enum NotesyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Download error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Coarse classification used at the outer boundary to pick a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid credentials, keys or config. Fatal for the invocation.
    Configuration,
    /// The caller supplied missing or inconsistent parameters.
    BadRequest,
    /// A single candidate could not be extracted. Never fatal for a batch.
    Extraction,
    /// A collaborator call (mail, storage, completion, raw download) failed.
    Upstream,
}

impl NotesyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NotesyncError::Config(_) | NotesyncError::Secret(_) | NotesyncError::Auth(_) => {
                ErrorKind::Configuration
            }
            NotesyncError::Extraction(_) => ErrorKind::Extraction,
            NotesyncError::Checkpoint(e) if e.is_bad_request() => ErrorKind::BadRequest,
            NotesyncError::Mail(_)
            | NotesyncError::Storage(_)
            | NotesyncError::Fetch(_)
            | NotesyncError::Completion(_)
            | NotesyncError::Checkpoint(_) => ErrorKind::Upstream,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("A completion API key is required for this command")]
    CompletionUnavailable,
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("No HTML content found in message {message_id}")]
    NoHtmlBody { message_id: String },

    #[error("No document download link found in the message body")]
    NoDocumentLink,

    #[error("Message body is not valid UTF-8: {0}")]
    InvalidEncoding(String),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Download from {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("No content registered for {url}")]
    Unknown { url: String },
}

pub type Result<T> = std::result::Result<T, NotesyncError>;
