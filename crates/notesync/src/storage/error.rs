//! Storage collaborator error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    /// The request could not be sent or its response could not be read.
    #[error("Storage request '{operation}' failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },

    /// The API answered with a non-success status.
    #[error("Storage request '{operation}' returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("File '{id}' not found")]
    NotFound { id: String },

    /// A create call succeeded without returning an identifier.
    #[error("Storage request '{operation}' returned no file id")]
    MissingId { operation: &'static str },

    /// Wraps a failure of a get-or-create folder call with the folder it was resolving.
    #[error("Folder {operation} failed for '{name}': {source}")]
    Folder {
        operation: &'static str,
        name: String,
        #[source]
        source: Box<StorageError>,
    },
}

impl StorageError {
    pub(crate) fn folder(operation: &'static str, name: &str, source: StorageError) -> Self {
        StorageError::Folder {
            operation,
            name: name.to_string(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
