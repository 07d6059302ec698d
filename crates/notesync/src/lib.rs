pub mod app;
pub mod artifact;
pub mod auth;
pub mod checkpoint;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod inbox;
pub mod mail;
pub mod pipeline;
pub mod query;
pub mod response;
pub mod sanitize;
pub mod secrets;
pub mod storage;
pub mod summarize;

pub use app::{invoke, App, Command, Services};
pub use artifact::ArtifactKind;
pub use auth::{AuthError, CredentialProvider, Credentials, GoogleSession};
pub use checkpoint::{CheckpointController, FinalizedCheckpoint, ProcessedCheckpoint, QueuedCheckpoint};
pub use config::{load_config, Config};
pub use error::{
    ConfigError, ErrorKind, ExtractionError, FetchError, NotesyncError, Result,
};
pub use inbox::{Candidate, DownloadLinks, InboxScanner, LinkExtractor};
pub use mail::{MailError, MailService};
pub use response::{Response, Status};
pub use secrets::{resolve_secret, SecretError};
pub use storage::{ArtifactWriter, FolderResolver, Layout, StorageError, StorageService};
pub use summarize::{CompletionError, CompletionService, PromptStore, Summarizer};
