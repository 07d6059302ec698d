pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, load_config_or_default, CONFIG_ENV_VAR};
pub use schema::{
    ArchiveConfig, CompletionConfig, Config, DownloadConfig, FolderConfig, InboxConfig,
    PromptConfig,
};
