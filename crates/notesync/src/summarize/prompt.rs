use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::PromptConfig;
use crate::storage::{FileEntry, Layout, NewFile, StorageError, StorageService};
use crate::query::FileQuery;

/// The user-editable instruction template stored next to the notebooks.
pub struct PromptStore {
    storage: Arc<dyn StorageService>,
    layout: Arc<Layout>,
    config: PromptConfig,
}

impl PromptStore {
    pub fn new(storage: Arc<dyn StorageService>, layout: Arc<Layout>, config: PromptConfig) -> Self {
        Self {
            storage,
            layout,
            config,
        }
    }

    /// Reads the template, creating it with the default body when absent.
    ///
    /// After creating it the file is read back up to `read_retries` times;
    /// if it never becomes readable the in-memory default is used.
    pub fn load(&self) -> Result<String, StorageError> {
        let root = self.layout.root()?;
        let existing = self.storage.list(
            &FileQuery::new()
                .name(self.config.file_name.as_str())
                .in_parent(root.as_str())
                .not_trashed(),
        )?;

        if let Some(entry) = existing.first() {
            let bytes = self.storage.get_media(&entry.id)?;
            debug!(file = %entry.name, "Loaded prompt template");
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }

        let id = self.storage.create(
            &NewFile::new(self.config.file_name.as_str(), "text/plain").in_parent(root),
            Some(self.config.default_template.as_bytes()),
        )?;
        info!(file = %self.config.file_name, id = %id, "Created default prompt template");

        let delay = Duration::from_millis(self.config.retry_delay_ms);
        for attempt in 1..=self.config.read_retries {
            match self.storage.get_media(&id) {
                Ok(bytes) => return Ok(String::from_utf8_lossy(&bytes).into_owned()),
                Err(e) => {
                    debug!(attempt, "Prompt template not readable yet: {}", e);
                    if attempt < self.config.read_retries && !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
            }
        }

        warn!(
            file = %self.config.file_name,
            retries = self.config.read_retries,
            "Prompt template unreadable after creation, using built-in default"
        );
        Ok(self.config.default_template.clone())
    }

    pub fn is_template(&self, entry: &FileEntry) -> bool {
        entry.name == self.config.file_name
    }
}
