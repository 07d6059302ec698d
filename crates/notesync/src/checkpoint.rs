//! Queue → process → finalize, each step a separate invocation.
//!
//! Nothing is kept in memory between steps. Temporary artifacts carry the
//! identifiers of their source in storage-side app properties, so each step
//! rebuilds its state from the one id it is handed.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::artifact::ArtifactKind;
use crate::error::Result;
use crate::query::FileQuery;
use crate::storage::{
    ArtifactWriter, FileEntry, Layout, NewFile, StorageError, StorageService,
};
use crate::summarize::{PromptStore, Summarizer};

pub const ORIGINAL_ID_KEY: &str = "original_id";
pub const TEMP_ID_KEY: &str = "temp_id";
pub const STAGE_KEY: &str = "checkpoint_stage";

const STAGE_QUEUED: &str = "queued";
const STAGE_PROCESSED: &str = "processed";

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("Original file '{file_id}' no longer exists")]
    MissingOriginal { file_id: String },

    #[error("File '{file_id}' is not a checkpoint artifact")]
    NotCheckpoint { file_id: String },

    #[error("File '{file_id}' is at checkpoint stage '{found}', expected '{expected}'")]
    WrongStage {
        file_id: String,
        expected: &'static str,
        found: String,
    },

    #[error("original_id '{provided}' does not match checkpoint source '{expected}'")]
    OriginalMismatch { expected: String, provided: String },
}

impl CheckpointError {
    /// Errors caused by the caller's parameters rather than by a collaborator.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            CheckpointError::MissingParameter(_)
                | CheckpointError::NotCheckpoint { .. }
                | CheckpointError::WrongStage { .. }
                | CheckpointError::OriginalMismatch { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedCheckpoint {
    pub temp_id: String,
    pub original_id: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedCheckpoint {
    pub result_id: String,
    pub temp_id: String,
    pub original_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalizedCheckpoint {
    pub summary_id: String,
    pub filename: String,
    pub original_id: String,
    pub archived_as: Option<String>,
}

/// Result of queueing every eligible text artifact.
#[derive(Debug, Default, Clone, Serialize)]
pub struct QueueSummary {
    pub queued: Vec<QueuedCheckpoint>,
    /// Names skipped because a checkpoint for them is already pending.
    pub pending: Vec<String>,
    pub failed: Vec<QueueFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueFailure {
    pub filename: String,
    pub error: String,
}

pub struct CheckpointController {
    storage: Arc<dyn StorageService>,
    layout: Arc<Layout>,
    writer: Arc<ArtifactWriter>,
    prompts: Arc<PromptStore>,
}

impl CheckpointController {
    pub fn new(
        storage: Arc<dyn StorageService>,
        layout: Arc<Layout>,
        writer: Arc<ArtifactWriter>,
        prompts: Arc<PromptStore>,
    ) -> Self {
        Self {
            storage,
            layout,
            writer,
            prompts,
        }
    }

    fn get_original(&self, original_id: &str) -> Result<FileEntry> {
        self.storage.get(original_id).map_err(|e| match e {
            StorageError::NotFound { id } => CheckpointError::MissingOriginal { file_id: id }.into(),
            other => other.into(),
        })
    }

    /// The original id recorded on a checkpoint artifact at `stage`.
    fn source_of(
        entry: &FileEntry,
        stage: &'static str,
    ) -> std::result::Result<String, CheckpointError> {
        let (Some(original_id), Some(found)) =
            (entry.property(ORIGINAL_ID_KEY), entry.property(STAGE_KEY))
        else {
            return Err(CheckpointError::NotCheckpoint {
                file_id: entry.id.clone(),
            });
        };
        if found != stage {
            return Err(CheckpointError::WrongStage {
                file_id: entry.id.clone(),
                expected: stage,
                found: found.to_string(),
            });
        }
        Ok(original_id.to_string())
    }

    /// Copies the text of `original_id` into the temp folder.
    pub fn queue(&self, original_id: &str) -> Result<QueuedCheckpoint> {
        if original_id.is_empty() {
            return Err(CheckpointError::MissingParameter("original_id").into());
        }
        let original = self.get_original(original_id)?;
        self.queue_entry(&original)
    }

    fn queue_entry(&self, original: &FileEntry) -> Result<QueuedCheckpoint> {
        let content = self.storage.get_media(&original.id)?;
        let temp_folder = self.layout.temp()?;

        let metadata = NewFile::new(format!("temp_{}", original.name), "text/plain")
            .in_parent(temp_folder)
            .with_property(ORIGINAL_ID_KEY, original.id.as_str())
            .with_property(STAGE_KEY, STAGE_QUEUED);
        let temp_id = self.storage.create(&metadata, Some(&content))?;

        info!(
            file = %original.name,
            original_id = %original.id,
            temp_id = %temp_id,
            "Queued for processing"
        );
        Ok(QueuedCheckpoint {
            temp_id,
            original_id: original.id.clone(),
            filename: original.name.clone(),
        })
    }

    /// Queues every active text artifact that has no checkpoint pending.
    pub fn queue_pending(&self) -> Result<QueueSummary> {
        let temp_folder = self.layout.temp()?;
        let pending: HashSet<String> = self
            .storage
            .list(&FileQuery::new().in_parent(temp_folder).not_trashed())?
            .iter()
            .filter_map(|entry| entry.property(ORIGINAL_ID_KEY).map(str::to_string))
            .collect();

        let mut summary = QueueSummary::default();
        for entry in self.writer.list_active(ArtifactKind::Text)? {
            if self.prompts.is_template(&entry) {
                continue;
            }
            if pending.contains(&entry.id) {
                info!(file = %entry.name, "Checkpoint already pending, skipping");
                summary.pending.push(entry.name.clone());
                continue;
            }
            match self.queue_entry(&entry) {
                Ok(queued) => summary.queued.push(queued),
                Err(e) => {
                    warn!(file = %entry.name, "Failed to queue: {}", e);
                    summary.failed.push(QueueFailure {
                        filename: entry.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(summary)
    }

    /// Summarizes a queued artifact into a result artifact in the temp folder.
    pub fn process(&self, temp_id: &str, summarizer: &Summarizer) -> Result<ProcessedCheckpoint> {
        if temp_id.is_empty() {
            return Err(CheckpointError::MissingParameter("temp_id").into());
        }
        let queued = self.storage.get(temp_id)?;
        let original_id = Self::source_of(&queued, STAGE_QUEUED)?;

        let text = String::from_utf8_lossy(&self.storage.get_media(temp_id)?).into_owned();
        let instructions = self.prompts.load()?;
        let summary = summarizer.summarize(&text, &instructions)?;

        let temp_folder = self.layout.temp()?;
        let metadata = NewFile::new(format!("result_{}", temp_id), ArtifactKind::Summary.mime_type())
            .in_parent(temp_folder)
            .with_property(ORIGINAL_ID_KEY, original_id.as_str())
            .with_property(TEMP_ID_KEY, temp_id)
            .with_property(STAGE_KEY, STAGE_PROCESSED);
        let result_id = self.storage.create(&metadata, Some(summary.as_bytes()))?;

        info!(temp_id = %temp_id, result_id = %result_id, "Processed checkpoint");
        Ok(ProcessedCheckpoint {
            result_id,
            temp_id: temp_id.to_string(),
            original_id,
        })
    }

    /// Writes the result under its permanent name, archives the original and
    /// removes the checkpoint's temporary artifacts.
    pub fn finalize(
        &self,
        result_id: &str,
        original_id: Option<&str>,
    ) -> Result<FinalizedCheckpoint> {
        if result_id.is_empty() {
            return Err(CheckpointError::MissingParameter("result_id").into());
        }
        let result = self.storage.get(result_id)?;
        let stored_original = Self::source_of(&result, STAGE_PROCESSED)?;
        if let Some(provided) = original_id {
            if provided != stored_original {
                return Err(CheckpointError::OriginalMismatch {
                    expected: stored_original,
                    provided: provided.to_string(),
                }
                .into());
            }
        }

        let original = self.get_original(&stored_original)?;
        let summary = self.storage.get_media(result_id)?;
        let base = ArtifactKind::Text.base_name(&original.name).to_string();
        let summary_id = self.writer.write(&base, ArtifactKind::Summary, &summary)?;

        let archive = self.layout.archive()?;
        let archived_as = if original.parents.contains(&archive) {
            None
        } else {
            Some(self.writer.archive_existing(&original, ArtifactKind::Text)?)
        };

        let mut temporaries = vec![result.id.clone()];
        if let Some(temp_id) = result.property(TEMP_ID_KEY) {
            temporaries.push(temp_id.to_string());
        }
        self.cleanup(&temporaries);

        info!(
            file = %original.name,
            summary_id = %summary_id,
            "Finalized checkpoint"
        );
        Ok(FinalizedCheckpoint {
            summary_id,
            filename: ArtifactKind::Summary.file_name(&base),
            original_id: stored_original,
            archived_as,
        })
    }

    /// Best-effort deletion; failures are logged and swallowed.
    fn cleanup(&self, ids: &[String]) {
        for id in ids {
            if let Err(e) = self.storage.delete(id) {
                warn!(file_id = %id, "Failed to delete temporary file: {}", e);
            }
        }
    }
}
