use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, info_span, warn};

use super::outcome::DistillOutcome;
use crate::artifact::ArtifactKind;
use crate::error::Result;
use crate::storage::{ArtifactWriter, FileEntry, StorageService};
use crate::summarize::{PromptStore, Summarizer};

#[derive(Debug, Clone)]
pub struct DistillReport {
    pub outcomes: Vec<DistillOutcome>,
    pub elapsed: Duration,
}

impl DistillReport {
    /// True when there was no text artifact to process.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }
}

/// Summarizes every active text artifact in a single invocation.
///
/// Each summary is stored as `<base>.md` and the source `.txt` is archived.
pub struct DistillRunner {
    storage: Arc<dyn StorageService>,
    writer: Arc<ArtifactWriter>,
    prompts: Arc<PromptStore>,
    summarizer: Summarizer,
}

impl DistillRunner {
    pub fn new(
        storage: Arc<dyn StorageService>,
        writer: Arc<ArtifactWriter>,
        prompts: Arc<PromptStore>,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            storage,
            writer,
            prompts,
            summarizer,
        }
    }

    pub fn run(&self) -> Result<DistillReport> {
        let started = Instant::now();
        let files: Vec<FileEntry> = self
            .writer
            .list_active(ArtifactKind::Text)?
            .into_iter()
            .filter(|entry| !self.prompts.is_template(entry))
            .collect();

        if files.is_empty() {
            info!("No text files to distill");
            return Ok(DistillReport {
                outcomes: Vec::new(),
                elapsed: started.elapsed(),
            });
        }

        let instructions = self.prompts.load()?;
        let outcomes = files
            .iter()
            .map(|entry| {
                let _span = info_span!("distill_file", file = %entry.name, id = %entry.id).entered();
                match self.distill(entry, &instructions) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("Failed to distill: {}", e);
                        DistillOutcome::Error {
                            original_txt: entry.name.clone(),
                            error: e.to_string(),
                        }
                    }
                }
            })
            .collect();

        let report = DistillReport {
            outcomes,
            elapsed: started.elapsed(),
        };
        info!(
            files = report.outcomes.len(),
            succeeded = report.succeeded(),
            "Distill batch complete"
        );
        Ok(report)
    }

    fn distill(&self, entry: &FileEntry, instructions: &str) -> Result<DistillOutcome> {
        let text = String::from_utf8_lossy(&self.storage.get_media(&entry.id)?).into_owned();
        let summary = self.summarizer.summarize(&text, instructions)?;

        let base = ArtifactKind::Text.base_name(&entry.name);
        let md_file_id = self
            .writer
            .write(base, ArtifactKind::Summary, summary.as_bytes())?;
        let archived_as = self.writer.archive_existing(entry, ArtifactKind::Text)?;

        Ok(DistillOutcome::Success {
            original_txt: entry.name.clone(),
            md_file_id,
            archived_as,
        })
    }
}
