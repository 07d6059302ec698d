use std::time::{Duration, Instant};

use tracing::{info, info_span, warn};

use super::dedup::NameDedup;
use super::outcome::CandidateOutcome;
use crate::artifact::ArtifactKind;
use crate::error::Result;
use crate::fetch::FetchStage;
use crate::inbox::{Candidate, InboxScanner, LinkExtractor};

/// Result of one import batch.
#[derive(Debug, Clone)]
pub struct ImportReport {
    pub outcomes: Vec<CandidateOutcome>,
    pub elapsed: Duration,
}

impl ImportReport {
    /// True when the inbox search matched nothing.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_error()).count()
    }
}

/// Moves every matching notification's exports into storage.
///
/// Candidates are processed one at a time in search order. A failing
/// candidate is recorded and left unread; it never aborts the batch.
pub struct ImportRunner {
    scanner: InboxScanner,
    extractor: LinkExtractor,
    fetch: FetchStage,
}

impl ImportRunner {
    pub fn new(scanner: InboxScanner, extractor: LinkExtractor, fetch: FetchStage) -> Self {
        Self {
            scanner,
            extractor,
            fetch,
        }
    }

    /// Fails only when the inbox search itself fails.
    pub fn run(&self) -> Result<ImportReport> {
        let started = Instant::now();
        let candidates = self.scanner.find_candidates()?;
        let mut dedup = NameDedup::new();
        let mut outcomes = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let candidate = match candidate {
                Ok(candidate) => candidate,
                Err(failure) => {
                    outcomes.push(CandidateOutcome::Error {
                        message_id: failure.message_id,
                        filename: None,
                        error: failure.error.to_string(),
                    });
                    continue;
                }
            };

            let _span = info_span!(
                "import_candidate",
                message_id = %candidate.id,
                filename = %candidate.filename,
            )
            .entered();

            if !dedup.admit(&candidate.filename) {
                outcomes.push(self.skip(&candidate));
                continue;
            }

            let outcome = match self.import(&candidate) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Candidate failed: {}", e);
                    CandidateOutcome::Error {
                        message_id: candidate.id.clone(),
                        filename: Some(candidate.filename.clone()),
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let report = ImportReport {
            outcomes,
            elapsed: started.elapsed(),
        };
        info!(
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Import batch complete"
        );
        Ok(report)
    }

    fn import(&self, candidate: &Candidate) -> Result<CandidateOutcome> {
        // Step 1: Resolve download links
        let links = {
            let _step = info_span!("extract_links").entered();
            self.extractor.extract_urls(candidate.html_body()?)?
        };

        // Step 2: Download and store the document, then the optional text
        let pdf_file_id = {
            let _step = info_span!("materialize", kind = "document").entered();
            self.fetch.materialize(
                &links.document_url,
                &candidate.filename,
                ArtifactKind::Document,
            )?
        };
        let txt_file_id = match links.text_url.as_deref() {
            Some(url) => {
                let _step = info_span!("materialize", kind = "text").entered();
                Some(
                    self.fetch
                        .materialize(url, &candidate.filename, ArtifactKind::Text)?,
                )
            }
            None => None,
        };

        // Step 3: Only now is the message marked read and archived
        self.scanner.mark_consumed(&candidate.id)?;

        info!("Imported candidate");
        Ok(CandidateOutcome::Success {
            message_id: candidate.id.clone(),
            filename: candidate.filename.clone(),
            pdf_file_id,
            txt_file_id,
        })
    }

    /// A same-name candidate is superseded by the first one in the batch and
    /// is consumed so it does not come back on every run.
    fn skip(&self, candidate: &Candidate) -> CandidateOutcome {
        info!("Skipping duplicate filename");
        if let Err(e) = self.scanner.mark_consumed(&candidate.id) {
            warn!("Failed to mark duplicate as read: {}", e);
        }
        CandidateOutcome::Skipped {
            message_id: candidate.id.clone(),
            filename: candidate.filename.clone(),
            reason: "duplicate filename in batch".to_string(),
        }
    }
}
