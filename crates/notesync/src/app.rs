//! Wiring of collaborators into the batch and checkpoint flows, and the
//! outer boundary that turns every result into a [`Response`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, info_span};
use uuid::Uuid;

use crate::auth::CredentialProvider;
use crate::checkpoint::{CheckpointController, CheckpointError};
use crate::clock::ArchiveClock;
use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::fetch::{Downloader, FetchStage, HttpDownloader};
use crate::inbox::{InboxScanner, LinkExtractor};
use crate::mail::{GmailClient, MailService};
use crate::pipeline::{DistillRunner, ImportRunner};
use crate::response::{Response, Status};
use crate::secrets::{api_key_from_env, token_blob_from_env};
use crate::storage::{ArtifactWriter, DriveClient, Layout, StorageService};
use crate::summarize::{CompletionService, OpenAiClient, PromptStore, Summarizer};

/// One invocation's unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Move notebook exports from the inbox into storage.
    Import,
    /// Summarize every text artifact in one go.
    Distill,
    /// Queue every text artifact without a pending checkpoint.
    Queue,
    Process { temp_id: Option<String> },
    Finalize {
        result_id: Option<String>,
        original_id: Option<String>,
    },
    /// Load and, if needed, refresh the access token.
    CheckToken,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Import => "import",
            Command::Distill => "distill",
            Command::Queue => "queue",
            Command::Process { .. } => "process",
            Command::Finalize { .. } => "finalize",
            Command::CheckToken => "check_token",
        }
    }

    pub fn needs_completion(&self) -> bool {
        matches!(self, Command::Distill | Command::Process { .. })
    }

    /// Rejects missing parameters before any collaborator is contacted.
    pub fn validate(&self) -> std::result::Result<(), CheckpointError> {
        match self {
            Command::Process { temp_id } if is_blank(temp_id) => {
                Err(CheckpointError::MissingParameter("temp_id"))
            }
            Command::Finalize { result_id, .. } if is_blank(result_id) => {
                Err(CheckpointError::MissingParameter("result_id"))
            }
            _ => Ok(()),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// The external collaborators an [`App`] runs against.
pub struct Services {
    pub mail: Arc<dyn MailService>,
    pub storage: Arc<dyn StorageService>,
    pub downloader: Arc<dyn Downloader>,
    pub completion: Option<Arc<dyn CompletionService>>,
}

impl Services {
    /// Builds the REST clients from environment secrets.
    ///
    /// The token blob is always required; the completion API key only when
    /// `with_completion` is set.
    pub fn connect(config: &Config, with_completion: bool) -> Result<Self> {
        let blob = token_blob_from_env()?;
        let completion: Option<Arc<dyn CompletionService>> = if with_completion {
            let api_key = api_key_from_env()?;
            Some(Arc::new(OpenAiClient::new(
                &config.completion.base_url,
                api_key,
            )?))
        } else {
            None
        };

        let session = Arc::new(CredentialProvider::new()?.connect(&blob)?);
        let downloader =
            HttpDownloader::new(Duration::from_secs(config.download.timeout_secs))?;

        Ok(Self {
            mail: Arc::new(GmailClient::new(session.clone())),
            storage: Arc::new(DriveClient::new(session)),
            downloader: Arc::new(downloader),
            completion,
        })
    }
}

pub struct App {
    config: Config,
    services: Services,
    layout: Arc<Layout>,
    writer: Arc<ArtifactWriter>,
    prompts: Arc<PromptStore>,
}

impl App {
    pub fn new(config: Config, services: Services) -> Self {
        let clock = ArchiveClock::from_config(&config.archive);
        Self::with_clock(config, services, clock)
    }

    pub fn with_clock(config: Config, services: Services, clock: ArchiveClock) -> Self {
        let layout = Arc::new(Layout::new(
            services.storage.clone(),
            config.folders.clone(),
        ));
        let writer = Arc::new(ArtifactWriter::new(
            services.storage.clone(),
            layout.clone(),
            clock,
        ));
        let prompts = Arc::new(PromptStore::new(
            services.storage.clone(),
            layout.clone(),
            config.prompt.clone(),
        ));
        Self {
            config,
            services,
            layout,
            writer,
            prompts,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    fn summarizer(&self) -> Result<Summarizer> {
        let completion = self
            .services
            .completion
            .clone()
            .ok_or(ConfigError::CompletionUnavailable)?;
        Ok(Summarizer::new(completion, self.config.completion.clone()))
    }

    fn checkpoints(&self) -> CheckpointController {
        CheckpointController::new(
            self.services.storage.clone(),
            self.layout.clone(),
            self.writer.clone(),
            self.prompts.clone(),
        )
    }

    /// Runs `command` and turns any error into an error response.
    pub fn execute(&self, command: &Command) -> Response {
        match self.run(command) {
            Ok(response) => response,
            Err(e) => {
                error!(command = command.name(), kind = ?e.kind(), "Invocation failed: {}", e);
                Response::from_error(&e)
            }
        }
    }

    pub fn run(&self, command: &Command) -> Result<Response> {
        command.validate()?;
        match command {
            Command::Import => self.import(),
            Command::Distill => self.distill(),
            Command::Queue => self.queue(),
            Command::Process { temp_id } => self.process(temp_id.as_deref().unwrap_or_default()),
            Command::Finalize {
                result_id,
                original_id,
            } => self.finalize(
                result_id.as_deref().unwrap_or_default(),
                original_id.as_deref(),
            ),
            Command::CheckToken => check_token(),
        }
    }

    pub fn import(&self) -> Result<Response> {
        let runner = ImportRunner::new(
            InboxScanner::new(self.services.mail.clone(), &self.config.inbox),
            LinkExtractor::from_config(&self.config.inbox),
            FetchStage::new(self.services.downloader.clone(), self.writer.clone()),
        );
        let report = runner.run()?;

        if report.is_empty() {
            return Ok(Response::ok(Status::NoEmail, "No unread Kindle emails found")
                .with_elapsed(report.elapsed));
        }
        Ok(Response::ok(Status::Success, "Processing complete")
            .with("files_processed", &report.outcomes)
            .with_elapsed(report.elapsed))
    }

    pub fn distill(&self) -> Result<Response> {
        let runner = DistillRunner::new(
            self.services.storage.clone(),
            self.writer.clone(),
            self.prompts.clone(),
            self.summarizer()?,
        );
        let report = runner.run()?;

        if report.is_empty() {
            return Ok(Response::ok(Status::NoFiles, "No new text files found")
                .with_elapsed(report.elapsed));
        }
        Ok(Response::ok(Status::Success, "Text files processed successfully")
            .with("processed", &report.outcomes)
            .with_elapsed(report.elapsed))
    }

    pub fn queue(&self) -> Result<Response> {
        let started = Instant::now();
        let summary = self.checkpoints().queue_pending()?;

        if summary.queued.is_empty() && summary.failed.is_empty() {
            return Ok(Response::ok(Status::NoFiles, "No text files to queue")
                .with("pending", &summary.pending)
                .with_elapsed(started.elapsed()));
        }
        Ok(Response::ok(
            Status::Queued,
            format!("Queued {} file(s) for processing", summary.queued.len()),
        )
        .with("queued", &summary.queued)
        .with("pending", &summary.pending)
        .with("failed", &summary.failed)
        .with_elapsed(started.elapsed()))
    }

    pub fn process(&self, temp_id: &str) -> Result<Response> {
        let started = Instant::now();
        let summarizer = self.summarizer()?;
        let processed = self.checkpoints().process(temp_id, &summarizer)?;

        Ok(Response::ok(Status::Processed, "Queued file processed")
            .with("result_id", &processed.result_id)
            .with("temp_id", &processed.temp_id)
            .with("original_id", &processed.original_id)
            .with_elapsed(started.elapsed()))
    }

    pub fn finalize(&self, result_id: &str, original_id: Option<&str>) -> Result<Response> {
        let started = Instant::now();
        let finalized = self.checkpoints().finalize(result_id, original_id)?;

        Ok(Response::ok(
            Status::Completed,
            format!("Saved {}", finalized.filename),
        )
        .with("md_file_id", &finalized.summary_id)
        .with("filename", &finalized.filename)
        .with("original_id", &finalized.original_id)
        .with("archived_as", &finalized.archived_as)
        .with_elapsed(started.elapsed()))
    }
}

/// Loads the token blob from the environment and reports the token's state.
pub fn check_token() -> Result<Response> {
    let blob = token_blob_from_env()?;
    let credentials = CredentialProvider::new()?.load(&blob)?;

    Ok(Response::ok(Status::Success, "Token is valid")
        .with("refreshed", credentials.refreshed)
        .with(
            "expires_at",
            credentials.expires_at.map(|at| at.to_rfc3339()),
        ))
}

/// Runs one command end to end against the real collaborators.
///
/// Never fails: configuration and upstream errors become a 500 response,
/// missing parameters a 400.
pub fn invoke(config: Config, command: Command) -> Response {
    let run_id = Uuid::new_v4();
    let _span = info_span!("invoke", command = command.name(), run_id = %run_id).entered();
    let started = Instant::now();

    let response = match prepare(config, &command) {
        Ok(Some(app)) => app.execute(&command),
        Ok(None) => match check_token() {
            Ok(response) => response,
            Err(e) => {
                error!(kind = ?e.kind(), "Token check failed: {}", e);
                Response::from_error(&e)
            }
        },
        Err(e) => {
            error!(kind = ?e.kind(), "Invocation could not start: {}", e);
            Response::from_error(&e)
        }
    };

    info!(
        status_code = response.status_code,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Invocation finished"
    );
    response
}

/// Validates parameters, then connects. `None` means no [`App`] is needed.
fn prepare(config: Config, command: &Command) -> Result<Option<App>> {
    command.validate()?;
    if *command == Command::CheckToken {
        return Ok(None);
    }
    let services = Services::connect(&config, command.needs_completion())?;
    Ok(Some(App::new(config, services)))
}
