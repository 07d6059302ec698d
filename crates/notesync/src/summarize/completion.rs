use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Completion request failed: {0}")]
    Request(String),

    #[error("Completion API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode completion response: {0}")]
    Decode(String),

    #[error("Completion response contained no choices")]
    EmptyResponse,
}

/// One single-turn completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

pub trait CompletionService: Send + Sync {
    /// Returns the model's raw text output.
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

type Script = Box<dyn Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync>;

/// A completion service driven by a closure, recording every request.
pub struct ScriptedCompletion {
    script: Script,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new(
        script: impl Fn(&CompletionRequest) -> Result<String, CompletionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers with a Markdown heading followed by the user prompt, padded with
    /// whitespace the caller is expected to trim.
    pub fn echo() -> Self {
        Self::new(|request| Ok(format!("\n  ### Summary\n\n{}\n\n", request.user)))
    }

    pub fn failing(status: u16) -> Self {
        Self::new(move |_| {
            Err(CompletionError::Status {
                status,
                body: "scripted failure".to_string(),
            })
        })
    }

    fn recorded(&self) -> MutexGuard<'_, Vec<CompletionRequest>> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.recorded().clone()
    }
}

impl CompletionService for ScriptedCompletion {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        self.recorded().push(request.clone());
        (self.script)(request)
    }
}
