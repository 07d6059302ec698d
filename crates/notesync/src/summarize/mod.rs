//! Summarization of notebook text through a language-model completion.

mod completion;
mod openai;
mod prompt;

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::CompletionConfig;

pub use completion::{CompletionError, CompletionRequest, CompletionService, ScriptedCompletion};
pub use openai::OpenAiClient;
pub use prompt::PromptStore;

/// Separates the instruction template from the notebook text in the user prompt.
pub const TEXT_MARKER: &str = "\n\nText to process:\n";

/// Builds the user prompt for `text` under `instructions`.
pub fn user_prompt(text: &str, instructions: &str) -> String {
    format!("{}{}{}", instructions.trim_end(), TEXT_MARKER, text)
}

pub struct Summarizer {
    completion: Arc<dyn CompletionService>,
    config: CompletionConfig,
}

impl Summarizer {
    pub fn new(completion: Arc<dyn CompletionService>, config: CompletionConfig) -> Self {
        Self { completion, config }
    }

    /// One completion round-trip. The output is trimmed but not validated.
    pub fn summarize(&self, text: &str, instructions: &str) -> Result<String, CompletionError> {
        let request = CompletionRequest {
            system: self.config.system_prompt.clone(),
            user: user_prompt(text, instructions),
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };
        debug!(model = %request.model, chars = text.len(), "Requesting summary");

        let output = self.completion.complete(&request)?;
        let summary = output.trim().to_string();
        info!(model = %request.model, chars = summary.len(), "Received summary");
        Ok(summary)
    }
}
