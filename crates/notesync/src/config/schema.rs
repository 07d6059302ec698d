use serde::{Deserialize, Serialize};

/// Instruction given to the model as the system message.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You summarize OCR'd handwritten notes, mostly taken in meetings. \
The text often contains OCR typos and shorthand. Work with what is there and do not invent content.";

/// Body written to the prompt template file the first time it is missing.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Given the text below, produce Markdown with these sections:\n\
\n\
### Summary\n\
A concise, actionable summary. Include the date if the notes mention one. Do not speculate; \
if something is unclear, leave it out.\n\
\n\
### Action Items\n\
Only items explicitly called out as follow-ups. Do not infer tasks that are merely implied.\n\
\n\
### Notes\n\
The complete original text. You may fix obvious OCR errors where the intended word is certain \
from context, but otherwise reproduce it exactly.\n\
\n\
### Insights\n\
Optional. Patterns or open questions worth a second look. Omit the section if there are none.\n";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub folders: FolderConfig,
    pub inbox: InboxConfig,
    pub download: DownloadConfig,
    pub completion: CompletionConfig,
    pub prompt: PromptConfig,
    pub archive: ArchiveConfig,
}

/// Names of the folders that make up the persisted layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FolderConfig {
    /// Top-level folder holding current artifacts and the prompt template.
    pub root: String,
    /// Subfolder of `root` receiving timestamp-suffixed prior versions.
    pub archive: String,
    /// Top-level folder for checkpoint artifacts.
    pub temp: String,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            root: "Kindle Notebooks".to_string(),
            archive: "Old".to_string(),
            temp: "_temp_processing".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InboxConfig {
    pub subject_phrase: String,
    pub body_phrase: String,
    pub unread_only: bool,
    /// Used when the subject carries no quoted notebook name.
    pub fallback_filename: String,
    /// Host and path prefix identifying the link redirector.
    pub redirector: String,
    /// Query parameter of the redirector holding the real destination.
    pub redirector_param: String,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            subject_phrase: "you sent a file".to_string(),
            body_phrase: "from your kindle".to_string(),
            unread_only: true,
            fallback_filename: "kindle_download".to_string(),
            redirector: "amazon.com/gp/f.html".to_string(),
            redirector_param: "U".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadConfig {
    pub timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionConfig {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub system_prompt: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 10_000,
            temperature: 0.3,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptConfig {
    /// Name of the editable template file inside the root folder.
    pub file_name: String,
    pub default_template: String,
    /// Read-back attempts after creating the template file.
    pub read_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            file_name: "Summary Prompt.txt".to_string(),
            default_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            read_retries: 3,
            retry_delay_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveConfig {
    /// IANA zone used for archive timestamps. UTC is used when it cannot be resolved.
    pub timezone: String,
    pub timestamp_format: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            timezone: "US/Eastern".to_string(),
            timestamp_format: "%Y%m%d_%H%M%S".to_string(),
        }
    }
}
