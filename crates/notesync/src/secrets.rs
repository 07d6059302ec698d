//! Secret resolution for the token blob and the completion API key.
//!
//! A secret is looked up in priority order:
//!
//! 1. **Direct value** - e.g. `GMAIL_TOKEN='{"refresh_token": ...}'`
//! 2. **File reference** - e.g. `GMAIL_TOKEN_FILE=/run/secrets/gmail_token.json`
//!
//! Values are wrapped in [`SecretString`] as soon as they are read so they
//! cannot end up in logs through `Debug`.

use secrecy::SecretString;
use std::fs;

/// Environment variable holding the authorized-user token blob (JSON).
pub const TOKEN_ENV_VAR: &str = "GMAIL_TOKEN";

/// Environment variable holding the completion API key.
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need a direct value or a file path)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },

    #[error("Secret from '{source_name}' is empty")]
    Empty { source_name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from a direct value, falling back to the contents of a file.
///
/// Both values are trimmed; secrets pasted into env files often carry a
/// trailing newline.
pub fn resolve_secret(direct: Option<&str>, file_path: Option<&str>) -> Result<SecretString> {
    if let Some(value) = direct {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Ok(SecretString::from(trimmed.to_string()));
        }
    }

    if let Some(path) = file_path {
        if !path.is_empty() {
            let expanded = expand_home(path);
            let content = fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
                path: expanded.clone(),
                source: e,
            })?;
            let trimmed = content.trim();
            if trimmed.is_empty() {
                return Err(SecretError::Empty {
                    source_name: expanded,
                });
            }
            return Ok(SecretString::from(trimmed.to_string()));
        }
    }

    Err(SecretError::NoSourceProvided)
}

/// Resolves `name` from the environment, or from the file named by `{name}_FILE`.
pub fn resolve_env_secret(name: &str) -> Result<SecretString> {
    let direct = read_env(name)?;
    let file_var = format!("{}_FILE", name);
    let file_path = read_env(&file_var)?;

    match resolve_secret(direct.as_deref(), file_path.as_deref()) {
        Err(SecretError::NoSourceProvided) => Err(SecretError::EnvVarNotSet {
            name: name.to_string(),
        }),
        other => other,
    }
}

pub fn token_blob_from_env() -> Result<SecretString> {
    resolve_env_secret(TOKEN_ENV_VAR)
}

pub fn api_key_from_env() -> Result<SecretString> {
    resolve_env_secret(API_KEY_ENV_VAR)
}

fn read_env(name: &str) -> Result<Option<String>> {
    match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
            name: name.to_string(),
        }),
    }
}

/// Expands `~` to the user's home directory.
///
/// Only `~` and `~/path` are supported, not `~user/path`.
fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
