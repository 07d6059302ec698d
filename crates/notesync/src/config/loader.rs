use std::path::Path;

use chrono::format::{Item, StrftimeItems};

use crate::config::schema::Config;
use crate::error::ConfigError;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV_VAR: &str = "NOTESYNC_CONFIG";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// Loads the file at `path` when given, otherwise the built-in defaults.
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = Config::default();
            validate_config(&config)?;
            Ok(config)
        }
    }
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let folders = &config.folders;
    for (field, value) in [
        ("folders.root", &folders.root),
        ("folders.archive", &folders.archive),
        ("folders.temp", &folders.temp),
        ("inbox.subjectPhrase", &config.inbox.subject_phrase),
        ("inbox.fallbackFilename", &config.inbox.fallback_filename),
        ("inbox.redirector", &config.inbox.redirector),
        ("inbox.redirectorParam", &config.inbox.redirector_param),
        ("completion.model", &config.completion.model),
        ("prompt.fileName", &config.prompt.file_name),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: format!("'{}' must not be empty", field),
            });
        }
    }

    if folders.archive == folders.root {
        return Err(ConfigError::Validation {
            message: "Archive folder must differ from the root folder".to_string(),
        });
    }

    if folders.temp == folders.root {
        return Err(ConfigError::Validation {
            message: "Temporary folder must differ from the root folder".to_string(),
        });
    }

    if config.download.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "download.timeoutSecs must be positive".to_string(),
        });
    }

    let temperature = config.completion.temperature;
    if !(0.0..=2.0).contains(&temperature) {
        return Err(ConfigError::Validation {
            message: format!("completion.temperature {} is outside 0..=2", temperature),
        });
    }

    if config.completion.max_tokens == 0 {
        return Err(ConfigError::Validation {
            message: "completion.maxTokens must be positive".to_string(),
        });
    }

    let format = &config.archive.timestamp_format;
    if format.is_empty() || StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::Validation {
            message: format!("Invalid archive.timestampFormat '{}'", format),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = load_config_or_default(None).unwrap();
        assert_eq!(config.folders.root, "Kindle Notebooks");
        assert_eq!(config.folders.archive, "Old");
        assert_eq!(config.download.timeout_secs, 30);
        assert_eq!(config.completion.model, "gpt-4o");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = load_config_from_str(
            r#"{ "folders": { "root": "Scribe" }, "completion": { "temperature": 0.1 } }"#,
        )
        .unwrap();
        assert_eq!(config.folders.root, "Scribe");
        assert_eq!(config.folders.archive, "Old");
        assert!((config.completion.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.completion.max_tokens, 10_000);
    }

    #[test]
    fn test_rejects_empty_folder_name() {
        let result = load_config_from_str(r#"{ "folders": { "archive": " " } }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_rejects_temp_equal_to_root() {
        let result =
            load_config_from_str(r#"{ "folders": { "root": "Notes", "temp": "Notes" } }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_rejects_archive_equal_to_root() {
        let result =
            load_config_from_str(r#"{ "folders": { "root": "Notes", "archive": "Notes" } }"#);
        match result {
            Err(ConfigError::Validation { message }) => assert!(message.contains("Archive")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_timestamp_format() {
        let result = load_config_from_str(r#"{ "archive": { "timestampFormat": "%Y%" } }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let result = load_config_from_str(r#"{ "completion": { "temperature": 3.5 } }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_invalid_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "download": {{ "timeoutSecs": 5 }} }}"#).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.download.timeout_secs, 5);
    }

    #[test]
    fn test_missing_file() {
        let result = load_config("/nonexistent/notesync.json");
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
