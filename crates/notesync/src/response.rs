//! The `{statusCode, body}` envelope every entry point returns.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ErrorKind, NotesyncError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    NoEmail,
    NoFiles,
    Success,
    Queued,
    Processed,
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseBody {
    pub message: String,
    pub status: Status,
    pub timestamp: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    pub body: ResponseBody,
}

impl Response {
    pub fn new(status_code: u16, status: Status, message: impl Into<String>) -> Self {
        Self {
            status_code,
            body: ResponseBody {
                message: message.into(),
                status,
                timestamp: Utc::now().to_rfc3339(),
                details: Map::new(),
            },
        }
    }

    pub fn ok(status: Status, message: impl Into<String>) -> Self {
        Self::new(200, status, message)
    }

    /// Maps the error's kind to a status code: caller mistakes are 400,
    /// everything else 500.
    pub fn from_error(error: &NotesyncError) -> Self {
        let status_code = match error.kind() {
            ErrorKind::BadRequest => 400,
            ErrorKind::Configuration | ErrorKind::Extraction | ErrorKind::Upstream => 500,
        };
        Self::new(status_code, Status::Error, error.to_string())
    }

    /// Adds a detail field next to `message` and `status`.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|e| Value::String(e.to_string()));
        self.body.details.insert(key.to_string(), value);
        self
    }

    pub fn with_elapsed(self, elapsed: Duration) -> Self {
        self.with("processing_time", elapsed.as_millis() as u64)
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.body.details.get(key)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            format!(
                r#"{{"statusCode":500,"body":{{"message":"failed to encode response: {}","status":"error"}}}}"#,
                e
            )
        })
    }
}
