use std::fmt::Write;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::config::ArchiveConfig;

const FALLBACK_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Produces the timestamp suffix used when an artifact is archived.
///
/// Timestamps are rendered in the configured zone. An unknown zone falls
/// back to UTC rather than failing the write.
#[derive(Debug, Clone)]
pub struct ArchiveClock {
    zone: Option<Tz>,
    format: String,
    frozen: Option<DateTime<Utc>>,
}

impl ArchiveClock {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        let zone = match Tz::from_str(&config.timezone) {
            Ok(zone) => Some(zone),
            Err(e) => {
                warn!(
                    timezone = %config.timezone,
                    "Unknown timezone, archive timestamps will use UTC: {}", e
                );
                None
            }
        };

        Self {
            zone,
            format: config.timestamp_format.clone(),
            frozen: None,
        }
    }

    /// A clock that always reports `at`.
    pub fn frozen(config: &ArchiveConfig, at: DateTime<Utc>) -> Self {
        Self {
            frozen: Some(at),
            ..Self::from_config(config)
        }
    }

    pub fn timestamp(&self) -> String {
        self.format_at(self.frozen.unwrap_or_else(Utc::now))
    }

    pub fn format_at(&self, at: DateTime<Utc>) -> String {
        let mut out = String::new();
        let written = match self.zone {
            Some(zone) => write!(out, "{}", at.with_timezone(&zone).format(&self.format)),
            None => write!(out, "{}", at.format(&self.format)),
        };

        if written.is_err() {
            out.clear();
            let _ = write!(out, "{}", at.format(FALLBACK_FORMAT));
        }
        out
    }

    pub fn uses_utc_fallback(&self) -> bool {
        self.zone.is_none()
    }
}
