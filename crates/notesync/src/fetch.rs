//! Raw download of export files and their materialization into storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::artifact::ArtifactKind;
use crate::error::{FetchError, Result};
use crate::sanitize::redact_url;
use crate::storage::ArtifactWriter;

/// Fetches the bytes behind a URL.
pub trait Downloader: Send + Sync {
    fn download(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError>;
}

/// Plain GET with a bounded timeout; non-2xx is an error.
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(timeout: Duration) -> std::result::Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let redacted = redact_url(url);
        debug!(url = %redacted, "Downloading");

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Request {
                url: redacted.clone(),
                message: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: redacted,
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(|e| FetchError::Request {
            url: redacted,
            message: e.without_url().to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

/// Serves registered URLs from memory and records every request.
#[derive(Debug, Default)]
pub struct StaticDownloader {
    responses: Mutex<HashMap<String, std::result::Result<Vec<u8>, u16>>>,
    requests: Mutex<Vec<String>>,
}

impl StaticDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    fn responses(&self) -> MutexGuard<'_, HashMap<String, std::result::Result<Vec<u8>, u16>>> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.responses().insert(url.into(), Ok(body.into()));
    }

    /// Registers `url` as answering with HTTP `status`.
    pub fn fail(&self, url: impl Into<String>, status: u16) {
        self.responses().insert(url.into(), Err(status));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Downloader for StaticDownloader {
    fn download(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(url.to_string());

        match self.responses().get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(FetchError::Status {
                url: redact_url(url),
                status: *status,
            }),
            None => Err(FetchError::Unknown {
                url: redact_url(url),
            }),
        }
    }
}

/// Downloads a URL and stores it as `<name><ext>` with archive-then-create.
pub struct FetchStage {
    downloader: Arc<dyn Downloader>,
    writer: Arc<ArtifactWriter>,
}

impl FetchStage {
    pub fn new(downloader: Arc<dyn Downloader>, writer: Arc<ArtifactWriter>) -> Self {
        Self { downloader, writer }
    }

    /// Returns the new artifact id. The download happens before any incumbent
    /// is archived, so a failed download leaves the folder untouched.
    pub fn materialize(&self, url: &str, name: &str, kind: ArtifactKind) -> Result<String> {
        let bytes = self.downloader.download(url)?;
        let id = self.writer.write(name, kind, &bytes)?;
        info!(
            name = %name,
            kind = ?kind,
            url = %redact_url(url),
            id = %id,
            "Materialized download"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ArchiveClock;
    use crate::config::{ArchiveConfig, FolderConfig};
    use crate::error::NotesyncError;
    use crate::storage::{Layout, MemoryDrive, StorageService};

    fn stage(drive: &Arc<MemoryDrive>, downloader: Arc<StaticDownloader>) -> (FetchStage, Arc<Layout>) {
        let layout = Arc::new(Layout::new(drive.clone(), FolderConfig::default()));
        let writer = Arc::new(ArtifactWriter::new(
            drive.clone(),
            layout.clone(),
            ArchiveClock::from_config(&ArchiveConfig::default()),
        ));
        (FetchStage::new(downloader, writer), layout)
    }

    #[test]
    fn test_materialize_stores_download() {
        let drive = Arc::new(MemoryDrive::new());
        let downloader = Arc::new(StaticDownloader::new());
        downloader.insert("https://e.com/a.pdf", b"%PDF".to_vec());
        let (stage, layout) = stage(&drive, downloader.clone());

        let id = stage
            .materialize("https://e.com/a.pdf", "Plan", ArtifactKind::Document)
            .unwrap();
        assert_eq!(drive.content(&id).unwrap(), b"%PDF");
        assert_eq!(drive.get(&id).unwrap().name, "Plan.pdf");
        assert_eq!(drive.children(&layout.root().unwrap()).len(), 1);
        assert_eq!(downloader.requests(), vec!["https://e.com/a.pdf".to_string()]);
    }

    #[test]
    fn test_failed_download_leaves_incumbent_in_place() {
        let drive = Arc::new(MemoryDrive::new());
        let downloader = Arc::new(StaticDownloader::new());
        downloader.insert("https://e.com/v1.pdf", b"v1".to_vec());
        downloader.fail("https://e.com/v2.pdf", 403);
        let (stage, layout) = stage(&drive, downloader);

        let first = stage
            .materialize("https://e.com/v1.pdf", "Plan", ArtifactKind::Document)
            .unwrap();
        let err = stage
            .materialize("https://e.com/v2.pdf", "Plan", ArtifactKind::Document)
            .unwrap_err();
        assert!(matches!(
            err,
            NotesyncError::Fetch(FetchError::Status { status: 403, .. })
        ));

        let active = drive.children(&layout.root().unwrap());
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, first);
    }

    #[test]
    fn test_unknown_url_redacts_query() {
        let downloader = StaticDownloader::new();
        let err = downloader
            .download("https://e.com/a.pdf?sig=secret")
            .unwrap_err();
        assert!(!err.to_string().contains("secret"));
    }
}
