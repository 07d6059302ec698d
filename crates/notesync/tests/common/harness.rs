//! Test harness wiring an [`App`] to in-memory collaborators.
//!
//! The `TestHarness` holds the mailbox, drive, downloader and completion
//! service so tests can seed them, run a command, and inspect the state the
//! command left behind.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use notesync::clock::ArchiveClock;
use notesync::config::Config;
use notesync::fetch::StaticDownloader;
use notesync::mail::{MemoryMailbox, Message};
use notesync::storage::{FileEntry, MemoryDrive, NewFile};
use notesync::summarize::{CompletionService, ScriptedCompletion};
use notesync::{App, ArtifactKind, Command, Response, Services};

/// Archive suffix produced by the harness clock (2024-07-01 16:30:05 UTC in US/Eastern).
pub const FROZEN_TIMESTAMP: &str = "20240701_123005";

/// Subject of a notification for `notebook`.
pub fn kindle_subject(notebook: &str) -> String {
    format!("You sent a file \"{}\" from your Kindle", notebook)
}

/// Wraps `destination` the way the notification's link redirector does.
pub fn redirector_link(destination: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(destination.as_bytes()).collect();
    format!("https://www.amazon.com/gp/f.html?C=1TZ5&amp;K=2&amp;U={}", encoded)
}

/// Notification HTML with a PDF link and, optionally, a text-file link.
pub fn kindle_html(pdf_url: Option<&str>, txt_url: Option<&str>) -> String {
    let mut html = String::from(
        "<html><body><p>Here is the notebook you sent from your Kindle.</p>",
    );
    if let Some(url) = pdf_url {
        html.push_str(&format!(
            "<p><a href=\"{}\">Download PDF</a></p>",
            redirector_link(url)
        ));
    }
    if let Some(url) = txt_url {
        html.push_str(&format!(
            "<p><a href=\"{}\">Download text file</a></p>",
            redirector_link(url)
        ));
    }
    html.push_str("<p><a href=\"https://www.amazon.com/help\">Help</a></p></body></html>");
    html
}

/// Direct download URL for `notebook`'s artifact with the given extension.
pub fn download_url(notebook: &str, extension: &str) -> String {
    format!(
        "https://kindle-content.example.com/{}{}?sig=abc",
        notebook.replace(' ', "-"),
        extension
    )
}

/// Isolated environment for integration tests.
pub struct TestHarness {
    pub mailbox: Arc<MemoryMailbox>,
    pub drive: Arc<MemoryDrive>,
    pub downloader: Arc<StaticDownloader>,
    pub completion: Arc<ScriptedCompletion>,
    pub config: Config,
    app: App,
}

impl TestHarness {
    /// A harness whose completion service echoes the prompt back.
    pub fn new() -> Self {
        Self::with_completion(ScriptedCompletion::echo())
    }

    pub fn with_completion(completion: ScriptedCompletion) -> Self {
        let mut config = Config::default();
        config.prompt.retry_delay_ms = 0;

        let mailbox = Arc::new(MemoryMailbox::new());
        let drive = Arc::new(MemoryDrive::new());
        let downloader = Arc::new(StaticDownloader::new());
        let completion = Arc::new(completion);

        let completion_service: Arc<dyn CompletionService> = completion.clone();
        let services = Services {
            mail: mailbox.clone(),
            storage: drive.clone(),
            downloader: downloader.clone(),
            completion: Some(completion_service),
        };
        let frozen_at = Utc
            .with_ymd_and_hms(2024, 7, 1, 16, 30, 5)
            .single()
            .expect("valid timestamp");
        let clock = ArchiveClock::frozen(&config.archive, frozen_at);
        let app = App::with_clock(config.clone(), services, clock);

        Self {
            mailbox,
            drive,
            downloader,
            completion,
            config,
            app,
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// Runs `command` through the same boundary the entry points use.
    pub fn execute(&self, command: Command) -> Response {
        self.app.execute(&command)
    }

    /// Adds an unread notification and registers its downloads.
    ///
    /// `text` of `None` means the notification carries no text-file link.
    pub fn add_notification(&self, message_id: &str, notebook: &str, pdf: &[u8], text: Option<&str>) {
        let pdf_url = download_url(notebook, ".pdf");
        self.downloader.insert(pdf_url.as_str(), pdf.to_vec());

        let txt_url = text.map(|body| {
            let url = download_url(notebook, ".txt");
            self.downloader.insert(url.as_str(), body.as_bytes().to_vec());
            url
        });

        self.mailbox.push(Message::html(
            message_id,
            &kindle_subject(notebook),
            &kindle_html(Some(&pdf_url), txt_url.as_deref()),
        ));
    }

    /// Adds an unread notification whose body has no download links.
    pub fn add_linkless_notification(&self, message_id: &str, notebook: &str) {
        self.mailbox.push(Message::html(
            message_id,
            &kindle_subject(notebook),
            &kindle_html(None, None),
        ));
    }

    pub fn root_id(&self) -> String {
        self.app.layout().root().expect("root folder")
    }

    pub fn archive_id(&self) -> String {
        self.app.layout().archive().expect("archive folder")
    }

    pub fn temp_id(&self) -> String {
        self.app.layout().temp().expect("temp folder")
    }

    /// Places a text artifact in the root folder without going through import.
    pub fn seed_text(&self, base: &str, content: &str) -> String {
        let file = NewFile::new(ArtifactKind::Text.file_name(base), ArtifactKind::Text.mime_type())
            .in_parent(self.root_id());
        self.drive.seed(&file, content.as_bytes())
    }

    /// Places the prompt template in the root folder.
    pub fn seed_prompt(&self, template: &str) -> String {
        let file = NewFile::new(self.config.prompt.file_name.as_str(), "text/plain")
            .in_parent(self.root_id());
        self.drive.seed(&file, template.as_bytes())
    }

    pub fn root_files(&self) -> Vec<FileEntry> {
        self.drive.children(&self.root_id())
    }

    pub fn archived_files(&self) -> Vec<FileEntry> {
        self.drive.children(&self.archive_id())
    }

    pub fn temp_files(&self) -> Vec<FileEntry> {
        self.drive.children(&self.temp_id())
    }

    pub fn root_names(&self) -> Vec<String> {
        names(&self.root_files())
    }

    pub fn archived_names(&self) -> Vec<String> {
        names(&self.archived_files())
    }

    /// The stored bytes of the single root file named `name`.
    pub fn root_content(&self, name: &str) -> String {
        let file = self
            .root_files()
            .into_iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("no root file named {}", name));
        let bytes = self.drive.content(&file.id).expect("file content");
        String::from_utf8(bytes).expect("utf-8 content")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn names(files: &[FileEntry]) -> Vec<String> {
    let mut names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
    names.sort();
    names
}
