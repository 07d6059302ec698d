use serde::Serialize;

/// What an artifact holds; determines its extension and content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The notebook export as PDF.
    Document,
    /// The OCR'd text export.
    Text,
    /// The generated Markdown summary.
    Summary,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Document => ".pdf",
            ArtifactKind::Text => ".txt",
            ArtifactKind::Summary => ".md",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ArtifactKind::Document => "application/pdf",
            ArtifactKind::Text => "text/plain",
            ArtifactKind::Summary => "text/markdown",
        }
    }

    /// `name` plus this kind's extension.
    pub fn file_name(&self, base: &str) -> String {
        format!("{}{}", base, self.extension())
    }

    /// Name an incumbent gets when it is moved to the archive folder.
    pub fn archived_name(&self, base: &str, timestamp: &str) -> String {
        format!("{}_{}{}", base, timestamp, self.extension())
    }

    /// Strips this kind's extension (case-insensitive) from `file_name`.
    pub fn base_name<'a>(&self, file_name: &'a str) -> &'a str {
        let ext = self.extension();
        let split = file_name.len().saturating_sub(ext.len());
        match (file_name.get(..split), file_name.get(split..)) {
            (Some(base), Some(tail)) if tail.eq_ignore_ascii_case(ext) => base,
            _ => file_name,
        }
    }
}
