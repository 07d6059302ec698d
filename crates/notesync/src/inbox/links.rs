use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;

use crate::config::InboxConfig;
use crate::error::ExtractionError;

static PDF_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)download.*pdf").unwrap());
static TEXT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)download.*text.*file").unwrap());
static DOCUMENT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)download.*document").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Direct download URLs recovered from a notification body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadLinks {
    pub document_url: String,
    pub text_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkClass {
    Document,
    Text,
}

/// Classifies an anchor by its visible text.
///
/// A PDF match wins over a text-file match, which wins over a generic
/// "download document" match.
fn classify(label: &str) -> Option<LinkClass> {
    if PDF_LINK.is_match(label) {
        Some(LinkClass::Document)
    } else if TEXT_LINK.is_match(label) {
        Some(LinkClass::Text)
    } else if DOCUMENT_LINK.is_match(label) {
        Some(LinkClass::Document)
    } else {
        None
    }
}

fn anchor_text(anchor: ElementRef<'_>) -> String {
    anchor
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Recovers document and text download links from notification HTML.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    redirector: String,
    redirector_param: String,
}

impl LinkExtractor {
    pub fn new(redirector: impl Into<String>, redirector_param: impl Into<String>) -> Self {
        Self {
            redirector: redirector.into().to_ascii_lowercase(),
            redirector_param: redirector_param.into(),
        }
    }

    pub fn from_config(config: &InboxConfig) -> Self {
        Self::new(config.redirector.as_str(), config.redirector_param.as_str())
    }

    /// The first document-class and first text-class anchor win; the document
    /// link is required.
    pub fn extract_urls(&self, html: &str) -> Result<DownloadLinks, ExtractionError> {
        let document = Html::parse_document(html);
        let mut document_url = None;
        let mut text_url = None;

        for anchor in document.select(&ANCHOR) {
            let Some(class) = classify(&anchor_text(anchor)) else {
                continue;
            };
            let slot = match class {
                LinkClass::Document => &mut document_url,
                LinkClass::Text => &mut text_url,
            };
            if slot.is_some() {
                continue;
            }

            let href = anchor.value().attr("href").unwrap_or_default();
            if let Some(url) = self.resolve_href(href) {
                *slot = Some(url);
            }

            if document_url.is_some() && text_url.is_some() {
                break;
            }
        }

        Ok(DownloadLinks {
            document_url: document_url.ok_or(ExtractionError::NoDocumentLink)?,
            text_url,
        })
    }

    /// Turns an anchor target into a direct URL, unwrapping the redirector.
    ///
    /// Returns `None` for non-http(s) targets and for redirector links that
    /// lack the destination parameter.
    pub fn resolve_href(&self, href: &str) -> Option<String> {
        let href = href.trim();
        let parsed = Url::parse(href).ok()?;
        if !is_http(&parsed) {
            return None;
        }

        if !self.is_redirector(&parsed) {
            return Some(parsed.to_string());
        }

        // query_pairs yields percent-decoded values
        let inner = parsed
            .query_pairs()
            .find(|(k, _)| k == self.redirector_param.as_str())
            .map(|(_, v)| v.trim().to_string())?;
        let dest = Url::parse(&inner).ok()?;
        is_http(&dest).then(|| dest.to_string())
    }

    fn is_redirector(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let location = format!("{}{}", host, url.path().to_ascii_lowercase());
        location.contains(&self.redirector)
    }
}
