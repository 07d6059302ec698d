//! Link extraction against realistic notification bodies.

mod common;

use common::{kindle_html, redirector_link};
use notesync::config::InboxConfig;
use notesync::{ExtractionError, LinkExtractor};

fn extractor() -> LinkExtractor {
    LinkExtractor::from_config(&InboxConfig::default())
}

#[test]
fn test_redirector_links_are_unwrapped() {
    let html = kindle_html(
        Some("https://dl.example.com/n/Notes.pdf?X-Amz-Signature=abc&X-Amz-Expires=604800"),
        Some("https://dl.example.com/n/Notes.txt?X-Amz-Signature=def"),
    );

    let links = extractor().extract_urls(&html).unwrap();
    assert_eq!(
        links.document_url,
        "https://dl.example.com/n/Notes.pdf?X-Amz-Signature=abc&X-Amz-Expires=604800"
    );
    assert_eq!(
        links.text_url.as_deref(),
        Some("https://dl.example.com/n/Notes.txt?X-Amz-Signature=def")
    );
}

#[test]
fn test_missing_document_link_is_an_error() {
    let html = kindle_html(None, Some("https://dl.example.com/n/Notes.txt"));
    let err = extractor().extract_urls(&html).unwrap_err();
    assert!(matches!(err, ExtractionError::NoDocumentLink));
}

#[test]
fn test_direct_links_pass_through() {
    let html = r#"<div>
        <a href="https://dl.example.com/direct.pdf">Download   PDF</a>
        <a href="https://dl.example.com/direct.txt"><span>Download</span> <b>text file</b></a>
    </div>"#;

    let links = extractor().extract_urls(html).unwrap();
    assert_eq!(links.document_url, "https://dl.example.com/direct.pdf");
    assert_eq!(
        links.text_url.as_deref(),
        Some("https://dl.example.com/direct.txt")
    );
}

#[test]
fn test_generic_document_label_counts_as_document() {
    let html = format!(
        r#"<a href="{}">Download your document</a>"#,
        redirector_link("https://dl.example.com/doc.pdf")
    );
    let links = extractor().extract_urls(&html).unwrap();
    assert_eq!(links.document_url, "https://dl.example.com/doc.pdf");
    assert!(links.text_url.is_none());
}

#[test]
fn test_redirector_without_destination_is_ignored() {
    let html = r#"
        <a href="https://www.amazon.com/gp/f.html?C=1">Download PDF</a>
        <a href="https://dl.example.com/fallback.pdf">Download PDF again</a>
    "#;
    let links = extractor().extract_urls(html).unwrap();
    assert_eq!(links.document_url, "https://dl.example.com/fallback.pdf");
}

#[test]
fn test_non_http_targets_are_ignored() {
    let html = r#"<a href="mailto:someone@example.com">Download PDF</a>"#;
    assert!(matches!(
        extractor().extract_urls(html),
        Err(ExtractionError::NoDocumentLink)
    ));
}
