//! Helpers for sanitizing data before it enters log lines and span fields.
//!
//! Download links in notebook emails are pre-signed; their query strings act
//! as bearer credentials and must never be logged verbatim.

use url::Url;

const MAX_BODY_LENGTH: usize = 200;

/// Keeps scheme, host and path of a URL and masks the query string.
///
/// - `https://host/file.pdf?X-Amz-Signature=abc` → `https://host/file.pdf?****`
/// - `https://host/file.pdf` → `https://host/file.pdf`
/// - unparsable input → `<invalid url>`
pub fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            let had_query = url.query().is_some_and(|q| !q.is_empty());
            url.set_query(None);
            url.set_fragment(None);
            let _ = url.set_password(None);
            let _ = url.set_username("");
            if had_query {
                format!("{}?****", url)
            } else {
                url.to_string()
            }
        }
        Err(_) => "<invalid url>".to_string(),
    }
}

/// Appends `segments` to the path of `base`, percent-encoding each one.
///
/// Identifiers reach request paths from callers, so `?`, `/` or `#` in an id
/// must not change which resource is addressed.
pub fn segment_url(base: &str, segments: &[&str]) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base)?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(segments);
    Ok(url.into())
}

/// Truncates an upstream error body so tokens echoed back by an API cannot
/// flood or leak into logs.
pub fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_url_masks_query() {
        assert_eq!(
            redact_url("https://s3.amazonaws.com/bucket/note.pdf?X-Amz-Signature=abc&Expires=1"),
            "https://s3.amazonaws.com/bucket/note.pdf?****"
        );
    }

    #[test]
    fn test_redact_url_without_query() {
        assert_eq!(
            redact_url("https://example.com/note.txt"),
            "https://example.com/note.txt"
        );
    }

    #[test]
    fn test_redact_url_strips_userinfo() {
        assert_eq!(
            redact_url("https://user:pw@example.com/a"),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_redact_url_invalid() {
        assert_eq!(redact_url("not a url"), "<invalid url>");
    }

    #[test]
    fn test_segment_url_encodes_ids() {
        assert_eq!(
            segment_url("https://www.googleapis.com/drive/v3", &["files", "abc123"]).unwrap(),
            "https://www.googleapis.com/drive/v3/files/abc123"
        );
        assert_eq!(
            segment_url("https://www.googleapis.com/drive/v3", &["files", "a/b?alt=media#x"]).unwrap(),
            "https://www.googleapis.com/drive/v3/files/a%2Fb%3Falt=media%23x"
        );
        assert!(segment_url("not a url", &["files"]).is_err());
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");

        let long = "é".repeat(150);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("... (truncated)"));
        assert!(truncated.len() < long.len());
    }
}
