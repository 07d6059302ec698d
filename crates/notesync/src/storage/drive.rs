//! Drive v3 REST implementation of [`StorageService`].

use std::sync::Arc;

use log::debug;
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use super::error::{Result, StorageError};
use super::{FileEntry, FileUpdate, NewFile, StorageService};
use crate::auth::GoogleSession;
use crate::query::FileQuery;
use crate::sanitize::{segment_url, truncate_body};

pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

const FILE_FIELDS: &str = "id,name,mimeType,parents,appProperties,trashed,modifiedTime";
const PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<FileEntry>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    #[serde(default)]
    id: Option<String>,
}

pub struct DriveClient {
    session: Arc<GoogleSession>,
    api_base: String,
    upload_base: String,
}

impl DriveClient {
    pub fn new(session: Arc<GoogleSession>) -> Self {
        Self::with_endpoints(session, DRIVE_API_BASE, DRIVE_UPLOAD_BASE)
    }

    pub fn with_endpoints(session: Arc<GoogleSession>, api_base: &str, upload_base: &str) -> Self {
        Self {
            session,
            api_base: api_base.trim_end_matches('/').to_string(),
            upload_base: upload_base.trim_end_matches('/').to_string(),
        }
    }

    fn file_url(&self, operation: &'static str, id: &str) -> Result<String> {
        segment_url(&self.api_base, &["files", id]).map_err(|e| StorageError::Request {
            operation,
            message: format!("invalid file url: {}", e),
        })
    }

    fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response> {
        let response = self
            .session
            .authorize(request)
            .send()
            .map_err(|e| StorageError::Request {
                operation,
                message: e.to_string(),
            })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().unwrap_or_default();
        Err(StorageError::Status {
            operation,
            status: status.as_u16(),
            body: truncate_body(&body),
        })
    }

    fn send_for_file(
        &self,
        operation: &'static str,
        id: &str,
        request: RequestBuilder,
    ) -> Result<Response> {
        self.send(operation, request).map_err(|e| match e {
            StorageError::Status { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
                StorageError::NotFound { id: id.to_string() }
            }
            other => other,
        })
    }
}

impl StorageService for DriveClient {
    fn list(&self, query: &FileQuery) -> Result<Vec<FileEntry>> {
        let q = query.render();
        let fields = format!("nextPageToken,files({})", FILE_FIELDS);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", q.as_str()),
                ("fields", fields.as_str()),
                ("pageSize", PAGE_SIZE),
                ("spaces", "drive"),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let request = self
                .session
                .http()
                .get(format!("{}/files", self.api_base))
                .query(&params);
            let page: FileList = self
                .send("list", request)?
                .json()
                .map_err(|e| StorageError::Request {
                    operation: "list",
                    message: format!("invalid response: {}", e),
                })?;

            files.extend(page.files);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("Listed {} files for query: {}", files.len(), q);
        Ok(files)
    }

    fn get(&self, id: &str) -> Result<FileEntry> {
        let request = self
            .session
            .http()
            .get(self.file_url("get", id)?)
            .query(&[("fields", FILE_FIELDS)]);
        self.send_for_file("get", id, request)?
            .json()
            .map_err(|e| StorageError::Request {
                operation: "get",
                message: format!("invalid response: {}", e),
            })
    }

    fn create(&self, file: &NewFile, content: Option<&[u8]>) -> Result<String> {
        let request = match content {
            None => self
                .session
                .http()
                .post(format!("{}/files", self.api_base))
                .query(&[("fields", "id")])
                .json(file),
            Some(bytes) => {
                let metadata = serde_json::to_vec(file).map_err(|e| StorageError::Request {
                    operation: "create",
                    message: format!("failed to encode metadata: {}", e),
                })?;
                let boundary = format!("notesync-{}", Uuid::new_v4().simple());
                let body = multipart_body(&boundary, &metadata, &file.mime_type, bytes);
                self.session
                    .http()
                    .post(format!("{}/files", self.upload_base))
                    .query(&[("uploadType", "multipart"), ("fields", "id")])
                    .header(
                        reqwest::header::CONTENT_TYPE,
                        format!("multipart/related; boundary={}", boundary),
                    )
                    .body(body)
            }
        };

        let created: CreatedFile = self
            .send("create", request)?
            .json()
            .map_err(|e| StorageError::Request {
                operation: "create",
                message: format!("invalid response: {}", e),
            })?;

        let id = created
            .id
            .filter(|id| !id.is_empty())
            .ok_or(StorageError::MissingId {
                operation: "create",
            })?;
        debug!("Created '{}' as {}", file.name, id);
        Ok(id)
    }

    fn update(&self, id: &str, update: &FileUpdate) -> Result<()> {
        let add_parents = update.add_parents.join(",");
        let remove_parents = update.remove_parents.join(",");
        let mut params = vec![("fields", "id")];
        if !add_parents.is_empty() {
            params.push(("addParents", add_parents.as_str()));
        }
        if !remove_parents.is_empty() {
            params.push(("removeParents", remove_parents.as_str()));
        }

        let metadata = match &update.name {
            Some(name) => serde_json::json!({ "name": name }),
            None => serde_json::json!({}),
        };

        let request = self
            .session
            .http()
            .patch(self.file_url("update", id)?)
            .query(&params)
            .json(&metadata);
        self.send_for_file("update", id, request)?;
        Ok(())
    }

    fn get_media(&self, id: &str) -> Result<Vec<u8>> {
        let request = self
            .session
            .http()
            .get(self.file_url("download", id)?)
            .query(&[("alt", "media")]);
        let bytes = self
            .send_for_file("download", id, request)?
            .bytes()
            .map_err(|e| StorageError::Request {
                operation: "download",
                message: e.to_string(),
            })?;
        Ok(bytes.to_vec())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let request = self.session.http().delete(self.file_url("delete", id)?);
        self.send_for_file("delete", id, request)?;
        Ok(())
    }
}

/// Builds a `multipart/related` body: JSON metadata part, then the media part.
pub fn multipart_body(boundary: &str, metadata: &[u8], mime_type: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + content.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_url_encodes_caller_ids() {
        use crate::auth::Credentials;
        use secrecy::SecretString;

        let session = GoogleSession::new(
            reqwest::blocking::Client::new(),
            Credentials {
                access_token: SecretString::from("t".to_string()),
                expires_at: None,
                refreshed: false,
            },
        );
        let client = DriveClient::new(Arc::new(session));
        assert_eq!(
            client.file_url("get", "f1").unwrap(),
            "https://www.googleapis.com/drive/v3/files/f1"
        );
        assert_eq!(
            client.file_url("delete", "f1/permissions?fields=*").unwrap(),
            "https://www.googleapis.com/drive/v3/files/f1%2Fpermissions%3Ffields=*"
        );
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body("b1", br#"{"name":"a.txt"}"#, "text/plain", b"hello");
        let text = String::from_utf8(body).unwrap();
        assert_eq!(
            text,
            "--b1\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n\
             {\"name\":\"a.txt\"}\r\n--b1\r\nContent-Type: text/plain\r\n\r\n\
             hello\r\n--b1--\r\n"
        );
    }

    #[test]
    fn test_file_list_parses_drive_payload() {
        let json = r#"{
            "nextPageToken": "next",
            "files": [{
                "id": "f1",
                "name": "Notes.txt",
                "mimeType": "text/plain",
                "parents": ["root"],
                "appProperties": {"original_id": "o1"}
            }]
        }"#;
        let list: FileList = serde_json::from_str(json).unwrap();
        assert_eq!(list.next_page_token.as_deref(), Some("next"));
        assert_eq!(list.files[0].property("original_id"), Some("o1"));
        assert!(!list.files[0].trashed);
    }

    #[test]
    fn test_new_file_metadata_is_camel_case() {
        let file = NewFile::new("Notes.txt", "text/plain")
            .in_parent("p1")
            .with_property("original_id", "o1");
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["mimeType"], "text/plain");
        assert_eq!(json["parents"][0], "p1");
        assert_eq!(json["appProperties"]["original_id"], "o1");

        let folder = serde_json::to_value(NewFile::new("Old", "x")).unwrap();
        assert!(folder.get("parents").is_none());
        assert!(folder.get("appProperties").is_none());
    }
}
