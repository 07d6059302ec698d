//! Gmail REST implementation of [`MailService`].

use std::sync::Arc;

use log::debug;
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::error::{MailError, Result};
use super::message::{LabelChange, Message, MessageRef};
use super::MailService;
use crate::auth::GoogleSession;
use crate::query::MailQuery;
use crate::sanitize::{segment_url, truncate_body};

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
    #[serde(default)]
    next_page_token: Option<String>,
}

pub struct GmailClient {
    session: Arc<GoogleSession>,
    base: String,
}

impl GmailClient {
    pub fn new(session: Arc<GoogleSession>) -> Self {
        Self::with_base(session, GMAIL_API_BASE)
    }

    pub fn with_base(session: Arc<GoogleSession>, base: &str) -> Self {
        Self {
            session,
            base: base.trim_end_matches('/').to_string(),
        }
    }

    fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response> {
        let response = self
            .session
            .authorize(request)
            .send()
            .map_err(|e| MailError::Request {
                operation,
                message: e.to_string(),
            })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().unwrap_or_default();
        Err(MailError::Status {
            operation,
            status: status.as_u16(),
            body: truncate_body(&body),
        })
    }

    fn message_url(&self, operation: &'static str, segments: &[&str]) -> Result<String> {
        segment_url(&self.base, segments).map_err(|e| MailError::Request {
            operation,
            message: format!("invalid message url: {}", e),
        })
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T> {
        self.send(operation, request)?
            .json()
            .map_err(|e| MailError::Decode {
                operation,
                message: e.to_string(),
            })
    }
}

fn not_found(id: &str) -> impl FnOnce(MailError) -> MailError + '_ {
    move |e| match e {
        MailError::Status { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
            MailError::NotFound { id: id.to_string() }
        }
        other => other,
    }
}

impl MailService for GmailClient {
    fn search(&self, query: &MailQuery) -> Result<Vec<MessageRef>> {
        let q = query.render();
        let mut refs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![("q", q.as_str())];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let request = self
                .session
                .http()
                .get(format!("{}/messages", self.base))
                .query(&params);
            let page: MessageList = self.send_json("search", request)?;

            refs.extend(page.messages);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("Search '{}' matched {} messages", q, refs.len());
        Ok(refs)
    }

    fn get(&self, id: &str) -> Result<Message> {
        let request = self
            .session
            .http()
            .get(self.message_url("get", &["messages", id])?)
            .query(&[("format", "full")]);
        self.send_json("get", request).map_err(not_found(id))
    }

    fn modify(&self, id: &str, change: &LabelChange) -> Result<()> {
        let request = self
            .session
            .http()
            .post(self.message_url("modify", &["messages", id, "modify"])?)
            .json(change);
        self.send("modify", request).map_err(not_found(id))?;
        debug!(
            "Modified labels on {} (+{:?} -{:?})",
            id, change.add, change.remove
        );
        Ok(())
    }
}
