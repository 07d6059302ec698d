use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use log::{debug, info};
use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{AuthError, Result};
use crate::sanitize::truncate_body;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are refreshed up front.
const EXPIRY_SKEW_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The authorized-user token blob.
#[derive(Deserialize)]
pub struct AuthorizedUser {
    /// Current access token, if one was persisted.
    #[serde(default, alias = "access_token")]
    pub token: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,

    #[serde(default)]
    pub scopes: Vec<String>,

    /// RFC 3339, or a naive UTC timestamp as written by some tooling.
    #[serde(default)]
    pub expiry: Option<String>,
}

impl std::fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_uri", &self.token_uri)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl AuthorizedUser {
    pub fn parse(blob: &SecretString) -> Result<Self> {
        Ok(serde_json::from_str(blob.expose_secret())?)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.expiry.as_deref()?.trim();
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Some(at.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// True when there is no usable access token at `now`.
    ///
    /// A token without a recorded expiry is taken as valid.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.token.as_deref() {
            None | Some("") => true,
            Some(_) => self
                .expires_at()
                .is_some_and(|at| at - Duration::seconds(EXPIRY_SKEW_SECS) <= now),
        }
    }
}

/// Response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,

    #[serde(default)]
    pub expires_in: Option<i64>,

    #[serde(default)]
    pub token_type: Option<String>,
}

/// Exchanges a refresh token for a new access token.
pub struct TokenRefresher {
    client: Client,
}

impl TokenRefresher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn refresh(&self, user: &AuthorizedUser) -> Result<TokenResponse> {
        let refresh_token = user
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingRefreshToken)?;
        let client_id = user.client_id.as_deref().unwrap_or_default();
        let client_secret = user.client_secret.as_deref().unwrap_or_default();

        info!("Refreshing access token");
        debug!("Token endpoint: {}", user.token_uri);

        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&user.token_uri)
            .form(&params)
            .send()
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(AuthError::RefreshFailed(format!(
                "{}: {}",
                status,
                truncate_body(&body)
            )));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| AuthError::RefreshFailed(format!("invalid response: {}", e)))?;

        info!("Successfully refreshed access token");
        Ok(token)
    }
}
