use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use reqwest::blocking::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};

use super::token::{AuthorizedUser, TokenRefresher};
use super::{AuthError, Result};

/// A validated access token.
#[derive(Debug)]
pub struct Credentials {
    pub access_token: SecretString,
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the token was obtained by refreshing during this load.
    pub refreshed: bool,
}

/// Turns a persisted token blob into usable [`Credentials`].
pub struct CredentialProvider {
    http: Client,
}

impl CredentialProvider {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| AuthError::Http(e.to_string()))?;
        Ok(Self { http })
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    /// Parses the blob and refreshes the access token when it is missing or expired.
    pub fn load(&self, blob: &SecretString) -> Result<Credentials> {
        let user = AuthorizedUser::parse(blob)?;
        self.load_user(&user, Utc::now())
    }

    pub fn load_user(&self, user: &AuthorizedUser, now: DateTime<Utc>) -> Result<Credentials> {
        if !user.needs_refresh(now) {
            debug!("Using persisted access token");
            let token = user.token.clone().unwrap_or_default();
            return Ok(Credentials {
                access_token: SecretString::from(token),
                expires_at: user.expires_at(),
                refreshed: false,
            });
        }

        let response = TokenRefresher::new(self.http.clone()).refresh(user)?;
        if response.access_token.is_empty() {
            return Err(AuthError::InvalidCredentials(
                "token endpoint returned an empty access token".to_string(),
            ));
        }

        let expires_at = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        Ok(Credentials {
            access_token: SecretString::from(response.access_token),
            expires_at,
            refreshed: true,
        })
    }

    /// Loads credentials and wraps them with the HTTP client into a session.
    pub fn connect(&self, blob: &SecretString) -> Result<GoogleSession> {
        let credentials = self.load(blob)?;
        info!(
            "Google credentials ready (refreshed: {}, expires: {})",
            credentials.refreshed,
            credentials
                .expires_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string())
        );
        Ok(GoogleSession::new(self.http.clone(), credentials))
    }
}

/// An HTTP client paired with a bearer token, shared by the mail and storage clients.
pub struct GoogleSession {
    http: Client,
    credentials: Credentials,
}

impl GoogleSession {
    pub fn new(http: Client, credentials: Credentials) -> Self {
        Self { http, credentials }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.credentials.access_token.expose_secret())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_load_uses_valid_persisted_token() {
        let provider = CredentialProvider::with_client(Client::new());
        let blob = SecretString::from(
            r#"{"token": "abc", "refresh_token": "r", "expiry": "2099-01-01T00:00:00Z"}"#
                .to_string(),
        );
        let credentials = provider.load(&blob).unwrap();
        assert_eq!(credentials.access_token.expose_secret(), "abc");
        assert!(!credentials.refreshed);
        assert_eq!(
            credentials.expires_at,
            Some(Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_load_rejects_malformed_blob() {
        let provider = CredentialProvider::with_client(Client::new());
        let blob = SecretString::from("not json".to_string());
        assert!(matches!(
            provider.load(&blob),
            Err(AuthError::InvalidTokenBlob(_))
        ));
    }

    #[test]
    fn test_expired_without_refresh_token() {
        let provider = CredentialProvider::with_client(Client::new());
        let blob = SecretString::from(
            r#"{"token": "abc", "expiry": "2000-01-01T00:00:00Z"}"#.to_string(),
        );
        assert!(matches!(
            provider.load(&blob),
            Err(AuthError::MissingRefreshToken)
        ));
    }
}
