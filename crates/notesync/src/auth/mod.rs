//! OAuth credentials for the mail and storage APIs.
//!
//! The credential source is an "authorized user" token blob (JSON) as written
//! by the usual installed-app consent flow. When the access token is absent or
//! expired it is refreshed once with the blob's refresh token.

mod provider;
mod token;

use thiserror::Error;

pub use provider::{CredentialProvider, Credentials, GoogleSession};
pub use token::{AuthorizedUser, TokenRefresher, TokenResponse, DEFAULT_TOKEN_URI};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token blob is not valid JSON: {0}")]
    InvalidTokenBlob(#[from] serde_json::Error),

    #[error("Access token is expired and the token blob has no refresh token")]
    MissingRefreshToken,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
