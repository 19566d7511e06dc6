//! OAuth2 error types.

use thiserror::Error;

pub type OAuth2Result<T> = Result<T, OAuth2Error>;

#[derive(Debug, Error)]
pub enum OAuth2Error {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Missing or malformed credentials, redirect URI or proxy.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The returned state does not match the one issued for this session.
    #[error("Invalid state parameter")]
    InvalidState,

    #[error("State not found or expired")]
    StateNotFound,

    #[error("Missing authorization code")]
    MissingAuthorizationCode,

    /// The provider redirected back with an `error` parameter.
    #[error("Callback error: {error}: {description}")]
    CallbackError { error: String, description: String },

    /// The provider rejected a token exchange or an API call.
    #[error("Identity provider error: {0}")]
    IdentityProviderError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("Invalid resource owner response: {0}")]
    InvalidResourceOwner(String),
}

impl OAuth2Error {
    /// Whether the error means the anti-CSRF state could not be verified.
    pub fn is_state_mismatch(&self) -> bool {
        matches!(self, OAuth2Error::InvalidState | OAuth2Error::StateNotFound)
    }
}
