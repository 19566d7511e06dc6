//! OAuth2 protocol types.

use crate::error::{OAuth2Error, OAuth2Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authorization URL issued for one login attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub scopes: Vec<String>,
}

/// Raw query parameters of the provider's redirect back to the callback route
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Validated form of a [`CallbackQuery`]; exactly one variant applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResult {
    Success {
        code: String,
        state: String,
    },
    Denied {
        error: String,
        error_description: String,
    },
}

impl CallbackQuery {
    /// An `error` parameter wins over anything else the provider sent.
    pub fn into_result(self) -> OAuth2Result<CallbackResult> {
        if let Some(error) = self.error {
            return Ok(CallbackResult::Denied {
                error,
                error_description: self
                    .error_description
                    .unwrap_or_else(|| "No description".to_string()),
            });
        }

        let code = self
            .code
            .filter(|code| !code.is_empty())
            .ok_or(OAuth2Error::MissingAuthorizationCode)?;
        let state = self
            .state
            .filter(|state| !state.is_empty())
            .ok_or(OAuth2Error::InvalidState)?;

        Ok(CallbackResult::Success { code, state })
    }
}

/// OAuth2 token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub created_at: Option<i64>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Access token owned by a single authentication attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_type: default_token_type(),
            refresh_token: None,
            scope: None,
            expires_at: None,
        }
    }

    pub fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        // Lifetimes too large to represent are treated as no expiry.
        let expires_at = response.expires_in.and_then(|seconds| {
            i64::try_from(seconds)
                .ok()
                .and_then(Duration::try_seconds)
                .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
        });

        Self {
            token: response.access_token,
            token_type: response.token_type,
            refresh_token: response.refresh_token,
            scope: response.scope,
            expires_at,
        }
    }

    pub fn secret(&self) -> &str {
        &self.token
    }

    /// Tokens without an expiry never expire.
    pub fn has_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Utc::now() >= expires_at)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Error body returned by providers on rejected requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ProviderErrorBody {
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub message: Option<String>,
}

impl ProviderErrorBody {
    pub(crate) fn message(&self) -> Option<String> {
        self.error_description
            .clone()
            .or_else(|| self.error.clone())
            .or_else(|| self.message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_parameter_wins_over_code() {
        let query = CallbackQuery {
            code: Some("abc".to_string()),
            state: Some("xyz".to_string()),
            error: Some("access_denied".to_string()),
            error_description: None,
        };

        assert_eq!(query.into_result().unwrap(), CallbackResult::Denied {
            error: "access_denied".to_string(),
            error_description: "No description".to_string(),
        });
    }

    #[test]
    fn test_missing_code_or_state() {
        let missing_code = CallbackQuery {
            state: Some("xyz".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            missing_code.into_result(),
            Err(OAuth2Error::MissingAuthorizationCode)
        ));

        let missing_state = CallbackQuery {
            code: Some("abc".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            missing_state.into_result(),
            Err(OAuth2Error::InvalidState)
        ));
    }

    #[test]
    fn test_token_response_without_token_type() {
        let json = r#"{"access_token": "abc", "scope": "public", "created_at": 1700000000}"#;
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.token_type, "bearer");

        let token = AccessToken::from_response(response, Utc::now());
        assert_eq!(token.secret(), "abc");
        assert!(token.expires_at.is_none());
        assert!(!token.has_expired());
        assert_eq!(token, AccessToken {
            scope: Some("public".to_string()),
            ..AccessToken::new("abc")
        });
    }

    #[test]
    fn test_token_expiry_and_redacted_debug() {
        let response = TokenResponse {
            access_token: "very-secret".to_string(),
            token_type: "bearer".to_string(),
            expires_in: Some(60),
            refresh_token: None,
            scope: None,
            created_at: None,
        };
        let issued_at = Utc::now() - Duration::minutes(5);
        let token = AccessToken::from_response(response, issued_at);

        assert!(token.has_expired());
        assert!(!format!("{:?}", token).contains("very-secret"));
    }

    #[test]
    fn test_unrepresentable_expiry_means_no_expiry() {
        for expires_in in [10_000_000_000_000_000, u64::MAX] {
            let json = format!(r#"{{"access_token": "abc", "expires_in": {}}}"#, expires_in);
            let response: TokenResponse = serde_json::from_str(&json).unwrap();

            let token = AccessToken::from_response(response, Utc::now());
            assert!(token.expires_at.is_none());
            assert!(!token.has_expired());
        }
    }
}
