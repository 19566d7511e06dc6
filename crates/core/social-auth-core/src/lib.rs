//! Core account-linking traits and types for social login.
//!
//! A social network plugin verifies an external identity and then hands it
//! to a [`UserAuthenticator`], which maps it to a local account (creating one
//! when none is linked yet) and opens a session for it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid authentication payload")]
    InvalidPayload,

    #[error("Account error: {0}")]
    AccountError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

/// Everything the account-linking step needs to know about a verified
/// external identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticateUserRequest {
    /// Network plugin that verified the identity, e.g. `social_auth_dribbble`.
    pub plugin_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    /// Immutable id issued by the provider; the linking key.
    pub provider_user_id: String,
    pub access_token: String,
    pub profile_url: Option<String>,
    /// Extra data pulled from the provider on first login only.
    pub extra_data: Option<serde_json::Value>,
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedSession {
    pub user_id: String,
    pub session_token: String,
    /// True when the account was created by this login.
    pub new_account: bool,
}

/// Maps verified external identities onto local accounts.
#[async_trait]
pub trait UserAuthenticator: Send + Sync {
    /// Whether a local account is already linked to this provider id.
    async fn check_provider_is_associated(
        &self,
        plugin_id: &str,
        provider_user_id: &str,
    ) -> IdentityResult<bool>;

    /// Links (or creates) the local account and opens a session for it.
    async fn authenticate_user(
        &self,
        request: AuthenticateUserRequest,
    ) -> IdentityResult<AuthenticatedSession>;
}

#[async_trait]
pub trait UserPermissions: Send + Sync {
    async fn get_permissions(&self, request: &AuthenticateUserRequest)
    -> IdentityResult<Vec<String>>;
}

/// A static permissions provider that grants the same permissions to every account
pub struct StaticPermissions {
    permissions: Vec<String>,
}

impl StaticPermissions {
    pub fn new(permissions: Vec<String>) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl UserPermissions for StaticPermissions {
    async fn get_permissions(
        &self,
        _request: &AuthenticateUserRequest,
    ) -> IdentityResult<Vec<String>> {
        Ok(self.permissions.clone())
    }
}
