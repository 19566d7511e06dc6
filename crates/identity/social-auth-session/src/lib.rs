//! Account linking and JWT session management.
//!
//! [`SessionService`] keeps local accounts keyed by `(plugin_id,
//! provider_user_id)` and issues a signed session token on every login.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use social_auth_core::{
    AuthenticateUserRequest, AuthenticatedSession, IdentityError, IdentityResult,
    UserAuthenticator, UserPermissions,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Identity error: {0}")]
    IdentityError(#[from] IdentityError),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Invalid session")]
    InvalidSession,
}

impl From<SessionError> for IdentityError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::IdentityError(inner) => inner,
            other => IdentityError::SessionError(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Local user id.
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    pub plugin_id: String,
    pub provider_user_id: String,
    pub display_name: String,
    pub permissions: HashSet<String>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub algorithm: Algorithm,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            jwt_ttl: Duration::hours(24),
            algorithm: Algorithm::HS256,
        }
    }
}

/// A local account linked to one provider identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub profile_url: Option<String>,
    pub plugin_id: String,
    pub provider_user_id: String,
    /// Data gathered from the provider when the account was created.
    pub extra_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

type AccountKey = (String, String);

pub struct SessionService {
    config: SessionConfig,
    accounts: Arc<RwLock<HashMap<AccountKey, LinkedAccount>>>,
    active_sessions: Arc<RwLock<HashMap<String, JwtClaims>>>,
    permissions_provider: Option<Arc<dyn UserPermissions>>,
}

impl SessionService {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            accounts: Arc::new(RwLock::new(HashMap::new())),
            active_sessions: Arc::new(RwLock::new(HashMap::new())),
            permissions_provider: None,
        }
    }

    pub fn with_permissions(mut self, provider: Arc<dyn UserPermissions>) -> Self {
        self.permissions_provider = Some(provider);
        self
    }

    pub async fn account(&self, plugin_id: &str, provider_user_id: &str) -> Option<LinkedAccount> {
        let accounts = self.accounts.read().await;
        accounts
            .get(&(plugin_id.to_string(), provider_user_id.to_string()))
            .cloned()
    }

    pub async fn account_by_user_id(&self, user_id: &str) -> Option<LinkedAccount> {
        let accounts = self.accounts.read().await;
        accounts.values().find(|a| a.user_id == user_id).cloned()
    }

    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn active_session_count(&self) -> usize {
        self.active_sessions.read().await.len()
    }

    /// Find the linked account or create it. Returns the account and whether
    /// it is new. Profile fields are refreshed on every login; the initial
    /// extra data is kept as first recorded.
    async fn link_account(&self, request: &AuthenticateUserRequest) -> (LinkedAccount, bool) {
        let key = (request.plugin_id.clone(), request.provider_user_id.clone());
        let now = Utc::now();
        let mut accounts = self.accounts.write().await;

        if let Some(account) = accounts.get_mut(&key) {
            account.display_name = request.display_name.clone();
            account.avatar_url = request.avatar_url.clone();
            account.profile_url = request.profile_url.clone();
            account.last_login = now;
            return (account.clone(), false);
        }

        let account = LinkedAccount {
            user_id: Uuid::new_v4().to_string(),
            display_name: request.display_name.clone(),
            avatar_url: request.avatar_url.clone(),
            profile_url: request.profile_url.clone(),
            plugin_id: request.plugin_id.clone(),
            provider_user_id: request.provider_user_id.clone(),
            extra_data: request.extra_data.clone(),
            created_at: now,
            last_login: now,
        };
        accounts.insert(key, account.clone());

        info!(
            plugin = %account.plugin_id,
            user_id = %account.user_id,
            "Created account for {}", account.display_name
        );

        (account, true)
    }

    async fn begin_session(
        &self,
        account: &LinkedAccount,
        request: &AuthenticateUserRequest,
    ) -> Result<String, SessionError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(self.config.jwt_ttl)
            .ok_or(SessionError::InvalidSession)?;
        let jti = Uuid::new_v4().to_string();

        let permissions = if let Some(ref perm_provider) = self.permissions_provider {
            perm_provider.get_permissions(request).await?
        } else {
            Vec::new()
        };

        let claims = JwtClaims {
            sub: account.user_id.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: jti.clone(),
            plugin_id: account.plugin_id.clone(),
            provider_user_id: account.provider_user_id.clone(),
            display_name: account.display_name.clone(),
            permissions: permissions.into_iter().collect(),
        };

        let token = encode(
            &Header::new(self.config.algorithm),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )?;

        let mut sessions = self.active_sessions.write().await;
        sessions.retain(|_, claims| claims.exp > now.timestamp());
        sessions.insert(jti, claims);

        Ok(token)
    }

    pub async fn verify_session(&self, token: &str) -> Result<JwtClaims, SessionError> {
        let token_data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(self.config.algorithm),
        )?;

        let sessions = self.active_sessions.read().await;
        if !sessions.contains_key(&token_data.claims.jti) {
            return Err(SessionError::SessionNotFound);
        }

        Ok(token_data.claims)
    }

    pub async fn end_session(&self, jti: &str) -> Option<JwtClaims> {
        let mut sessions = self.active_sessions.write().await;
        sessions.remove(jti)
    }

    /// Forget sessions whose token has expired. Returns how many were dropped.
    pub async fn cleanup_expired_sessions(&self) -> usize {
        let now = Utc::now().timestamp();
        let mut sessions = self.active_sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, claims| claims.exp > now);
        before - sessions.len()
    }
}

#[async_trait]
impl UserAuthenticator for SessionService {
    async fn check_provider_is_associated(
        &self,
        plugin_id: &str,
        provider_user_id: &str,
    ) -> IdentityResult<bool> {
        Ok(self.account(plugin_id, provider_user_id).await.is_some())
    }

    async fn authenticate_user(
        &self,
        request: AuthenticateUserRequest,
    ) -> IdentityResult<AuthenticatedSession> {
        if request.provider_user_id.is_empty() {
            return Err(IdentityError::InvalidPayload);
        }

        let (account, new_account) = self.link_account(&request).await;
        let session_token = self.begin_session(&account, &request).await?;

        debug!(user_id = %account.user_id, new_account, "Session started");

        Ok(AuthenticatedSession {
            user_id: account.user_id,
            session_token,
            new_account,
        })
    }
}
