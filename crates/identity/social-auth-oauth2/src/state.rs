//! Per-session OAuth2 state management for CSRF protection.

use crate::error::{OAuth2Error, OAuth2Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// State issued to one browser session for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2State {
    pub provider_id: String,
    pub session_id: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OAuth2State {
    pub fn new(provider_id: String, session_id: String, state: String, ttl_seconds: u64) -> Self {
        let created_at = Utc::now();
        let expires_at = i64::try_from(ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            provider_id,
            session_id,
            state,
            created_at,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    fn key(&self) -> String {
        state_key(&self.provider_id, &self.session_id)
    }
}

fn state_key(provider_id: &str, session_id: &str) -> String {
    format!("{}:{}", provider_id, session_id)
}

/// Storage for issued states, scoped per provider and session.
#[async_trait]
pub trait OAuth2StateStore: Send + Sync {
    /// Store a state, replacing any earlier one for the same session
    async fn store(&self, state: OAuth2State) -> OAuth2Result<()>;

    /// Remove and return the state issued to a session
    async fn take(&self, provider_id: &str, session_id: &str) -> OAuth2Result<OAuth2State>;

    /// Clean up expired states
    async fn cleanup_expired(&self) -> OAuth2Result<usize>;
}

/// In-memory implementation of OAuth2StateStore
pub struct InMemoryStateStore {
    states: Arc<RwLock<HashMap<String, OAuth2State>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OAuth2StateStore for InMemoryStateStore {
    async fn store(&self, state: OAuth2State) -> OAuth2Result<()> {
        let mut states = self.states.write().await;
        states.insert(state.key(), state);
        Ok(())
    }

    async fn take(&self, provider_id: &str, session_id: &str) -> OAuth2Result<OAuth2State> {
        let mut states = self.states.write().await;

        let oauth_state = states
            .remove(&state_key(provider_id, session_id))
            .ok_or(OAuth2Error::StateNotFound)?;

        if oauth_state.is_expired() {
            return Err(OAuth2Error::StateNotFound);
        }

        Ok(oauth_state)
    }

    async fn cleanup_expired(&self) -> OAuth2Result<usize> {
        let mut states = self.states.write().await;
        let before = states.len();
        let now = Utc::now();

        states.retain(|_, state| now <= state.expires_at);

        Ok(before - states.len())
    }
}
