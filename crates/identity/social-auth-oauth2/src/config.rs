//! OAuth2 configuration types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed endpoints of an identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub resource_owner_endpoint: String,
    /// Base host for authenticated API calls against relative paths.
    pub api_base_url: String,
    pub scope_separator: String,
}

/// Client credentials and transport options for one provider.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Outbound proxy URL applied to every provider call.
    pub proxy: Option<String>,
    pub http_timeout_seconds: u64,
    /// Additional parameters to include in authorization request
    pub auth_params: HashMap<String, String>,
}

/// Per-site options the flow needs besides the provider settings.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub redirect_uri: String,
    pub proxy: Option<String>,
}

/// OAuth2 flow configuration
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    pub state_ttl_seconds: u64,
    pub http_timeout_seconds: u64,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            state_ttl_seconds: 600, // 10 minutes
            http_timeout_seconds: 30,
        }
    }
}

impl OAuth2Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state_ttl(mut self, seconds: u64) -> Self {
        self.state_ttl_seconds = seconds;
        self
    }

    pub fn with_http_timeout(mut self, seconds: u64) -> Self {
        self.http_timeout_seconds = seconds;
        self
    }
}
