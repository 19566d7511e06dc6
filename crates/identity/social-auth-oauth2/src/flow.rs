//! Generic authorization-code flow composed over a provider adapter.

use crate::adapter::ProviderAdapter;
use crate::client::OAuth2Client;
use crate::config::{ClientOptions, OAuth2Config};
use crate::error::OAuth2Result;
use crate::settings::{Endpoint, ProviderSettings};
use crate::state::{OAuth2State, OAuth2StateStore};
use crate::types::{AccessToken, AuthorizationRequest};
use reqwest::Method;
use std::sync::Arc;
use tracing::{debug, error, info};

/// OAuth2 login flow for one provider.
///
/// Holds the configured client and the administrator settings the flow needs
/// at runtime. Everything here is read-only after construction.
pub struct OAuth2Flow<A: ProviderAdapter> {
    pub(crate) adapter: A,
    pub(crate) client: OAuth2Client,
    scopes: Vec<String>,
    endpoints: Vec<Endpoint>,
    pub(crate) state_store: Arc<dyn OAuth2StateStore>,
    state_ttl_seconds: u64,
}

impl<A: ProviderAdapter> OAuth2Flow<A> {
    pub fn new(
        adapter: A,
        settings: &A::Settings,
        options: ClientOptions,
        state_store: Arc<dyn OAuth2StateStore>,
        config: &OAuth2Config,
    ) -> OAuth2Result<Self> {
        let client = adapter.initialize(settings, &options, config.http_timeout_seconds)?;

        info!(
            plugin = adapter.plugin_id(),
            "{} client initialized",
            adapter.provider_name()
        );

        Ok(Self {
            adapter,
            client,
            scopes: settings.scopes(),
            endpoints: settings.endpoints(),
            state_store,
            state_ttl_seconds: config.state_ttl_seconds,
        })
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn client(&self) -> &OAuth2Client {
        &self.client
    }

    pub fn plugin_id(&self) -> &'static str {
        self.adapter.plugin_id()
    }

    /// Build the authorization URL and remember its state for this session
    pub async fn start(&self, session_id: &str) -> OAuth2Result<AuthorizationRequest> {
        let request = self
            .adapter
            .build_authorization_url(&self.client, &self.scopes)?;

        self.state_store
            .store(OAuth2State::new(
                self.plugin_id().to_string(),
                session_id.to_string(),
                request.state.clone(),
                self.state_ttl_seconds,
            ))
            .await?;

        debug!(plugin = self.plugin_id(), "Issued authorization state");
        Ok(request)
    }

    /// Exchange the authorization code and open an authentication attempt
    pub async fn authenticate(&self, code: &str) -> OAuth2Result<AuthAttempt<'_, A>> {
        let token = self
            .adapter
            .exchange_code_for_token(&self.client, code)
            .await
            .inspect_err(|e| {
                error!(
                    plugin = self.plugin_id(),
                    "There was an error during authentication. Exception: {}", e
                );
            })?;

        Ok(AuthAttempt {
            flow: self,
            token,
            profile: None,
        })
    }
}

/// One authentication attempt: owns the access token and caches the
/// resource owner so the provider is asked for it at most once.
pub struct AuthAttempt<'a, A: ProviderAdapter> {
    flow: &'a OAuth2Flow<A>,
    token: AccessToken,
    profile: Option<A::Profile>,
}

impl<A: ProviderAdapter> AuthAttempt<'_, A> {
    pub fn access_token(&self) -> &AccessToken {
        &self.token
    }

    pub async fn user_info(&mut self) -> OAuth2Result<&A::Profile> {
        let profile = match self.profile.take() {
            Some(profile) => profile,
            None => {
                self.flow
                    .adapter
                    .fetch_profile(&self.flow.client, &self.token)
                    .await?
            }
        };

        Ok(self.profile.insert(profile))
    }

    /// Errors are logged and reported as no data.
    pub async fn request_endpoint(
        &self,
        method: Method,
        path: &str,
        domain: Option<&str>,
    ) -> Option<serde_json::Value> {
        match self
            .flow
            .adapter
            .request(&self.flow.client, &self.token, method, path, domain)
            .await
        {
            Ok(value) => Some(value),
            Err(e) => {
                error!(
                    plugin = self.flow.plugin_id(),
                    "There was an error when requesting {}. Exception: {}", path, e
                );
                None
            }
        }
    }

    /// Fetch every configured endpoint into `{name: response}`. `None` when no
    /// endpoints are configured.
    pub async fn extra_details(&self) -> Option<serde_json::Value> {
        if self.flow.endpoints.is_empty() {
            return None;
        }

        let mut data = serde_json::Map::new();
        for endpoint in &self.flow.endpoints {
            let value = self
                .request_endpoint(Method::GET, &endpoint.path, None)
                .await
                .unwrap_or(serde_json::Value::Null);
            data.insert(endpoint.name.clone(), value);
        }

        Some(serde_json::Value::Object(data))
    }
}

impl<A: ProviderAdapter> std::fmt::Debug for OAuth2Flow<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Flow")
            .field("plugin_id", &self.plugin_id())
            .field("scopes", &self.scopes)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

