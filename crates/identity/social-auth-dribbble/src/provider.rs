//! Dribbble network plugin for the generic OAuth2 flow.

use crate::resource_owner::DribbbleResourceOwner;
use crate::settings::DribbbleAuthSettings;
use async_trait::async_trait;
use social_auth_oauth2::{
    AccessToken, AuthorizationRequest, ClientConfig, ClientOptions, OAuth2Client, OAuth2Error,
    OAuth2Result, ProviderAdapter, ProviderEndpoints,
};
use std::collections::HashMap;
use tracing::debug;

pub const PLUGIN_ID: &str = "social_auth_dribbble";

/// Scope every authorization request asks for.
pub const BASE_SCOPE: &str = "public";

pub const AUTHORIZATION_ENDPOINT: &str = "https://dribbble.com/oauth/authorize";
pub const TOKEN_ENDPOINT: &str = "https://dribbble.com/oauth/token";
pub const RESOURCE_OWNER_ENDPOINT: &str = "https://api.dribbble.com/v2/user";
pub const API_DOMAIN: &str = "https://api.dribbble.com";

pub fn dribbble_endpoints() -> ProviderEndpoints {
    ProviderEndpoints {
        authorization_endpoint: AUTHORIZATION_ENDPOINT.to_string(),
        token_endpoint: TOKEN_ENDPOINT.to_string(),
        resource_owner_endpoint: RESOURCE_OWNER_ENDPOINT.to_string(),
        api_base_url: API_DOMAIN.to_string(),
        scope_separator: " ".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct DribbbleProvider {
    endpoints: ProviderEndpoints,
}

impl DribbbleProvider {
    pub fn new() -> Self {
        Self {
            endpoints: dribbble_endpoints(),
        }
    }

    /// Point the plugin at other hosts, e.g. a local mock server.
    pub fn with_endpoints(endpoints: ProviderEndpoints) -> Self {
        Self { endpoints }
    }
}

impl Default for DribbbleProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for DribbbleProvider {
    type Settings = DribbbleAuthSettings;
    type Profile = DribbbleResourceOwner;

    fn plugin_id(&self) -> &'static str {
        PLUGIN_ID
    }

    fn provider_name(&self) -> &'static str {
        "Dribbble"
    }

    fn initialize(
        &self,
        settings: &DribbbleAuthSettings,
        options: &ClientOptions,
        http_timeout_seconds: u64,
    ) -> OAuth2Result<OAuth2Client> {
        if !settings.validate() {
            return Err(OAuth2Error::ConfigError(
                "Define Client ID and Client Secret on module settings.".to_string(),
            ));
        }

        OAuth2Client::new(
            ClientConfig {
                client_id: settings.client_id.clone(),
                client_secret: settings.client_secret.clone(),
                redirect_uri: options.redirect_uri.clone(),
                proxy: options.proxy.clone(),
                http_timeout_seconds,
                auth_params: HashMap::new(),
            },
            self.endpoints.clone(),
        )
    }

    fn build_authorization_url(
        &self,
        client: &OAuth2Client,
        extra_scopes: &[String],
    ) -> OAuth2Result<AuthorizationRequest> {
        // Duplicates are passed through untouched; Dribbble ignores them.
        let scopes: Vec<String> = std::iter::once(BASE_SCOPE.to_string())
            .chain(extra_scopes.iter().cloned())
            .collect();

        client.authorization_url(&scopes)
    }

    async fn fetch_profile(
        &self,
        client: &OAuth2Client,
        token: &AccessToken,
    ) -> OAuth2Result<DribbbleResourceOwner> {
        let document = client.get_resource_owner(token).await?;
        let owner: DribbbleResourceOwner = serde_json::from_value(document)
            .map_err(|e| OAuth2Error::InvalidResourceOwner(e.to_string()))?;

        debug!(plugin = PLUGIN_ID, dribbble_id = %owner.id, "Loaded resource owner");
        Ok(owner)
    }
}
