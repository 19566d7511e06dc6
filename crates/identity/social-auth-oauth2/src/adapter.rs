//! Provider adapter interface implemented by each social network plugin.

use crate::client::OAuth2Client;
use crate::config::ClientOptions;
use crate::error::OAuth2Result;
use crate::settings::ProviderSettings;
use crate::types::{AccessToken, AuthorizationRequest};
use async_trait::async_trait;
use reqwest::Method;
use std::fmt::Debug;

/// The authenticated user as reported by a provider.
pub trait ResourceOwner: Clone + Debug + Send + Sync + 'static {
    /// Immutable provider-issued id, used as the account linking key.
    fn id(&self) -> String;

    fn name(&self) -> &str;

    fn avatar_url(&self) -> Option<&str>;

    fn profile_url(&self) -> Option<&str>;
}

/// Everything a provider plugin has to supply to run the generic
/// authorization-code flow.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + 'static {
    type Settings: ProviderSettings;
    type Profile: ResourceOwner;

    /// Plugin id, e.g. `social_auth_dribbble`. Used to scope state and
    /// account links.
    fn plugin_id(&self) -> &'static str;

    /// Human readable network name for user-facing messages.
    fn provider_name(&self) -> &'static str;

    /// Configure a client from the administrator settings.
    fn initialize(
        &self,
        settings: &Self::Settings,
        options: &ClientOptions,
        http_timeout_seconds: u64,
    ) -> OAuth2Result<OAuth2Client>;

    fn build_authorization_url(
        &self,
        client: &OAuth2Client,
        extra_scopes: &[String],
    ) -> OAuth2Result<AuthorizationRequest>;

    async fn exchange_code_for_token(
        &self,
        client: &OAuth2Client,
        code: &str,
    ) -> OAuth2Result<AccessToken> {
        client.exchange_code(code).await
    }

    async fn fetch_profile(
        &self,
        client: &OAuth2Client,
        token: &AccessToken,
    ) -> OAuth2Result<Self::Profile>;

    /// Authenticated call against `domain + path`; the domain defaults to the
    /// provider's API host.
    async fn request(
        &self,
        client: &OAuth2Client,
        token: &AccessToken,
        method: Method,
        path: &str,
        domain: Option<&str>,
    ) -> OAuth2Result<serde_json::Value> {
        let domain = domain.unwrap_or(&client.endpoints().api_base_url);
        let url = format!("{}{}", domain.trim_end_matches('/'), path);
        client.authenticated_request(method, &url, token).await
    }
}
