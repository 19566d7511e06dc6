//! OAuth2 client for the authorization-code grant.

use crate::config::{ClientConfig, ProviderEndpoints};
use crate::error::{OAuth2Error, OAuth2Result};
use crate::types::{AccessToken, AuthorizationRequest, ProviderErrorBody, TokenResponse};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand::{Rng, thread_rng};
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, Proxy, StatusCode};
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// OAuth2 client bound to one provider's endpoints and one set of credentials
#[derive(Clone)]
pub struct OAuth2Client {
    http_client: Client,
    config: ClientConfig,
    endpoints: ProviderEndpoints,
}

impl OAuth2Client {
    /// Fails without any network traffic when the credentials, redirect URI
    /// or proxy are unusable.
    pub fn new(config: ClientConfig, endpoints: ProviderEndpoints) -> OAuth2Result<Self> {
        if config.client_id.trim().is_empty() || config.client_secret.trim().is_empty() {
            return Err(OAuth2Error::ConfigError(
                "Client ID and Client Secret are required".to_string(),
            ));
        }

        Url::parse(&config.redirect_uri).map_err(|e| {
            OAuth2Error::ConfigError(format!("Invalid redirect URI '{}': {}", config.redirect_uri, e))
        })?;

        let mut builder = Client::builder().timeout(Duration::from_secs(config.http_timeout_seconds));

        if let Some(proxy_url) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                OAuth2Error::ConfigError(format!("Invalid proxy URL '{}': {}", proxy_url, e))
            })?;
            debug!("Routing provider calls through proxy {}", proxy_url);
            builder = builder.proxy(proxy);
        }

        let http_client = builder
            .build()
            .map_err(|e| OAuth2Error::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
            endpoints,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    pub fn redirect_uri(&self) -> &str {
        &self.config.redirect_uri
    }

    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    /// Random, URL-safe anti-CSRF state value.
    pub fn generate_state() -> String {
        let mut rng = thread_rng();
        let bytes: Vec<u8> = (0..32).map(|_| rng.r#gen::<u8>()).collect();
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Build the authorization URL with a freshly generated state
    pub fn authorization_url(&self, scopes: &[String]) -> OAuth2Result<AuthorizationRequest> {
        let mut url = Url::parse(&self.endpoints.authorization_endpoint)?;
        let state = Self::generate_state();

        let mut params = url.query_pairs_mut();
        params.append_pair("state", &state);

        if !scopes.is_empty() {
            params.append_pair("scope", &scopes.join(&self.endpoints.scope_separator));
        }

        params.append_pair("response_type", "code");
        params.append_pair("approval_prompt", "auto");
        params.append_pair("redirect_uri", &self.config.redirect_uri);
        params.append_pair("client_id", &self.config.client_id);

        for (key, value) in &self.config.auth_params {
            params.append_pair(key, value);
        }

        drop(params);

        debug!(
            "Generated authorization URL for {}",
            self.endpoints.authorization_endpoint
        );

        Ok(AuthorizationRequest {
            url: url.to_string(),
            state,
            scopes: scopes.to_vec(),
        })
    }

    /// Exchange authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> OAuth2Result<AccessToken> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.endpoints.token_endpoint)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = provider_error(status, &body);
            error!("Token exchange failed: {}", err);
            return Err(err);
        }

        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| OAuth2Error::InvalidTokenResponse(e.to_string()))?;

        if value.get("error").is_some() {
            return Err(provider_error(status, &body));
        }

        let token_response: TokenResponse = serde_json::from_value(value)
            .map_err(|e| OAuth2Error::InvalidTokenResponse(e.to_string()))?;

        info!("Successfully exchanged code for tokens");
        Ok(AccessToken::from_response(token_response, Utc::now()))
    }

    /// Get the resource owner document for the token's user
    pub async fn get_resource_owner(&self, token: &AccessToken) -> OAuth2Result<serde_json::Value> {
        self.authenticated_request(Method::GET, &self.endpoints.resource_owner_endpoint, token)
            .await
    }

    /// Bearer-authenticated call against an absolute URL. JSON bodies are
    /// parsed, anything else comes back as a string value.
    pub async fn authenticated_request(
        &self,
        method: Method,
        url: &str,
        token: &AccessToken,
    ) -> OAuth2Result<serde_json::Value> {
        let response = self
            .http_client
            .request(method, url)
            .bearer_auth(token.secret())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(provider_error(status, &body));
        }

        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) if value.get("error").is_some() => Err(provider_error(status, &body)),
            Ok(value) => Ok(value),
            Err(_) => Ok(serde_json::Value::String(body)),
        }
    }
}

fn provider_error(status: StatusCode, body: &str) -> OAuth2Error {
    let parsed: ProviderErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message().unwrap_or_else(|| {
        if body.trim().is_empty() {
            status.to_string()
        } else {
            body.trim().to_string()
        }
    });

    OAuth2Error::IdentityProviderError(message)
}
