//! Administrator settings for the Dribbble plugin.

use serde::{Deserialize, Serialize};
use social_auth_oauth2::{Endpoint, ProviderSettings, parse_endpoints, parse_scopes};
use std::fmt;
use tracing::error;

/// Path of the callback route registered with the Dribbble application.
pub const CALLBACK_PATH: &str = "/user/login/dribbble/callback";

/// Path that starts the login flow.
pub const LOGIN_PATH: &str = "/user/login/dribbble";

/// Settings as entered by the site administrator.
///
/// `scopes` is a comma-separated list of scopes requested on top of
/// `public`; `endpoints` holds one `path|name` pair per line, fetched when a
/// user logs in for the first time.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DribbbleAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub scopes: Option<String>,
    pub endpoints: Option<String>,
}

impl DribbbleAuthSettings {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scopes: None,
            endpoints: None,
        }
    }

    pub fn with_scopes(mut self, scopes: impl Into<String>) -> Self {
        self.scopes = Some(scopes.into());
        self
    }

    pub fn with_endpoints(mut self, endpoints: impl Into<String>) -> Self {
        self.endpoints = Some(endpoints.into());
        self
    }

    /// Checks that the module is configured. Logs and returns false when
    /// either credential is blank.
    pub fn validate(&self) -> bool {
        if self.client_id.trim().is_empty() || self.client_secret.trim().is_empty() {
            error!(
                plugin = crate::PLUGIN_ID,
                "Define Client ID and Client Secret on module settings."
            );
            return false;
        }

        true
    }
}

impl ProviderSettings for DribbbleAuthSettings {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn client_secret(&self) -> &str {
        &self.client_secret
    }

    fn scopes(&self) -> Vec<String> {
        self.scopes.as_deref().map(parse_scopes).unwrap_or_default()
    }

    fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints
            .as_deref()
            .map(parse_endpoints)
            .unwrap_or_default()
    }
}

impl fmt::Debug for DribbbleAuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DribbbleAuthSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("scopes", &self.scopes)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

/// Redirect URI to copy into the Dribbble application settings.
pub fn authorized_redirect_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), CALLBACK_PATH)
}
