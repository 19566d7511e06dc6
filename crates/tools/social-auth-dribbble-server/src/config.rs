//! Layered server configuration.
//!
//! Sources, lowest precedence first:
//! - built-in defaults
//! - TOML file (`--config`, `SOCIAL_AUTH_CONFIG_FILE`, or `config.toml`)
//! - environment variables such as `SOCIAL_AUTH__DRIBBBLE__CLIENT_ID`

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use social_auth_dribbble::{DribbbleAuthSettings, authorized_redirect_url};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

pub const DEFAULT_JWT_SECRET: &str = "dev-secret-key-change-in-production";
/// Longest accepted authorization state lifetime (one day).
pub const MAX_STATE_TTL_SECONDS: u64 = 86_400;
/// Longest accepted session lifetime (one year).
pub const MAX_JWT_TTL_SECONDS: i64 = 365 * 86_400;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,

    /// Dribbble module settings. Blank credentials leave the module
    /// unconfigured rather than failing startup.
    pub dribbble: DribbbleAuthSettings,

    /// Outbound HTTP to Dribbble
    pub http: HttpConfig,

    pub oauth: OAuthConfig,

    pub session: SessionSettings,

    pub logging: LoggingConfig,

    /// File the configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to (default: 127.0.0.1)
    pub host: IpAddr,

    /// Port to bind to (default: 3000)
    pub port: u16,

    /// Public URL of the site, used for the OAuth2 redirect URI.
    /// Defaults to `http://{host}:{port}`.
    pub base_url: Option<String>,

    pub login_path: String,

    pub landing_path: String,

    /// Mark cookies Secure
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Proxy for every call to Dribbble, e.g. `http://proxy:8080`
    pub proxy: Option<String>,

    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Lifetime of an issued authorization state
    pub state_ttl_seconds: u64,

    /// How often expired states are swept
    pub cleanup_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub jwt_secret: String,

    /// JWT TTL in seconds (default: 86400 = 24 hours)
    pub jwt_ttl_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, json, compact)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: None,
            login_path: "/user/login".to_string(),
            landing_path: "/user".to_string(),
            secure_cookies: false,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_seconds: 30,
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            state_ttl_seconds: 600,
            cleanup_interval_seconds: 60,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_ttl_seconds: 86400,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the file and environment, then validate it.
    /// An explicitly given file must exist; the fallback file is optional.
    /// Runs before logging is initialized; callers report [`Config::source`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        let source = match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Configuration file {} not found", path.display());
                }
                Some(path.to_path_buf())
            }
            None => {
                let fallback = std::env::var("SOCIAL_AUTH_CONFIG_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("config.toml"));
                fallback.exists().then_some(fallback)
            }
        };

        if let Some(source) = &source {
            builder = builder.add_source(File::from(source.as_path()).format(FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("SOCIAL_AUTH")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let mut settings: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        settings.source = source;

        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if let Some(base_url) = &self.server.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                anyhow::bail!("Base URL '{}' must start with http:// or https://", base_url);
            }
        }

        for path in [&self.server.login_path, &self.server.landing_path] {
            if !path.starts_with('/') {
                anyhow::bail!("Route path '{}' must start with '/'", path);
            }
            if path.starts_with(social_auth_dribbble::LOGIN_PATH) {
                anyhow::bail!("Route path '{}' collides with the Dribbble routes", path);
            }
        }

        if self.server.login_path == self.server.landing_path {
            anyhow::bail!("Login and landing paths must differ");
        }

        if !cfg!(debug_assertions) && self.session.jwt_secret == DEFAULT_JWT_SECRET {
            anyhow::bail!("JWT secret must be changed from default in production");
        }

        if self.session.jwt_ttl_seconds <= 0 {
            anyhow::bail!("JWT TTL must be positive");
        }

        if self.session.jwt_ttl_seconds > MAX_JWT_TTL_SECONDS {
            anyhow::bail!("JWT TTL cannot exceed {} seconds", MAX_JWT_TTL_SECONDS);
        }

        if self.oauth.state_ttl_seconds == 0 {
            anyhow::bail!("OAuth2 state TTL must be positive");
        }

        if self.oauth.state_ttl_seconds > MAX_STATE_TTL_SECONDS {
            anyhow::bail!("OAuth2 state TTL cannot exceed {} seconds", MAX_STATE_TTL_SECONDS);
        }

        if self.oauth.cleanup_interval_seconds == 0 {
            anyhow::bail!("State cleanup interval must be positive");
        }

        if self.http.timeout_seconds == 0 {
            anyhow::bail!("HTTP timeout must be positive");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level_lower = self.logging.level.to_lowercase();
        if !valid_levels.contains(&level_lower.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}'. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        let valid_formats = ["pretty", "json", "compact"];
        let format_lower = self.logging.format.to_lowercase();
        if !valid_formats.contains(&format_lower.as_str()) {
            anyhow::bail!(
                "Invalid log format '{}'. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            );
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }

    pub fn base_url(&self) -> String {
        match &self.server.base_url {
            Some(base_url) => base_url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.socket_addr()),
        }
    }

    /// Redirect URI registered with the Dribbble application
    pub fn redirect_uri(&self) -> String {
        authorized_redirect_url(&self.base_url())
    }
}
