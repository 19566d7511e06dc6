//! Administrator-facing provider settings.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// An extra API endpoint fetched on first login, stored under `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub path: String,
    pub name: String,
}

/// Read-only view over the settings a provider plugin is configured with.
pub trait ProviderSettings: Send + Sync {
    fn client_id(&self) -> &str;

    fn client_secret(&self) -> &str;

    /// Extra scopes requested on top of the provider's base scopes.
    fn scopes(&self) -> Vec<String>;

    fn endpoints(&self) -> Vec<Endpoint>;
}

/// Splits a comma-separated scope list. Order and duplicates are kept.
pub fn parse_scopes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|scope| !scope.is_empty())
        .map(String::from)
        .collect()
}

/// Parses newline-delimited `path|name` pairs.
pub fn parse_endpoints(raw: &str) -> Vec<Endpoint> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match line.split_once('|') {
            Some((path, name)) if !path.trim().is_empty() && !name.trim().is_empty() => {
                Some(Endpoint {
                    path: path.trim().to_string(),
                    name: name.trim().to_string(),
                })
            }
            _ => {
                warn!("Ignoring malformed endpoint line '{}', expected path|name", line);
                None
            }
        })
        .collect()
}
