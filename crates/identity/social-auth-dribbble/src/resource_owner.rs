//! Authenticated Dribbble user.

use serde::{Deserialize, Deserializer, Serialize};
use social_auth_oauth2::ResourceOwner;
use std::collections::HashMap;

/// The `/v2/user` document, reduced to what login needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DribbbleResourceOwner {
    /// Dribbble ids are numeric; kept as a string linking key.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub login: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
    pub shots_url: Option<String>,
    #[serde(flatten)]
    pub additional_fields: HashMap<String, serde_json::Value>,
}

impl DribbbleResourceOwner {
    /// Falls back to the profile page when the API does not expose a shots URL.
    pub fn shots_url(&self) -> Option<&str> {
        self.shots_url.as_deref().or(self.html_url.as_deref())
    }
}

impl ResourceOwner for DribbbleResourceOwner {
    fn id(&self) -> String {
        self.id.clone()
    }

    /// Display name, or the login handle for accounts without one.
    fn name(&self) -> &str {
        match self.login.as_deref() {
            Some(login) if self.name.is_empty() => login,
            _ => &self.name,
        }
    }

    fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    fn profile_url(&self) -> Option<&str> {
        self.shots_url()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Text(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Number(n) => n.to_string(),
        Id::Text(s) => s,
    })
}
