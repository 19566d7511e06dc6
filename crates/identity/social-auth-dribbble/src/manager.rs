//! Dribbble auth manager: the generic flow bound to the Dribbble plugin.

use crate::provider::DribbbleProvider;
use crate::settings::DribbbleAuthSettings;
use social_auth_oauth2::{ClientOptions, OAuth2Config, OAuth2Flow, OAuth2Result, OAuth2StateStore};
use std::sync::Arc;

pub type DribbbleAuthManager = OAuth2Flow<DribbbleProvider>;

/// Build the manager against the real Dribbble hosts.
pub fn build_manager(
    settings: &DribbbleAuthSettings,
    options: ClientOptions,
    state_store: Arc<dyn OAuth2StateStore>,
    config: &OAuth2Config,
) -> OAuth2Result<DribbbleAuthManager> {
    OAuth2Flow::new(DribbbleProvider::new(), settings, options, state_store, config)
}
