//! Dribbble social login.
//!
//! Wires the Dribbble network plugin into the generic OAuth2 flow and
//! exposes the login and callback routes.

mod controller;
mod manager;
mod provider;
mod resource_owner;
mod settings;


pub use controller::{
    ControllerPaths, DribbbleAuthController, FLASH_COOKIE, NOT_CONFIGURED_MESSAGE,
    SESSION_COOKIE, START_FAILED_MESSAGE, STATE_SESSION_COOKIE,
};
pub use manager::{DribbbleAuthManager, build_manager};
pub use provider::{
    API_DOMAIN, AUTHORIZATION_ENDPOINT, BASE_SCOPE, DribbbleProvider, PLUGIN_ID,
    RESOURCE_OWNER_ENDPOINT, TOKEN_ENDPOINT, dribbble_endpoints,
};
pub use resource_owner::DribbbleResourceOwner;
pub use settings::{CALLBACK_PATH, DribbbleAuthSettings, LOGIN_PATH, authorized_redirect_url};
