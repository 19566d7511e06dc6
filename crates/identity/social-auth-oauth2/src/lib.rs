//! Generic OAuth2 authorization-code login flow.
//!
//! A provider plugin implements [`ProviderAdapter`]; [`OAuth2Flow`] composes
//! it with a per-session [`OAuth2StateStore`] to issue authorization URLs,
//! verify the anti-CSRF state on callback, exchange the code, fetch the
//! resource owner and hand the verified identity to a
//! [`social_auth_core::UserAuthenticator`].

mod adapter;
mod client;
mod config;
mod error;
mod flow;
mod handler;
mod settings;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use adapter::{ProviderAdapter, ResourceOwner};
pub use client::OAuth2Client;
pub use config::{ClientConfig, ClientOptions, OAuth2Config, ProviderEndpoints};
pub use error::{OAuth2Error, OAuth2Result};
pub use flow::{AuthAttempt, OAuth2Flow};
pub use handler::{
    AUTHENTICATION_DENIED_MESSAGE, CallbackFailure, CallbackOutcome, CallbackStage,
    INVALID_STATE_MESSAGE, LINKING_FAILED_MESSAGE,
};
pub use settings::{Endpoint, ProviderSettings, parse_endpoints, parse_scopes};
pub use state::{InMemoryStateStore, OAuth2State, OAuth2StateStore};
pub use types::{AccessToken, AuthorizationRequest, CallbackQuery, CallbackResult, TokenResponse};

// Re-export common types for convenience
pub use reqwest::Method;
pub use social_auth_core::{AuthenticateUserRequest, AuthenticatedSession, UserAuthenticator};
