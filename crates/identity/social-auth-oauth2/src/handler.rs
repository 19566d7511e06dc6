//! Callback handling: validate the redirect, exchange the code, fetch the
//! profile and hand it to the account-linking step.

use crate::adapter::{ProviderAdapter, ResourceOwner};
use crate::error::OAuth2Error;
use crate::flow::OAuth2Flow;
use crate::types::{CallbackQuery, CallbackResult};
use social_auth_core::{AuthenticateUserRequest, AuthenticatedSession, UserAuthenticator};
use tracing::{error, info, warn};

pub const AUTHENTICATION_DENIED_MESSAGE: &str = "You could not be authenticated.";
pub const INVALID_STATE_MESSAGE: &str = "Login failed. Invalid OAuth2 state.";
pub const LINKING_FAILED_MESSAGE: &str = "There was an error during login. Please try again.";

/// Step of the callback at which an attempt stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStage {
    AwaitingRedirect,
    ValidatingState,
    ExchangingToken,
    FetchingProfile,
    LinkingAccount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    pub stage: CallbackStage,
    /// Safe to show to the end user.
    pub message: String,
}

impl CallbackFailure {
    fn new(stage: CallbackStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    Authenticated(AuthenticatedSession),
    Failed(CallbackFailure),
}

impl<A: ProviderAdapter> OAuth2Flow<A> {
    /// Process the provider's redirect. Never fails: every error ends in
    /// [`CallbackOutcome::Failed`] with a user-facing message.
    pub async fn handle_callback(
        &self,
        session_id: Option<&str>,
        query: CallbackQuery,
        authenticator: &dyn UserAuthenticator,
    ) -> CallbackOutcome {
        match self.run_callback(session_id, query, authenticator).await {
            Ok(session) => CallbackOutcome::Authenticated(session),
            Err(failure) => CallbackOutcome::Failed(failure),
        }
    }

    /// Fail a redirect whose query could not be parsed. The issued state is
    /// still consumed so it cannot be replayed.
    pub async fn reject_callback(&self, session_id: Option<&str>, reason: &str) -> CallbackOutcome {
        if let Some(session_id) = session_id {
            let _ = self.state_store.take(self.plugin_id(), session_id).await;
        }

        warn!(plugin = self.plugin_id(), "Malformed callback: {}", reason);
        CallbackOutcome::Failed(CallbackFailure::new(
            CallbackStage::AwaitingRedirect,
            AUTHENTICATION_DENIED_MESSAGE,
        ))
    }

    fn profile_failure(&self, stage: CallbackStage) -> CallbackFailure {
        CallbackFailure::new(
            stage,
            format!(
                "Login failed, could not load {} profile. Contact site administrator.",
                self.adapter.provider_name()
            ),
        )
    }

    async fn run_callback(
        &self,
        session_id: Option<&str>,
        query: CallbackQuery,
        authenticator: &dyn UserAuthenticator,
    ) -> Result<AuthenticatedSession, CallbackFailure> {
        let plugin_id = self.plugin_id();
        let provider = self.adapter.provider_name();

        // The issued state is consumed whatever the outcome.
        let issued = match session_id {
            Some(session_id) => self.state_store.take(plugin_id, session_id).await,
            None => Err(OAuth2Error::StateNotFound),
        };

        let (code, state) = match query.into_result() {
            Ok(CallbackResult::Success { code, state }) => (code, state),
            Ok(CallbackResult::Denied {
                error,
                error_description,
            }) => {
                let err = OAuth2Error::CallbackError {
                    error,
                    description: error_description,
                };
                warn!(plugin = plugin_id, "{} refused authorization: {}", provider, err);
                return Err(CallbackFailure::new(
                    CallbackStage::AwaitingRedirect,
                    AUTHENTICATION_DENIED_MESSAGE,
                ));
            }
            Err(e) if e.is_state_mismatch() => {
                warn!(plugin = plugin_id, security = true, "Callback without state parameter");
                return Err(CallbackFailure::new(
                    CallbackStage::ValidatingState,
                    INVALID_STATE_MESSAGE,
                ));
            }
            Err(e) => {
                warn!(plugin = plugin_id, "Malformed callback: {}", e);
                return Err(CallbackFailure::new(
                    CallbackStage::AwaitingRedirect,
                    AUTHENTICATION_DENIED_MESSAGE,
                ));
            }
        };

        match issued {
            Ok(issued) if issued.state == state => {}
            Ok(_) => {
                warn!(
                    plugin = plugin_id,
                    security = true,
                    "Returned state does not match the issued one, possible CSRF attempt"
                );
                return Err(CallbackFailure::new(
                    CallbackStage::ValidatingState,
                    INVALID_STATE_MESSAGE,
                ));
            }
            Err(e) => {
                warn!(
                    plugin = plugin_id,
                    security = true,
                    "No usable state for this session: {}", e
                );
                return Err(CallbackFailure::new(
                    CallbackStage::ValidatingState,
                    INVALID_STATE_MESSAGE,
                ));
            }
        }

        let mut attempt = self
            .authenticate(&code)
            .await
            .map_err(|_| self.profile_failure(CallbackStage::ExchangingToken))?;

        let profile = attempt
            .user_info()
            .await
            .map_err(|e| {
                error!(plugin = plugin_id, "Could not load {} profile: {}", provider, e);
                self.profile_failure(CallbackStage::FetchingProfile)
            })?
            .clone();

        let provider_user_id = profile.id();
        let associated = authenticator
            .check_provider_is_associated(plugin_id, &provider_user_id)
            .await
            .map_err(|e| {
                error!(plugin = plugin_id, "Account lookup failed: {}", e);
                CallbackFailure::new(CallbackStage::LinkingAccount, LINKING_FAILED_MESSAGE)
            })?;

        // Extra initial data is only gathered for accounts about to be created.
        let extra_data = if associated {
            None
        } else {
            attempt.extra_details().await
        };

        let request = AuthenticateUserRequest {
            plugin_id: plugin_id.to_string(),
            display_name: profile.name().to_string(),
            avatar_url: profile.avatar_url().map(String::from),
            provider_user_id,
            access_token: attempt.access_token().secret().to_string(),
            profile_url: profile.profile_url().map(String::from),
            extra_data,
        };

        let session = authenticator.authenticate_user(request).await.map_err(|e| {
            error!(plugin = plugin_id, "Account linking failed: {}", e);
            CallbackFailure::new(CallbackStage::LinkingAccount, LINKING_FAILED_MESSAGE)
        })?;

        info!(
            plugin = plugin_id,
            user_id = %session.user_id,
            new_account = session.new_account,
            "User authenticated via {}", provider
        );

        Ok(session)
    }
}
