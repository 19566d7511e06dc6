//! HTTP routes for Dribbble login.
//!
//! Both routes always answer with a redirect. Failures land on the login page
//! with a flash message cookie; success lands on the landing page with the
//! session cookie set.

use crate::manager::DribbbleAuthManager;
use crate::settings::{CALLBACK_PATH, LOGIN_PATH};
use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    response::Redirect,
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use social_auth_core::UserAuthenticator;
use social_auth_oauth2::{CallbackOutcome, CallbackQuery};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

/// Browser session id the anti-CSRF state is stored under.
pub const STATE_SESSION_COOKIE: &str = "social_auth_sid";
/// Signed session token issued after a successful login.
pub const SESSION_COOKIE: &str = "social_auth_session";
/// One-shot message shown on the login page.
pub const FLASH_COOKIE: &str = "social_auth_message";

pub const NOT_CONFIGURED_MESSAGE: &str = "Dribbble login is not configured on this site.";
pub const START_FAILED_MESSAGE: &str = "Could not start Dribbble login. Please try again.";

#[derive(Debug, Clone)]
pub struct ControllerPaths {
    /// Where failures are sent.
    pub login_path: String,
    /// Where a successful login ends.
    pub landing_path: String,
}

impl Default for ControllerPaths {
    fn default() -> Self {
        Self {
            login_path: "/user/login".to_string(),
            landing_path: "/user".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct DribbbleAuthController {
    /// `None` while the module has no credentials.
    manager: Option<Arc<DribbbleAuthManager>>,
    authenticator: Arc<dyn UserAuthenticator>,
    paths: ControllerPaths,
    secure_cookies: bool,
}

impl DribbbleAuthController {
    pub fn new(
        manager: Option<Arc<DribbbleAuthManager>>,
        authenticator: Arc<dyn UserAuthenticator>,
        paths: ControllerPaths,
    ) -> Self {
        Self {
            manager,
            authenticator,
            paths,
            secure_cookies: false,
        }
    }

    /// Mark cookies `Secure`; enable when the site is served over HTTPS.
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    pub fn router(self) -> Router {
        Router::new()
            .route(LOGIN_PATH, get(redirect_to_provider))
            .route(CALLBACK_PATH, get(callback))
            .with_state(self)
    }

    fn cookie(&self, name: &'static str, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookies)
            .build()
    }

    fn fail(&self, jar: CookieJar, message: &str) -> (CookieJar, Redirect) {
        (
            jar.add(self.cookie(FLASH_COOKIE, message.to_string())),
            Redirect::to(&self.paths.login_path),
        )
    }
}

async fn redirect_to_provider(
    State(controller): State<DribbbleAuthController>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let Some(manager) = controller.manager.as_ref() else {
        warn!(plugin = crate::PLUGIN_ID, "Login attempted while module is not configured");
        return controller.fail(jar, NOT_CONFIGURED_MESSAGE);
    };

    let session_id = jar
        .get(STATE_SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    match manager.start(&session_id).await {
        Ok(request) => (
            jar.add(controller.cookie(STATE_SESSION_COOKIE, session_id)),
            Redirect::to(&request.url),
        ),
        Err(e) => {
            error!(plugin = crate::PLUGIN_ID, "Could not start login: {}", e);
            controller.fail(jar, START_FAILED_MESSAGE)
        }
    }
}

async fn callback(
    State(controller): State<DribbbleAuthController>,
    jar: CookieJar,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> (CookieJar, Redirect) {
    let Some(manager) = controller.manager.as_ref() else {
        return controller.fail(jar, NOT_CONFIGURED_MESSAGE);
    };

    let session_id = jar.get(STATE_SESSION_COOKIE).map(|c| c.value().to_string());
    let outcome = match query {
        Ok(Query(query)) => {
            manager
                .handle_callback(session_id.as_deref(), query, controller.authenticator.as_ref())
                .await
        }
        Err(rejection) => {
            manager
                .reject_callback(session_id.as_deref(), &rejection.body_text())
                .await
        }
    };

    let jar = jar.remove(Cookie::build(STATE_SESSION_COOKIE).path("/"));

    match outcome {
        CallbackOutcome::Authenticated(session) => (
            jar.add(controller.cookie(SESSION_COOKIE, session.session_token)),
            Redirect::to(&controller.paths.landing_path),
        ),
        CallbackOutcome::Failed(failure) => controller.fail(jar, &failure.message),
    }
}
