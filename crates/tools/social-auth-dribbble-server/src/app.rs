//! Application wiring: Dribbble login routes plus the site's own login and
//! landing pages.

use crate::config::Config;
use axum::{
    Router,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Duration;
use social_auth_dribbble::{
    ControllerPaths, DribbbleAuthController, DribbbleAuthManager, FLASH_COOKIE, LOGIN_PATH,
    SESSION_COOKIE, build_manager,
};
use social_auth_oauth2::{ClientOptions, InMemoryStateStore, OAuth2Config, OAuth2StateStore};
use social_auth_session::{SessionConfig, SessionService};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

pub const LOGOUT_PATH: &str = "/user/logout";

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionService>,
    pub paths: ControllerPaths,
}

pub struct App {
    pub router: Router,
    pub sessions: Arc<SessionService>,
    pub state_store: Arc<InMemoryStateStore>,
    /// Whether Dribbble login is usable.
    pub dribbble_enabled: bool,
}

/// Build the Dribbble manager, or `None` when the module is not configured.
/// Configuration problems are logged, never fatal.
pub fn dribbble_manager(
    config: &Config,
    state_store: Arc<dyn OAuth2StateStore>,
) -> Option<Arc<DribbbleAuthManager>> {
    if !config.dribbble.validate() {
        return None;
    }

    let options = ClientOptions {
        redirect_uri: config.redirect_uri(),
        proxy: config.http.proxy.clone(),
    };
    let oauth_config = OAuth2Config::new()
        .with_state_ttl(config.oauth.state_ttl_seconds)
        .with_http_timeout(config.http.timeout_seconds);

    match build_manager(&config.dribbble, options, state_store, &oauth_config) {
        Ok(manager) => Some(Arc::new(manager)),
        Err(e) => {
            error!("Dribbble login disabled: {}", e);
            None
        }
    }
}

pub fn build_app(config: &Config) -> App {
    let state_store = Arc::new(InMemoryStateStore::new());
    let defaults = SessionConfig::default();
    let sessions = Arc::new(SessionService::new(SessionConfig {
        jwt_secret: config.session.jwt_secret.clone(),
        jwt_ttl: Duration::try_seconds(config.session.jwt_ttl_seconds).unwrap_or(defaults.jwt_ttl),
        ..defaults
    }));

    let manager = dribbble_manager(config, state_store.clone());
    let dribbble_enabled = manager.is_some();

    let paths = ControllerPaths {
        login_path: config.server.login_path.clone(),
        landing_path: config.server.landing_path.clone(),
    };

    let controller = DribbbleAuthController::new(manager, sessions.clone(), paths.clone())
        .with_secure_cookies(config.server.secure_cookies);

    let router = Router::new()
        .route(&paths.login_path, get(login_page))
        .route(&paths.landing_path, get(landing_page))
        .route(LOGOUT_PATH, get(logout))
        .route("/health", get(|| async { "OK" }))
        .with_state(AppState {
            sessions: sessions.clone(),
            paths,
        })
        .merge(controller.router())
        .layer(TraceLayer::new_for_http());

    App {
        router,
        sessions,
        state_store,
        dribbble_enabled,
    }
}

/// Periodically drop authorization states that were never used.
pub fn spawn_state_sweeper(
    store: Arc<dyn OAuth2StateStore>,
    every: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match store.cleanup_expired().await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "Swept expired authorization states"),
                Err(e) => warn!("State cleanup failed: {}", e),
            }
        }
    })
}

/// Periodically forget expired login sessions.
pub fn spawn_session_sweeper(
    sessions: Arc<SessionService>,
    every: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = sessions.cleanup_expired_sessions().await;
            if removed > 0 {
                debug!(removed, "Swept expired sessions");
            }
        }
    })
}

async fn login_page(jar: CookieJar) -> (CookieJar, Html<String>) {
    let flash = jar
        .get(FLASH_COOKIE)
        .map(|c| format!(r#"<p class="message">{}</p>"#, escape_html(c.value())))
        .unwrap_or_default();

    let page = format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Log in</title></head>
<body>
    <h1>Log in</h1>
    {flash}
    <a href="{LOGIN_PATH}">Log in with Dribbble</a>
</body>
</html>"#
    );

    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), Html(page))
}

async fn landing_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
        return Redirect::to(&state.paths.login_path).into_response();
    };

    let claims = match state.sessions.verify_session(&token).await {
        Ok(claims) => claims,
        Err(e) => {
            debug!("Rejected session cookie: {}", e);
            let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
            return (jar, Redirect::to(&state.paths.login_path)).into_response();
        }
    };

    let Some(account) = state.sessions.account_by_user_id(&claims.sub).await else {
        return Redirect::to(&state.paths.login_path).into_response();
    };

    let avatar = account
        .avatar_url
        .as_deref()
        .map(|url| format!(r#"<img src="{}" alt="avatar">"#, escape_html(url)))
        .unwrap_or_default();
    let profile = account
        .profile_url
        .as_deref()
        .map(|url| format!(r#"<a href="{}">Profile</a>"#, escape_html(url)))
        .unwrap_or_default();

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Welcome</title></head>
<body>
    {avatar}
    <h1>Welcome, {name}</h1>
    {profile}
    <a href="{LOGOUT_PATH}">Log out</a>
</body>
</html>"#,
        name = escape_html(&account.display_name),
    ))
    .into_response()
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Ok(claims) = state.sessions.verify_session(cookie.value()).await {
            state.sessions.end_session(&claims.jti).await;
            info!(user_id = %claims.sub, "User logged out");
        }
    }

    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::to(&state.paths.login_path),
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
