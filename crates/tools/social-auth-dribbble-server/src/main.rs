use anyhow::{Context, Result};
use clap::Parser;
use social_auth_dribbble_server::app::{build_app, spawn_session_sweeper, spawn_state_sweeper};
use social_auth_dribbble_server::cli::Args;
use social_auth_dribbble_server::config::{Config, DEFAULT_JWT_SECRET};
use social_auth_dribbble_server::logging;
use std::time::Duration;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    if args.check {
        println!("Configuration OK");
        return Ok(());
    }

    logging::init(&config.logging)?;

    match &config.source {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => debug!("No config file found, using defaults and environment"),
    }

    if config.session.jwt_secret == DEFAULT_JWT_SECRET {
        warn!("Using default JWT secret - this is insecure for production!");
    }

    let app = build_app(&config);
    if app.dribbble_enabled {
        info!("Dribbble redirect URI: {}", config.redirect_uri());
    } else {
        warn!("Dribbble login is not configured; the login route will report it");
    }

    let cleanup_interval = Duration::from_secs(config.oauth.cleanup_interval_seconds);
    let _state_sweeper = spawn_state_sweeper(app.state_store.clone(), cleanup_interval);
    let _session_sweeper = spawn_session_sweeper(app.sessions.clone(), cleanup_interval);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server running on {}", config.base_url());

    axum::serve(listener, app.router)
        .await
        .context("Server error")?;

    Ok(())
}
