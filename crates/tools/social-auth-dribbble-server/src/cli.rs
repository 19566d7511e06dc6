use clap::Parser;
use std::path::PathBuf;

/// Serve Dribbble social login
#[derive(Debug, Parser)]
#[command(name = "social-auth-dribbble-server")]
#[command(about = "Serve Dribbble social login")]
#[command(version)]
pub struct Args {
    /// Configuration file (TOML). Falls back to SOCIAL_AUTH_CONFIG_FILE, then config.toml
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the configured listen port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the configured log level
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Validate the configuration and exit
    #[arg(long)]
    pub check: bool,
}
