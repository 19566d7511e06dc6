//! Server hosting Dribbble social login.

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
