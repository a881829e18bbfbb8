// rackdev - Development task runner for a VCV Rack plugin
//
// This is the library crate containing the workflow logic. The binary crate
// (main.rs) provides the CLI entry point.

pub mod config;
pub mod logging;
pub mod models;
pub mod services;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{Environment, ProjectConfig, SystemOs};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
