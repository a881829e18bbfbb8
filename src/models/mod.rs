//! Data structures shared across the workflow services.
//!
//! - [`Environment`]: immutable snapshot of OS, repository and tool locations,
//!   resolved once per invocation
//! - [`ProjectConfig`]: per-repository settings (module slug, asset and docs
//!   directories), loaded by [`crate::config::ConfigManager`]

mod environment;
mod project;

pub use environment::{Environment, SystemOs};
pub use project::{PluginManifest, ProjectConfig, ProjectPaths};
