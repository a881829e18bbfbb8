use crate::models::{PluginManifest, ProjectConfig, ProjectPaths};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Optional per-repository settings file overriding the directory layout.
const PROJECT_OVERRIDES_FILE: &str = "rackdev.yaml";

/// Loads project configuration from the repository root.
///
/// Two sources are combined:
/// - `plugin.json` (required): the VCV plugin manifest, read for the slug
/// - `rackdev.yaml` (optional): directory-layout overrides
#[derive(Debug, Clone)]
pub struct ConfigManager {
    repo_dir: Utf8PathBuf,
    manifest_path: Utf8PathBuf,
    overrides_path: Utf8PathBuf,
}

impl ConfigManager {
    pub fn new<P: AsRef<Utf8Path>>(repo_dir: P) -> Self {
        let repo_dir = repo_dir.as_ref().to_path_buf();
        Self {
            manifest_path: repo_dir.join("plugin.json"),
            overrides_path: repo_dir.join(PROJECT_OVERRIDES_FILE),
            repo_dir,
        }
    }

    /// Load the project configuration.
    ///
    /// A missing `rackdev.yaml` yields the default layout; a missing or
    /// unparseable `plugin.json` is an error, since the slug is required by
    /// both workflows.
    pub fn load(&self) -> Result<ProjectConfig> {
        let manifest = self.load_manifest()?;
        let paths = self.load_paths()?;

        tracing::debug!("project config loaded: slug={}", manifest.slug);
        Ok(ProjectConfig {
            slug: manifest.slug,
            paths,
        })
    }

    fn load_manifest(&self) -> Result<PluginManifest> {
        let contents = fs::read_to_string(&self.manifest_path)
            .with_context(|| format!("failed to read plugin manifest: {}", self.manifest_path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse plugin manifest: {}", self.manifest_path))
    }

    fn load_paths(&self) -> Result<ProjectPaths> {
        if !self.overrides_path.is_file() {
            return Ok(ProjectPaths::default());
        }

        let contents = fs::read_to_string(&self.overrides_path)
            .with_context(|| format!("failed to read {}", self.overrides_path))?;

        let paths = serde_yaml_ng::from_str(&contents)
            .with_context(|| format!("failed to parse {}", self.overrides_path))?;

        tracing::info!("loaded layout overrides from {}", self.overrides_path);
        Ok(paths)
    }

    pub fn repo_dir(&self) -> &Utf8Path {
        &self.repo_dir
    }
}
