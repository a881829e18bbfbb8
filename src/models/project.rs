use serde::{Deserialize, Serialize};

/// The subset of VCV Rack's `plugin.json` manifest the tool cares about.
///
/// The manifest doubles as the repository-root marker; its `slug` keys the
/// screenshot output directory and the defaults override file name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub slug: String,
}

/// Repository-relative directory layout, overridable via `rackdev.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectPaths {
    /// Source tree of hand-edited SVGs.
    #[serde(default = "default_svg_source_dir")]
    pub svg_source_dir: String,

    /// Mirrored destination tree of compiled SVGs shipped with the plugin.
    #[serde(default = "default_svg_output_dir")]
    pub svg_output_dir: String,

    /// Where harvested documentation screenshots land.
    #[serde(default = "default_docs_screenshots_dir")]
    pub docs_screenshots_dir: String,

    /// Controlled module-defaults file installed during screenshot capture.
    #[serde(default = "default_screenshot_config")]
    pub screenshot_config: String,
}

impl Default for ProjectPaths {
    fn default() -> Self {
        Self {
            svg_source_dir: default_svg_source_dir(),
            svg_output_dir: default_svg_output_dir(),
            docs_screenshots_dir: default_docs_screenshots_dir(),
            screenshot_config: default_screenshot_config(),
        }
    }
}

fn default_svg_source_dir() -> String {
    "res_src".to_string()
}

fn default_svg_output_dir() -> String {
    "res".to_string()
}

fn default_docs_screenshots_dir() -> String {
    "docs/images/modules".to_string()
}

fn default_screenshot_config() -> String {
    "scripts/screenshots_config_default.json".to_string()
}

/// Per-repository project settings: the plugin slug plus the directory
/// layout.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub slug: String,
    pub paths: ProjectPaths,
}

impl ProjectConfig {
    /// File name of the module-defaults override Rack loads from its root,
    /// e.g. `MyModules_Default.json`.
    pub fn defaults_override_file(&self) -> String {
        format!("{}_Default.json", self.slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_paths_defaults() {
        let paths = ProjectPaths::default();
        assert_eq!(paths.svg_source_dir, "res_src");
        assert_eq!(paths.svg_output_dir, "res");
        assert_eq!(paths.docs_screenshots_dir, "docs/images/modules");
        assert_eq!(paths.screenshot_config, "scripts/screenshots_config_default.json");
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let paths: ProjectPaths = serde_yaml_ng::from_str("svg_source_dir: art/src\n").unwrap();
        assert_eq!(paths.svg_source_dir, "art/src");
        assert_eq!(paths.svg_output_dir, "res");
    }

    #[test]
    fn test_defaults_override_file_uses_slug() {
        let project = ProjectConfig {
            slug: "PhantomModules".to_string(),
            paths: ProjectPaths::default(),
        };
        assert_eq!(project.defaults_override_file(), "PhantomModules_Default.json");
    }

    #[test]
    fn test_manifest_parses_extra_fields() {
        let manifest: PluginManifest =
            serde_json::from_str(r#"{"slug": "Test", "version": "2.0.1", "license": "MIT"}"#)
                .unwrap();
        assert_eq!(manifest.slug, "Test");
    }
}
