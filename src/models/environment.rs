use anyhow::{Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::env;

/// Operating system family the tool is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemOs {
    Windows,
    Linux,
    MacOs,
}

impl SystemOs {
    /// Detect the OS family for the current build target.
    pub fn current() -> Self {
        if cfg!(windows) {
            SystemOs::Windows
        } else if cfg!(target_os = "macos") {
            SystemOs::MacOs
        } else {
            SystemOs::Linux
        }
    }

    /// File name of the Rack executable for this OS family.
    pub fn rack_executable_name(self) -> &'static str {
        match self {
            SystemOs::Windows => "Rack.exe",
            SystemOs::Linux | SystemOs::MacOs => "Rack",
        }
    }

    /// File name of the built plugin library for this OS family.
    pub fn plugin_library_name(self) -> &'static str {
        match self {
            SystemOs::Windows => "plugin.dll",
            SystemOs::Linux => "plugin.so",
            SystemOs::MacOs => "plugin.dylib",
        }
    }
}

/// Name of the environment variable pointing at the Rack installation.
pub const RACK_DIR_VAR: &str = "RACK_DIR";

/// Name of the environment variable pointing at the Inkscape executable.
pub const INKSCAPE_PATH_VAR: &str = "INKSCAPE_PATH";

/// Default Rack location relative to the repository when `RACK_DIR` is unset.
const DEFAULT_RACK_DIR: &str = "../..";

/// The VCV plugin manifest that marks the repository root.
const REPO_MARKER: &str = "plugin.json";

/// Immutable snapshot of the process environment, resolved once per
/// invocation and passed to every service.
///
/// Optional tools are represented as `None` rather than failing resolution;
/// each consumer checks for absence and reports a user-facing error at its
/// own use site.
#[derive(Debug, Clone)]
pub struct Environment {
    pub os: SystemOs,
    /// Repository root (nearest ancestor containing `plugin.json`).
    pub repo_dir: Utf8PathBuf,
    /// Rack installation directory (`RACK_DIR`, or `../..` from the repo).
    pub rack_dir: Utf8PathBuf,
    /// The Rack executable, `None` when not present as a regular file.
    pub rack_executable: Option<Utf8PathBuf>,
    /// Inkscape executable from `INKSCAPE_PATH`, `None` when unset.
    pub inkscape_path: Option<Utf8PathBuf>,
    /// `cmake` found on PATH, `None` when absent.
    pub cmake_path: Option<Utf8PathBuf>,
    /// `cppcheck` found on PATH, `None` when absent.
    pub cppcheck_path: Option<Utf8PathBuf>,
    /// Parallelism for native builds.
    pub thread_count: usize,
}

impl Environment {
    /// Resolve the environment from the current working directory and
    /// process environment variables.
    ///
    /// Fails only when the repository root cannot be located; missing tools
    /// are recorded as `None`.
    pub fn resolve() -> Result<Self> {
        let cwd = Utf8PathBuf::from_path_buf(env::current_dir()?)
            .map_err(|p| anyhow::anyhow!("working directory is not UTF-8: {}", p.display()))?;
        let repo_dir = find_repo_root(&cwd)?;

        Ok(Self::resolve_at(
            repo_dir,
            env::var(RACK_DIR_VAR).ok(),
            env::var(INKSCAPE_PATH_VAR).ok(),
        ))
    }

    /// Resolve from an explicit repository root and variable values.
    ///
    /// Split out from [`Environment::resolve`] so tests can construct
    /// environments without mutating the process environment.
    pub fn resolve_at(
        repo_dir: Utf8PathBuf,
        rack_dir_var: Option<String>,
        inkscape_var: Option<String>,
    ) -> Self {
        let os = SystemOs::current();

        let rack_dir = match rack_dir_var {
            Some(dir) if !dir.is_empty() => {
                let path = Utf8PathBuf::from(dir);
                if path.is_absolute() {
                    path
                } else {
                    repo_dir.join(path)
                }
            }
            _ => repo_dir.join(DEFAULT_RACK_DIR),
        };

        let rack_executable = {
            let candidate = rack_dir.join(os.rack_executable_name());
            candidate.is_file().then_some(candidate)
        };

        let inkscape_path = inkscape_var
            .filter(|v| !v.is_empty())
            .map(Utf8PathBuf::from);

        let thread_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            os,
            repo_dir,
            rack_dir,
            rack_executable,
            inkscape_path,
            cmake_path: find_on_path("cmake"),
            cppcheck_path: find_on_path("cppcheck"),
            thread_count,
        }
    }
}

/// Walk upward from `start` until a directory containing `plugin.json` is
/// found.
pub fn find_repo_root(start: &Utf8Path) -> Result<Utf8PathBuf> {
    let mut current = start;
    loop {
        if current.join(REPO_MARKER).is_file() {
            return Ok(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => bail!(
                "could not find '{}' in '{}' or any parent directory",
                REPO_MARKER,
                start
            ),
        }
    }
}

fn find_on_path(tool: &str) -> Option<Utf8PathBuf> {
    match which::which(tool) {
        Ok(path) => match Utf8PathBuf::from_path_buf(path) {
            Ok(path) => Some(path),
            Err(path) => {
                tracing::warn!("{} found at non-UTF-8 path, ignoring: {}", tool, path.display());
                None
            }
        },
        Err(_) => {
            tracing::debug!("{} not found on PATH", tool);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn utf8_root(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_rack_executable_name_per_os() {
        assert_eq!(SystemOs::Windows.rack_executable_name(), "Rack.exe");
        assert_eq!(SystemOs::Linux.rack_executable_name(), "Rack");
        assert_eq!(SystemOs::MacOs.rack_executable_name(), "Rack");
    }

    #[test]
    fn test_plugin_library_name_per_os() {
        assert_eq!(SystemOs::Windows.plugin_library_name(), "plugin.dll");
        assert_eq!(SystemOs::Linux.plugin_library_name(), "plugin.so");
        assert_eq!(SystemOs::MacOs.plugin_library_name(), "plugin.dylib");
    }

    #[test]
    fn test_find_repo_root_walks_up() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        fs::write(root.join("plugin.json"), "{\"slug\": \"Test\"}").unwrap();
        let nested = root.join("src/modules");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_repo_root(&nested).unwrap(), root);
    }

    #[test]
    fn test_find_repo_root_missing_marker() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);

        assert!(find_repo_root(&root).is_err());
    }

    #[test]
    fn test_rack_executable_soft_absence() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        let rack_dir = root.join("rack");
        fs::create_dir_all(&rack_dir).unwrap();

        let env = Environment::resolve_at(root.clone(), Some(rack_dir.to_string()), None);
        assert_eq!(env.rack_dir, rack_dir);
        assert!(env.rack_executable.is_none());
    }

    #[test]
    fn test_rack_executable_found() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        let rack_dir = root.join("rack");
        fs::create_dir_all(&rack_dir).unwrap();
        let exe = rack_dir.join(SystemOs::current().rack_executable_name());
        fs::write(&exe, "").unwrap();

        let env = Environment::resolve_at(root, Some(rack_dir.to_string()), None);
        assert_eq!(env.rack_executable, Some(exe));
    }

    #[test]
    fn test_rack_dir_defaults_relative_to_repo() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);

        let env = Environment::resolve_at(root.clone(), None, None);
        assert_eq!(env.rack_dir, root.join("../.."));
    }

    #[test]
    fn test_inkscape_path_from_variable() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);

        let env = Environment::resolve_at(root.clone(), None, Some("/opt/inkscape/bin/inkscape".into()));
        assert_eq!(
            env.inkscape_path.as_deref(),
            Some(Utf8Path::new("/opt/inkscape/bin/inkscape"))
        );

        let env = Environment::resolve_at(root, None, None);
        assert!(env.inkscape_path.is_none());
    }
}
