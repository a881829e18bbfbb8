//! Native build, static analysis and development-mode launch.
//!
//! Thin subprocess glue around CMake, cppcheck and Rack itself; each step is
//! a single blocking invocation with a fixed argument list and the non-zero
//! exit code reported to the user.

use crate::models::Environment;
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

/// CMake compile database file name.
const COMPILE_DATABASE: &str = "compile_commands.json";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("CMake could not be found on PATH")]
    CmakeNotFound,

    #[error("cppcheck could not be found on PATH")]
    CppcheckNotFound,

    #[error("{step} failed with exit code {code}")]
    StepFailed { step: &'static str, code: i32 },
}

/// Build flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildKind {
    #[default]
    Release,
    Debug,
}

impl BuildKind {
    pub fn cmake_build_type(self) -> &'static str {
        match self {
            BuildKind::Release => "Release",
            BuildKind::Debug => "Debug",
        }
    }

    fn dir_suffix(self) -> &'static str {
        match self {
            BuildKind::Release => "release",
            BuildKind::Debug => "debug",
        }
    }
}

/// Repository-relative paths derived from the build flavor.
#[derive(Debug, Clone)]
pub struct BuildPaths {
    pub build_dir: Utf8PathBuf,
    pub cppcheck_dir: Utf8PathBuf,
}

impl BuildPaths {
    pub fn new(kind: BuildKind) -> Self {
        let build_dir = Utf8PathBuf::from(format!("dep/cmake-build-{}", kind.dir_suffix()));
        let cppcheck_dir = build_dir.join("cppcheck");
        Self {
            build_dir,
            cppcheck_dir,
        }
    }
}

/// Options forwarded to cppcheck.
#[derive(Debug, Clone, Default)]
pub struct CppcheckOptions {
    pub kind: BuildKind,
    pub force: bool,
    pub inconclusive: bool,
    pub max_configs: Option<u32>,
    pub jobs: Option<u32>,
    pub output_file: Option<Utf8PathBuf>,
}

async fn run_step(step: &'static str, command: &mut Command) -> Result<()> {
    let status = command
        .status()
        .await
        .with_context(|| format!("failed to spawn {step}"))?;
    if !status.success() {
        return Err(BuildError::StepFailed {
            step,
            code: status.code().unwrap_or(-1),
        }
        .into());
    }
    Ok(())
}

/// Configure, build and install the plugin, then copy the compile database
/// and the built plugin library to the repository root.
pub async fn build_plugin(env: &Environment, kind: BuildKind) -> Result<()> {
    let cmake = env.cmake_path.as_ref().ok_or(BuildError::CmakeNotFound)?;
    let paths = BuildPaths::new(kind);

    tracing::info!("generating CMake build files");
    run_step(
        "CMake configure",
        Command::new(cmake.as_std_path())
            .args(["-B", paths.build_dir.as_str()])
            .arg(format!("-DRACK_SDK_DIR={}", env.rack_dir))
            .arg(format!("-DCMAKE_BUILD_TYPE={}", kind.cmake_build_type()))
            .arg(format!("-DCMAKE_INSTALL_PREFIX={}/dist", paths.build_dir))
            .arg(".")
            .current_dir(env.repo_dir.as_std_path()),
    )
    .await?;

    tracing::info!("building plugin with {} thread(s)", env.thread_count);
    run_step(
        "CMake build",
        Command::new(cmake.as_std_path())
            .args(["--build", paths.build_dir.as_str()])
            .args(["--", "-j", &env.thread_count.to_string()])
            .current_dir(env.repo_dir.as_std_path()),
    )
    .await?;

    tracing::info!("installing plugin files");
    run_step(
        "CMake install",
        Command::new(cmake.as_std_path())
            .args(["--install", paths.build_dir.as_str()])
            .current_dir(env.repo_dir.as_std_path()),
    )
    .await?;

    // Keep the compile database and built library next to plugin.json where
    // cppcheck and Rack's plugin loader expect them.
    let build_root = env.repo_dir.join(&paths.build_dir);
    for file in [COMPILE_DATABASE, env.os.plugin_library_name()] {
        let from = build_root.join(file);
        let to = env.repo_dir.join(file);
        tracing::info!("copying {} to repo root", file);
        std::fs::copy(&from, &to)
            .with_context(|| format!("failed to copy {} to {}", from, to))?;
    }

    Ok(())
}

/// Run cppcheck against the compile database produced by [`build_plugin`].
pub async fn run_cppcheck(env: &Environment, options: &CppcheckOptions) -> Result<()> {
    let cppcheck = env
        .cppcheck_path
        .as_ref()
        .ok_or(BuildError::CppcheckNotFound)?;
    let paths = BuildPaths::new(options.kind);

    std::fs::create_dir_all(env.repo_dir.join(&paths.cppcheck_dir))
        .with_context(|| format!("failed to create {}", paths.cppcheck_dir))?;

    let mut command = Command::new(cppcheck.as_std_path());
    command
        .arg(format!("--project={COMPILE_DATABASE}"))
        .arg(format!("--cppcheck-build-dir={}", paths.cppcheck_dir))
        .arg("--std=c++17")
        .arg(format!("--relative-paths={};{}", env.rack_dir, env.repo_dir))
        .arg("--error-exitcode=1")
        .arg("--suppressions-list=CppCheckSuppressions.txt")
        .arg("--inline-suppr")
        .arg("--enable=warning,portability,missingInclude")
        .arg("--check-level=exhaustive")
        .current_dir(env.repo_dir.as_std_path());

    if options.inconclusive {
        command.arg("--inconclusive");
    }
    if options.force {
        command.arg("--force");
    }
    if let Some(max_configs) = options.max_configs {
        command.arg(format!("--max-configs={max_configs}"));
    }
    if let Some(jobs) = options.jobs {
        command.arg(format!("-j{jobs}"));
    }
    if let Some(output_file) = &options.output_file {
        command.arg(format!("--output-file={output_file}"));
    }

    tracing::info!("running cppcheck");
    run_step("cppcheck", &mut command).await
}

/// Launch Rack in development mode, optionally teeing its output to a file.
///
/// Blocks until Rack exits; the run is operator-supervised and has no
/// timeout.
pub async fn run_rack(env: &Environment, logfile: Option<&Utf8PathBuf>) -> Result<()> {
    let rack = env.rack_executable.as_ref().ok_or_else(|| {
        crate::services::screenshots::CaptureError::RackNotFound(env.rack_dir.clone())
    })?;

    tracing::info!("starting VCV Rack in development mode");
    let mut command = Command::new(rack.as_std_path());
    command.arg("-d").current_dir(env.rack_dir.as_std_path());

    if let Some(logfile) = logfile {
        let out = std::fs::File::create(logfile)
            .with_context(|| format!("failed to create {}", logfile))?;
        let err = out
            .try_clone()
            .context("failed to clone log file handle")?;
        command.stdout(Stdio::from(out)).stderr(Stdio::from(err));
    }

    let status = command.status().await.context("failed to launch VCV Rack")?;
    tracing::info!("Rack exited with {}", status);
    Ok(())
}
