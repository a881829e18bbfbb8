//! Documentation screenshot capture.
//!
//! Temporarily swaps Rack's persisted configuration for a controlled one,
//! runs Rack long enough to emit module screenshots, harvests the PNGs into
//! the docs tree, and restores the original configuration.
//!
//! Restoration is the correctness core: two files are placed under
//! [`SwapGuard`] control and put back on every exit path, including errors
//! and panics, via the guard's `Drop`. After `capture_screenshots` returns,
//! each live file's existence and byte content equal their pre-call state.
//!
//! Known limitation: killing the orchestrator itself between swap and
//! restore loses the in-memory backup bookkeeping and leaves the swapped
//! files (with their `_bak` siblings) on disk for manual recovery.

use crate::models::{Environment, ProjectConfig};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;
use tokio::process::Command;

/// Rack's persisted settings file, relative to the Rack directory.
const RACK_SETTINGS_FILE: &str = "settings.json";

/// Rack's screenshot output directory, relative to the Rack directory.
const RACK_SCREENSHOTS_DIR: &str = "screenshots";

/// Suffix appended to a live file's name to form its backup path.
const BACKUP_SUFFIX: &str = "_bak";

/// Screenshot run length passed to Rack's `-t` flag, in seconds.
const RACK_RUN_SECONDS: &str = "2";

/// Errors that abort the capture workflow before any file is touched
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("VCV Rack not found in '{0}'; set RACK_DIR to the Rack installation")]
    RackNotFound(Utf8PathBuf),

    #[error("screenshot defaults file not found: {0}")]
    ReplacementConfigMissing(Utf8PathBuf),
}

/// Terminal outcome of a capture run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Rack produced a screenshot directory; `harvested` PNGs were moved out.
    Captured { harvested: usize },
    /// Rack exited without creating the screenshot directory. A legitimate
    /// empty result, not a failure.
    NoArtifacts,
}

/// A configuration file scheduled for temporary, reversible substitution.
#[derive(Debug, Clone)]
struct SwapPlan {
    live: Utf8PathBuf,
    /// Controlled file copied over the live path after backup; `None` leaves
    /// the live path absent so Rack regenerates defaults.
    replacement: Option<Utf8PathBuf>,
}

/// A swapped configuration file tracked for restoration.
#[derive(Debug)]
struct SwapTarget {
    live: Utf8PathBuf,
    backup: Utf8PathBuf,
    existed_before: bool,
}

/// Holds swapped configuration files and guarantees their restoration.
///
/// The happy path calls [`SwapGuard::restore`] explicitly so filesystem
/// errors surface; `Drop` is the backstop for early returns and panics,
/// where errors can only be logged.
#[derive(Debug)]
struct SwapGuard {
    targets: Vec<SwapTarget>,
    restored: bool,
}

impl SwapGuard {
    /// Back up and replace each planned file, in order.
    ///
    /// Backups use `fs::rename`, never copy-then-delete, so a crash inside a
    /// transition cannot lose the original. If a later plan fails, targets
    /// swapped so far are restored by the returned-guard's drop.
    fn swap(plans: Vec<SwapPlan>) -> Result<Self> {
        let mut guard = Self {
            targets: Vec::with_capacity(plans.len()),
            restored: false,
        };

        for plan in plans {
            let backup = backup_path(&plan.live);
            let existed_before = plan.live.is_file();

            if existed_before {
                tracing::info!("backing up {}", plan.live);
                fs::rename(&plan.live, &backup)
                    .with_context(|| format!("failed to back up {} to {}", plan.live, backup))?;
            }

            // Track before installing the replacement so a failed copy still
            // rolls this target back.
            guard.targets.push(SwapTarget {
                live: plan.live.clone(),
                backup,
                existed_before,
            });

            if let Some(replacement) = &plan.replacement {
                tracing::info!("installing {} at {}", replacement, plan.live);
                fs::copy(replacement, &plan.live).with_context(|| {
                    format!("failed to install {} at {}", replacement, plan.live)
                })?;
            }
        }

        Ok(guard)
    }

    /// Restore every target: delete the live file, then move the backup
    /// back if one was taken.
    fn restore(mut self) -> Result<()> {
        // Mark first so Drop does not re-run a partial restore.
        self.restored = true;
        self.restore_targets()
    }

    fn restore_targets(&mut self) -> Result<()> {
        for target in &self.targets {
            if target.live.exists() {
                fs::remove_file(&target.live)
                    .with_context(|| format!("failed to remove {}", target.live))?;
            }
            if target.existed_before {
                tracing::info!("restoring {}", target.live);
                fs::rename(&target.backup, &target.live).with_context(|| {
                    format!("failed to restore {} from {}", target.live, target.backup)
                })?;
            }
        }
        Ok(())
    }
}

impl Drop for SwapGuard {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(err) = self.restore_targets() {
            tracing::error!("failed to restore swapped configuration: {:#}", err);
        }
    }
}

fn backup_path(live: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{live}{BACKUP_SUFFIX}"))
}

/// Capture documentation screenshots for every module.
///
/// State machine: Clean -> Swapped -> Captured -> Restored, with the error
/// path joining at Restored from any step after the swap. Preconditions
/// (Rack present, controlled defaults file present) are checked before any
/// mutation.
pub async fn capture_screenshots(
    env: &Environment,
    project: &ProjectConfig,
) -> Result<CaptureOutcome> {
    let rack = env
        .rack_executable
        .as_ref()
        .ok_or_else(|| CaptureError::RackNotFound(env.rack_dir.clone()))?;

    let replacement = env.repo_dir.join(&project.paths.screenshot_config);
    if !replacement.is_file() {
        return Err(CaptureError::ReplacementConfigMissing(replacement).into());
    }

    let shots_dir = env
        .rack_dir
        .join(RACK_SCREENSHOTS_DIR)
        .join(&project.slug);
    clear_stale_artifacts(&shots_dir)?;

    let guard = SwapGuard::swap(vec![
        // Removed so Rack regenerates pristine settings for the run
        SwapPlan {
            live: env.rack_dir.join(RACK_SETTINGS_FILE),
            replacement: None,
        },
        // Replaced with the controlled module-defaults file
        SwapPlan {
            live: env.rack_dir.join(project.defaults_override_file()),
            replacement: Some(replacement),
        },
    ])?;

    let outcome = run_and_harvest(env, project, rack, &shots_dir).await;

    match guard.restore() {
        Ok(()) => outcome,
        Err(restore_err) => match outcome {
            // The capture error is the root cause; the restore failure is
            // logged so it is not lost.
            Err(capture_err) => {
                tracing::error!("restore failed after capture error: {:#}", restore_err);
                Err(capture_err)
            }
            Ok(_) => Err(restore_err),
        },
    }
}

/// Delete leftover PNGs from a previous run so they cannot be mistaken for
/// fresh output.
fn clear_stale_artifacts(shots_dir: &Utf8Path) -> Result<()> {
    if !shots_dir.is_dir() {
        return Ok(());
    }

    tracing::info!("deleting old screenshots from {}", shots_dir);
    for entry in shots_dir
        .read_dir_utf8()
        .with_context(|| format!("failed to read {}", shots_dir))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.extension() == Some("png") {
            fs::remove_file(path).with_context(|| format!("failed to remove {}", path))?;
        }
    }
    Ok(())
}

/// Run Rack under the swapped configuration, then harvest its output.
///
/// Any exit status reaches the harvest step: Rack terminating itself after
/// `-t` expires, being closed by the operator, or crashing all leave whatever
/// screenshots it managed to write.
async fn run_and_harvest(
    env: &Environment,
    project: &ProjectConfig,
    rack: &Utf8Path,
    shots_dir: &Utf8Path,
) -> Result<CaptureOutcome> {
    tracing::info!("launching Rack to generate screenshots");
    let status = Command::new(rack.as_std_path())
        .args(["-d", "-t", RACK_RUN_SECONDS])
        .current_dir(env.rack_dir.as_std_path())
        .status()
        .await
        .context("failed to launch VCV Rack")?;
    if !status.success() {
        tracing::warn!("Rack exited with {}; harvesting whatever was produced", status);
    }

    if !shots_dir.is_dir() {
        tracing::warn!("no screenshots found at {}", shots_dir);
        return Ok(CaptureOutcome::NoArtifacts);
    }

    let docs_dir = env.repo_dir.join(&project.paths.docs_screenshots_dir);
    fs::create_dir_all(&docs_dir).with_context(|| format!("failed to create {}", docs_dir))?;

    tracing::info!("moving screenshots to {}", docs_dir);
    let mut harvested = 0;
    for entry in shots_dir
        .read_dir_utf8()
        .with_context(|| format!("failed to read {}", shots_dir))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.extension() != Some("png") {
            continue;
        }

        let dest = docs_dir.join(entry.file_name());
        fs::rename(path, &dest)
            .with_context(|| format!("failed to move {} to {}", path, dest))?;
        harvested += 1;
    }

    Ok(CaptureOutcome::Captured { harvested })
}
