//! Incremental SVG compilation.
//!
//! Mirrors the hand-edited source tree (`res_src/`) into the shipped asset
//! tree (`res/`), copying only files whose destination is missing or not
//! demonstrably newer, then hands the whole batch to Inkscape in a single
//! invocation. Inkscape startup dominates per-file cost, so the batch is
//! never split.

use crate::models::{Environment, ProjectConfig};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;
use tokio::process::Command;
use walkdir::WalkDir;

/// Inkscape action script applied identically to every file in the batch:
/// hides the widget layer, flattens groups and clones, converts objects and
/// text to paths, and overwrites each file in place.
const INKSCAPE_ACTIONS: &str = "select-by-id:Widgets;selection-hide;select-all;\
selection-ungroup;select-all;clone-unlink-recursively;select-all;\
object-to-path;export-text-to-path;export-overwrite;export-do;";

/// Errors that can occur during SVG synchronization
#[derive(Error, Debug)]
pub enum SvgSyncError {
    #[error("Inkscape not configured; set INKSCAPE_PATH to the Inkscape executable")]
    InkscapeNotConfigured,

    #[error("Inkscape exited with code {0}; already-copied files were left in place")]
    InkscapeFailed(i32),

    #[error("SVG source directory not found: {0}")]
    SourceDirMissing(Utf8PathBuf),
}

/// Result of one synchronization run
#[derive(Debug, Clone, Default)]
pub struct SvgSyncReport {
    /// Destination paths that were copied and handed to Inkscape.
    pub processed: Vec<Utf8PathBuf>,
    /// Source files whose destination was already newer.
    pub up_to_date: usize,
}

impl SvgSyncReport {
    pub fn summary(&self) -> String {
        if self.processed.is_empty() {
            format!("all {} SVG files up to date", self.up_to_date)
        } else {
            format!(
                "{} SVG file(s) compiled, {} up to date",
                self.processed.len(),
                self.up_to_date
            )
        }
    }
}

/// Decide whether a source file needs re-processing.
///
/// `None` means the source vanished and the file is skipped. A missing
/// destination is stale; otherwise staleness is `src_mtime >= dst_mtime`.
/// The tie counts as stale on purpose: coarse filesystem timestamps make
/// `>` lose updates within one resolution unit, and re-processing an
/// unchanged file is harmless.
fn source_is_stale(src: &Utf8Path, dst: &Utf8Path) -> Result<Option<bool>> {
    if !src.is_file() {
        return Ok(None);
    }
    if !dst.is_file() {
        return Ok(Some(true));
    }

    let src_mtime = fs::metadata(src)
        .and_then(|m| m.modified())
        .with_context(|| format!("failed to stat {}", src))?;
    let dst_mtime = fs::metadata(dst)
        .and_then(|m| m.modified())
        .with_context(|| format!("failed to stat {}", dst))?;

    Ok(Some(src_mtime >= dst_mtime))
}

/// Synchronize the SVG asset trees and compile stale files.
///
/// Tool presence is checked before any filesystem mutation, so a missing
/// Inkscape never leaves a half-synchronized destination tree. A non-zero
/// Inkscape exit is reported but copies are kept: re-running recomputes
/// staleness from scratch, so partial progress is idempotent.
pub async fn synchronize_svgs(env: &Environment, project: &ProjectConfig) -> Result<SvgSyncReport> {
    let inkscape = env
        .inkscape_path
        .as_ref()
        .ok_or(SvgSyncError::InkscapeNotConfigured)?;

    let src_root = env.repo_dir.join(&project.paths.svg_source_dir);
    let dst_root = env.repo_dir.join(&project.paths.svg_output_dir);
    if !src_root.is_dir() {
        return Err(SvgSyncError::SourceDirMissing(src_root).into());
    }

    let mut report = SvgSyncReport::default();

    for entry in WalkDir::new(&src_root) {
        let entry = entry.context("failed to walk SVG source tree")?;
        if !entry.file_type().is_file() {
            continue;
        }

        let src_path = Utf8PathBuf::from_path_buf(entry.into_path())
            .map_err(|p| anyhow::anyhow!("non-UTF-8 path in SVG tree: {}", p.display()))?;
        if src_path.extension() != Some("svg") {
            continue;
        }

        let relative = src_path
            .strip_prefix(&src_root)
            .expect("walked path must be under its root");
        let dst_path = dst_root.join(relative);

        match source_is_stale(&src_path, &dst_path)? {
            // Source vanished mid-walk
            None => continue,
            Some(false) => {
                tracing::debug!("up to date: {}", relative);
                report.up_to_date += 1;
            }
            Some(true) => {
                tracing::info!("copying {}", relative);
                if let Some(parent) = dst_path.parent() {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("failed to create {}", parent))?;
                }
                fs::copy(&src_path, &dst_path)
                    .with_context(|| format!("failed to copy {} to {}", src_path, dst_path))?;
                report.processed.push(dst_path);
            }
        }
    }

    if report.processed.is_empty() {
        tracing::info!("all SVG files up to date");
        return Ok(report);
    }

    tracing::info!("launching Inkscape for {} file(s)", report.processed.len());
    let mut command = Command::new(inkscape.as_std_path());
    command
        .arg("--without-gui")
        .arg("--batch-process")
        .arg(format!("--actions={INKSCAPE_ACTIONS}"))
        .args(report.processed.iter().map(|p| p.as_std_path()));
    if let Some(parent) = inkscape.parent() {
        command.current_dir(parent);
    }

    let status = command
        .status()
        .await
        .context("failed to spawn Inkscape")?;
    if !status.success() {
        return Err(SvgSyncError::InkscapeFailed(status.code().unwrap_or(-1)).into());
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{FileTime, set_file_mtime};
    use tempfile::TempDir;

    fn utf8_root(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_missing_destination_is_stale() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        let src = root.join("a.svg");
        fs::write(&src, "<svg/>").unwrap();

        assert_eq!(
            source_is_stale(&src, &root.join("missing.svg")).unwrap(),
            Some(true)
        );
    }

    #[test]
    fn test_missing_source_is_skipped() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        let dst = root.join("a.svg");
        fs::write(&dst, "<svg/>").unwrap();

        assert_eq!(source_is_stale(&root.join("gone.svg"), &dst).unwrap(), None);
    }

    #[test]
    fn test_equal_mtimes_count_as_stale() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        let src = root.join("a.svg");
        let dst = root.join("b.svg");
        fs::write(&src, "<svg/>").unwrap();
        fs::write(&dst, "<svg/>").unwrap();

        let t = FileTime::from_unix_time(1_700_000_000, 0);
        set_file_mtime(&src, t).unwrap();
        set_file_mtime(&dst, t).unwrap();

        assert_eq!(source_is_stale(&src, &dst).unwrap(), Some(true));
    }

    #[test]
    fn test_newer_destination_is_fresh() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        let src = root.join("a.svg");
        let dst = root.join("b.svg");
        fs::write(&src, "<svg/>").unwrap();
        fs::write(&dst, "<svg/>").unwrap();

        set_file_mtime(&src, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();
        set_file_mtime(&dst, FileTime::from_unix_time(1_700_000_100, 0)).unwrap();

        assert_eq!(source_is_stale(&src, &dst).unwrap(), Some(false));
    }

    #[test]
    fn test_newer_source_is_stale() {
        let temp = TempDir::new().unwrap();
        let root = utf8_root(&temp);
        let src = root.join("a.svg");
        let dst = root.join("b.svg");
        fs::write(&src, "<svg/>").unwrap();
        fs::write(&dst, "<svg/>").unwrap();

        set_file_mtime(&src, FileTime::from_unix_time(1_700_000_100, 0)).unwrap();
        set_file_mtime(&dst, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();

        assert_eq!(source_is_stale(&src, &dst).unwrap(), Some(true));
    }
}
