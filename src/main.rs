//! rackdev - Development task runner for a VCV Rack plugin
//!
//! CLI entry point. Resolves the environment once, loads the project
//! configuration, then dispatches to one of the workflow services on an
//! explicitly-built tokio runtime (subprocess execution is async, the CLI
//! itself is synchronous).

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use rackdev::models::Environment;
use rackdev::services::build::{self, BuildKind, CppcheckOptions};
use rackdev::services::screenshots::{self, CaptureOutcome};
use rackdev::services::svg;
use rackdev::{APP_NAME, ConfigManager, VERSION};

#[derive(Parser)]
#[command(name = "rackdev", version, about = "Development tasks for a VCV Rack plugin")]
struct Cli {
    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Task,
}

#[derive(Subcommand)]
enum Task {
    /// Compile stale SVG assets through Inkscape
    Svg,

    /// Capture documentation screenshots by driving VCV Rack
    Screenshots,

    /// Build the plugin with CMake and install it to the repo root
    Build {
        /// Build the debug flavor instead of release
        #[arg(long)]
        debug: bool,
    },

    /// Run cppcheck against the compile database
    Check {
        /// Check the debug build's compile database
        #[arg(long)]
        debug: bool,

        /// Pass --force to cppcheck
        #[arg(short, long, conflicts_with = "max_configs")]
        force: bool,

        /// Pass --inconclusive to cppcheck
        #[arg(short, long)]
        inconclusive: bool,

        /// Pass --max-configs <N> to cppcheck
        #[arg(long)]
        max_configs: Option<u32>,

        /// How many cores cppcheck should use
        #[arg(short)]
        jobs: Option<u32>,

        /// File to write the report to
        #[arg(short, long)]
        output_file: Option<Utf8PathBuf>,
    },

    /// Run VCV Rack in development mode
    Run {
        /// Write Rack's output to the specified file
        #[arg(short, long)]
        logfile: Option<Utf8PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = rackdev::logging::setup_logging("logs", APP_NAME, cli.verbose)?;
    tracing::debug!("starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let env = Environment::resolve()?;
    let project = ConfigManager::new(&env.repo_dir).load()?;
    tracing::debug!(
        "environment resolved: repo={}, rack={}",
        env.repo_dir,
        env.rack_dir
    );

    runtime.block_on(async {
        match cli.command {
            Task::Svg => {
                let report = svg::synchronize_svgs(&env, &project).await?;
                println!("{}", report.summary());
            }
            Task::Screenshots => {
                match screenshots::capture_screenshots(&env, &project).await? {
                    CaptureOutcome::Captured { harvested } => {
                        println!(
                            "{} screenshot(s) moved to {}",
                            harvested, project.paths.docs_screenshots_dir
                        );
                    }
                    CaptureOutcome::NoArtifacts => {
                        println!("Rack produced no screenshots");
                    }
                }
            }
            Task::Build { debug } => {
                let kind = if debug { BuildKind::Debug } else { BuildKind::Release };
                build::build_plugin(&env, kind).await?;
                println!("build complete");
            }
            Task::Check {
                debug,
                force,
                inconclusive,
                max_configs,
                jobs,
                output_file,
            } => {
                let options = CppcheckOptions {
                    kind: if debug { BuildKind::Debug } else { BuildKind::Release },
                    force,
                    inconclusive,
                    max_configs,
                    jobs,
                    output_file,
                };
                build::run_cppcheck(&env, &options).await?;
                println!("cppcheck passed");
            }
            Task::Run { logfile } => {
                build::run_rack(&env, logfile.as_ref()).await?;
            }
        }
        Ok(())
    })
}
