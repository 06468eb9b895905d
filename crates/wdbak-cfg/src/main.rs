//! WDBak configuration editor: entry point.
//!
//! Runs the save / clear workflow either once from the command line or as a
//! long-lived form adapter speaking JSON lines on stdin/stdout.
//!
//! # Usage
//!
//! ```text
//! wdbak-cfg [OPTIONS] <COMMAND>
//!
//! Commands:
//!   save  [BAK] <CFG_JSON>   Validate a JSON config and hand it to the host
//!   clear [BAK]              Ask the host to erase the stored config
//!   check <CFG_JSON>         Validate a JSON config and print it normalised
//!   serve                    Drive the workflow from JSON lines on stdin
//!
//! Options:
//!   --config <PATH>  Settings file [env: WDBAK_CONFIG]
//!   --host <PROG>    Host program, overrides [host].program [env: WDBAK_HOST]
//! ```
//!
//! `BAK` is the backup executable template.  When omitted, the template next
//! to this binary (`[backend].default_name`, `WDBak.bak` by default) is used.
//!
//! Logs go to stderr; the level comes from `RUST_LOG`, falling back to
//! `[editor].log_level`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use wdbak_cfg::application::{StatusKind, WorkflowController, WorkflowStatus};
use wdbak_cfg::infrastructure::host_bridge::capabilities_from_config;
use wdbak_cfg::infrastructure::storage::config::{load_config, load_config_from, EditorConfig};
use wdbak_cfg::infrastructure::ui_bridge::serve;
use wdbak_core::{ConfigRecord, FormState};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// WDBak configuration editor.
#[derive(Debug, Parser)]
#[command(
    name = "wdbak-cfg",
    about = "Edit, validate and hand off WDBak backup client configuration",
    version
)]
struct Cli {
    /// Settings file to use instead of the platform default.
    #[arg(long, env = "WDBAK_CONFIG")]
    config: Option<PathBuf>,

    /// Host program that persists configuration.
    #[arg(long, env = "WDBAK_HOST")]
    host: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a JSON config and hand it to the host.
    Save {
        /// `[BAK] CFG_JSON`
        #[arg(num_args = 1..=2, value_names = ["BAK", "CFG_JSON"], required = true)]
        paths: Vec<PathBuf>,
    },
    /// Ask the host to erase the stored config.
    Clear {
        bak: Option<PathBuf>,
    },
    /// Validate a JSON config and print it normalised.
    Check {
        cfg_json: PathBuf,
    },
    /// Drive the workflow from JSON lines on stdin.
    Serve,
}

/// Splits `[BAK] CFG_JSON` into its optional and required halves.
fn split_save_paths(paths: &[PathBuf]) -> anyhow::Result<(Option<PathBuf>, PathBuf)> {
    match paths {
        [cfg] => Ok((None, cfg.clone())),
        [bak, cfg] => Ok((Some(bak.clone()), cfg.clone())),
        _ => bail!("use: wdbak-cfg save [BAK] CFG_JSON"),
    }
}

fn read_record(path: &Path) -> anyhow::Result<ConfigRecord> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    ConfigRecord::from_json(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn load_settings(cli: &Cli) -> anyhow::Result<EditorConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
    .context("failed to load editor settings")?;

    if let Some(host) = &cli.host {
        config.host.program = Some(host.clone());
    }
    Ok(config)
}

fn init_logging(config: &EditorConfig) {
    let fallback = config.editor.log_level.clone();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

/// Prints the status line; returns whether the operation succeeded.
fn report(status: &WorkflowStatus) -> bool {
    if status.kind == StatusKind::Success {
        println!("{}", status.message);
        true
    } else {
        eprintln!("err: {}", status.message);
        false
    }
}

fn exit_code(succeeded: bool) -> ExitCode {
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn backend_field(bak: Option<PathBuf>) -> String {
    bak.map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_settings(&cli)?;
    init_logging(&config);
    debug!("editor settings: {config:?}");

    let bridge = capabilities_from_config(&config);

    match cli.command {
        Command::Save { paths } => {
            let (bak, cfg_path) = split_save_paths(&paths)?;
            let record = read_record(&cfg_path)?;
            let form = FormState::from_record(&record, backend_field(bak));
            let controller = WorkflowController::with_form(bridge, form);
            controller.initialize().await;
            let _ = controller.save().await;
            Ok(exit_code(report(&controller.status())))
        }
        Command::Clear { bak } => {
            let controller = WorkflowController::with_form(
                bridge,
                FormState {
                    backend_path: backend_field(bak),
                    ..FormState::default()
                },
            );
            controller.initialize().await;
            let _ = controller.clear().await;
            Ok(exit_code(report(&controller.status())))
        }
        Command::Check { cfg_json } => {
            let record = read_record(&cfg_json)?;
            println!("{}", record.to_json_pretty()?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve => {
            info!("WDBak configuration editor serving on stdio");
            let controller = Arc::new(WorkflowController::new(bridge));
            serve(controller, tokio::io::stdin(), tokio::io::stdout()).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
