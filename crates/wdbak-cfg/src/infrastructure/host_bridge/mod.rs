//! Host program bridge: the concrete capabilities behind the workflow.
//!
//! Persisting and clearing configuration is delegated to an external host
//! program configured in `[host]` of the settings file.  Each request is one
//! short-lived process:
//!
//! ```text
//! <program> [args..] save  <backend_path>   < record JSON on stdin
//! <program> [args..] clear <backend_path>
//! ```
//!
//! Exit status 0 means success and the trimmed stdout becomes the detail text
//! shown after "write succeeded: ".  Any other exit status is a rejection
//! whose message is the trimmed stderr.
//!
//! Default path discovery does not involve the host at all: the backup
//! executable template is expected next to the running editor binary.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use wdbak_core::ConfigRecord;

use crate::application::backend::{
    BridgeCapabilities, BridgeError, ConfigClearer, ConfigSaver, DefaultPathDiscovery,
};
use crate::infrastructure::storage::config::EditorConfig;

/// Error type for host program invocations.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to start host program {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to talk to host program: {0}")]
    Pipe(#[source] std::io::Error),

    /// The host ran and reported failure.
    #[error("{0}")]
    Exited(String),

    #[error("could not locate the running executable: {0}")]
    NoExecutableDir(#[source] std::io::Error),

    #[error("could not encode record: {0}")]
    Encode(#[from] wdbak_core::RecordError),
}

impl From<HostError> for BridgeError {
    fn from(e: HostError) -> Self {
        BridgeError::new(e.to_string())
    }
}

// ── Default path discovery ────────────────────────────────────────────────────

/// Finds the backup executable template next to the running editor binary.
#[derive(Debug, Clone)]
pub struct ExecutableDirLocator {
    default_name: String,
}

impl ExecutableDirLocator {
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            default_name: default_name.into(),
        }
    }

    /// `<dir of current exe>/<default_name>`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NoExecutableDir`] if the running executable's
    /// path cannot be determined.
    pub fn default_path(&self) -> Result<PathBuf, HostError> {
        let exe = std::env::current_exe().map_err(HostError::NoExecutableDir)?;
        let dir = exe.parent().map(PathBuf::from).unwrap_or_default();
        Ok(dir.join(&self.default_name))
    }
}

#[async_trait]
impl DefaultPathDiscovery for ExecutableDirLocator {
    async fn discover_default_path(&self) -> Result<String, BridgeError> {
        Ok(self.default_path()?.to_string_lossy().into_owned())
    }
}

// ── Host program ──────────────────────────────────────────────────────────────

/// Save and clear capabilities backed by an external host program.
#[derive(Debug, Clone)]
pub struct HostProgram {
    program: PathBuf,
    args: Vec<String>,
    locator: ExecutableDirLocator,
}

impl HostProgram {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, locator: ExecutableDirLocator) -> Self {
        Self {
            program: program.into(),
            args,
            locator,
        }
    }

    /// An empty backend path means "use the default template".
    fn resolve_target(&self, backend_path: &str) -> Result<String, HostError> {
        if backend_path.trim().is_empty() {
            let path = self.locator.default_path()?;
            debug!("no backend path given; using default {}", path.display());
            Ok(path.to_string_lossy().into_owned())
        } else {
            Ok(backend_path.to_string())
        }
    }

    async fn run(
        &self,
        subcommand: &str,
        target: &str,
        stdin_payload: Option<String>,
    ) -> Result<String, HostError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(subcommand)
            .arg(target)
            .stdin(if stdin_payload.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        info!("running host {} {subcommand} {target}", self.program.display());
        let mut child = cmd.spawn().map_err(|source| HostError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // The payload is fed while stdout/stderr are drained, so a chatty host
        // cannot stall on a full pipe before reading its input.
        let stdin = child.stdin.take();
        let feed = async move {
            let (Some(payload), Some(mut stdin)) = (stdin_payload, stdin) else {
                return Ok(());
            };
            match stdin.write_all(payload.as_bytes()).await {
                // The host may finish without reading its input.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!("host closed stdin before reading the full payload");
                    Ok(())
                }
                other => other,
            }
            // Dropping the handle closes the pipe so the host sees EOF.
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(HostError::Pipe)?;
        fed.map_err(HostError::Pipe)?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("host exited with {}", output.status)
        } else {
            stderr
        };
        Err(HostError::Exited(message))
    }
}

#[async_trait]
impl ConfigSaver for HostProgram {
    async fn save(&self, record: ConfigRecord, backend_path: String) -> Result<String, BridgeError> {
        let target = self.resolve_target(&backend_path)?;
        let payload = record.to_json_pretty().map_err(HostError::from)?;
        Ok(self.run("save", &target, Some(payload)).await?)
    }
}

#[async_trait]
impl ConfigClearer for HostProgram {
    async fn clear(&self, backend_path: String) -> Result<String, BridgeError> {
        let target = self.resolve_target(&backend_path)?;
        Ok(self.run("clear", &target, None).await?)
    }
}

/// Builds the bridge described by the editor settings.
///
/// Discovery is always available; save and clear only when a host program
/// is configured.
pub fn capabilities_from_config(config: &EditorConfig) -> BridgeCapabilities {
    let locator = ExecutableDirLocator::new(config.backend.default_name.clone());
    let bridge = BridgeCapabilities::none().with_discover(Arc::new(locator.clone()));

    match &config.host.program {
        Some(program) => {
            let host = Arc::new(HostProgram::new(
                program.clone(),
                config.host.args.clone(),
                locator,
            ));
            bridge.with_save(host.clone()).with_clear(host)
        }
        None => {
            info!("no host program configured; save and clear are unavailable");
            bridge
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
