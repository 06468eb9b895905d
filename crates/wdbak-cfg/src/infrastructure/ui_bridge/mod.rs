//! Form adapter: drives the [`WorkflowController`] from a line-based JSON
//! protocol so any rendering surface (webview, TUI, test harness) can sit on
//! top of it.
//!
//! # Protocol
//!
//! One JSON object per line in each direction.  Requests carry a `"cmd"` tag:
//!
//! ```json
//! {"cmd":"get_state"}
//! {"cmd":"set_form","form":{"url":"https://dav.example.com","list":"/home\n/etc"}}
//! {"cmd":"save"}
//! {"cmd":"clear"}
//! {"cmd":"reset"}
//! ```
//!
//! Every request gets exactly one [`CommandResult`] response with the same
//! shape: `{ success: bool, data: StateDto | null, error: string | null }`.
//! The frontend can always read `success` without special-casing commands.
//!
//! `save` and `clear` are started in the background; their response carries
//! the state at dispatch time.  Progress arrives separately as status events:
//!
//! ```json
//! {"event":"status","status":{"kind":"pending","message":"writing..."}}
//! {"event":"status","status":{"kind":"success","message":"write succeeded"}}
//! ```
//!
//! When the input closes, in-flight operations are awaited and the final
//! status is flushed before [`serve`] returns.

use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use wdbak_core::FormState;

use crate::application::workflow::{WorkflowController, WorkflowError, WorkflowStatus};

// ── Data Transfer Objects ─────────────────────────────────────────────────────

/// A request from the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum UiCommand {
    GetState,
    SetForm { form: FormState },
    Save,
    Clear,
    Reset,
}

/// Unsolicited message pushed to the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    Status { status: WorkflowStatus },
}

/// Everything the form needs to render itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDto {
    pub form: FormState,
    pub status: WorkflowStatus,
}

impl StateDto {
    fn capture(controller: &WorkflowController) -> Self {
        Self {
            form: controller.form(),
            status: controller.status(),
        }
    }
}

/// Unified response wrapper.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// One form connected to one controller.
pub struct UiSession {
    controller: Arc<WorkflowController>,
    in_flight: Vec<JoinHandle<Result<String, WorkflowError>>>,
}

impl UiSession {
    pub fn new(controller: Arc<WorkflowController>) -> Self {
        Self {
            controller,
            in_flight: Vec::new(),
        }
    }

    /// Dispatches one request.
    pub async fn handle(&mut self, command: UiCommand) -> CommandResult<StateDto> {
        debug!("ui command: {command:?}");
        match command {
            UiCommand::GetState => {}
            UiCommand::SetForm { form } => self.controller.set_form(form),
            UiCommand::Save => {
                let handle = self.controller.spawn_save();
                self.track(handle);
            }
            UiCommand::Clear => {
                let handle = self.controller.spawn_clear();
                self.track(handle);
            }
            UiCommand::Reset => self.controller.reset().await,
        }
        CommandResult::ok(StateDto::capture(&self.controller))
    }

    /// Waits for every operation started by this session.
    pub async fn drain(&mut self) {
        for handle in self.in_flight.drain(..) {
            if let Err(e) = handle.await {
                warn!("workflow task ended abnormally: {e}");
            }
        }
    }

    fn track(&mut self, handle: JoinHandle<Result<String, WorkflowError>>) {
        self.in_flight.retain(|h| !h.is_finished());
        self.in_flight.push(handle);
    }
}

// ── Line protocol loop ────────────────────────────────────────────────────────

/// Serves the line protocol until `input` reaches end of file.
///
/// Runs the backend path prefill once before reading the first request.
///
/// # Errors
///
/// Returns an error if reading `input` or writing `output` fails.
pub async fn serve<R, W>(
    controller: Arc<WorkflowController>,
    input: R,
    output: W,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(write_lines(output, out_rx));

    let (stop_tx, stop_rx) = oneshot::channel();
    let forwarder = tokio::spawn(forward_status(controller.subscribe(), tx.clone(), stop_rx));

    controller.initialize().await;
    let mut session = UiSession::new(Arc::clone(&controller));
    info!("form adapter ready");

    let mut lines = BufReader::new(input).lines();
    while let Some(line) = lines.next_line().await.context("failed to read command")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<UiCommand>(&line) {
            Ok(command) => session.handle(command).await,
            Err(e) => {
                warn!("rejecting malformed command: {e}");
                CommandResult::err(format!("invalid command: {e}"))
            }
        };
        let encoded = serde_json::to_string(&response).context("failed to encode response")?;
        if tx.send(encoded).is_err() {
            break;
        }
    }

    session.drain().await;
    let _ = stop_tx.send(());
    if let Err(e) = forwarder.await {
        warn!("status forwarder ended abnormally: {e}");
    }
    drop(tx);
    writer
        .await
        .context("output writer panicked")?
        .context("failed to write output")?;

    info!("form adapter stopped");
    Ok(())
}

async fn write_lines<W>(mut output: W, mut rx: mpsc::UnboundedReceiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    output.shutdown().await
}

/// Pushes every status change as a [`UiEvent`] until told to stop, then
/// flushes a final change that has not been sent yet.
async fn forward_status(
    mut status_rx: tokio::sync::watch::Receiver<WorkflowStatus>,
    tx: mpsc::UnboundedSender<String>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let emit = |status: WorkflowStatus| {
        match serde_json::to_string(&UiEvent::Status { status }) {
            Ok(line) => tx.send(line).is_ok(),
            Err(e) => {
                warn!("failed to encode status event: {e}");
                true
            }
        }
    };

    loop {
        tokio::select! {
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = status_rx.borrow_and_update().clone();
                if !emit(status) {
                    break;
                }
            }
            _ = &mut stop_rx => {
                if status_rx.has_changed().unwrap_or(false) {
                    let status = status_rx.borrow_and_update().clone();
                    emit(status);
                }
                break;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
