//! WorkflowController: save, clear and reset over the host bridge.
//!
//! The controller owns the form values and the single status line shown to
//! the user.  Each user action runs as an independent async operation:
//!
//! ```text
//!            trigger                 bridge resolves
//!   Idle ───────────────► Pending ───────────────────► Success
//!     ▲                      │      bridge rejects
//!     │ reset                └───────────────────────► Failed
//!     └──────────────────────────────────────────────── (any)
//! ```
//!
//! Local failures (missing capability, missing endpoint, empty path list)
//! jump straight to `Failed` without contacting the bridge.
//!
//! # Concurrency
//!
//! Operations are not queued.  Two saves started back to back both run, and
//! whichever finishes last decides the final status.  Status changes are
//! published on a [`tokio::sync::watch`] channel so a UI adapter can follow
//! them without polling.
//!
//! The form lives behind a `std::sync::Mutex` that is never held across an
//! `.await`, so each operation reads a consistent snapshot of the form before
//! suspending on the bridge.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use wdbak_core::{validate, FormState, ValidationError};

use crate::application::backend::BridgeCapabilities;

/// Fixed status texts.
pub mod messages {
    pub const BRIDGE_NOT_READY: &str = "backend not ready";
    pub const ENDPOINT_REQUIRED: &str = "endpoint URL is required";
    pub const PATH_REQUIRED: &str = "at least one backup path is required";
    pub const WRITING: &str = "writing...";
    pub const WRITE_SUCCEEDED: &str = "write succeeded";
    pub const WRITE_FAILED: &str = "write failed";
    pub const PROCESSING: &str = "processing...";
    pub const CLEAR_SUCCEEDED: &str = "clear succeeded";
    pub const CLEAR_FAILED: &str = "clear failed";
}

// ── Status ────────────────────────────────────────────────────────────────────

/// Visual state of the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    /// Nothing to report; the line is empty.
    #[default]
    Idle,
    /// An operation is in flight; the message is informational.
    Pending,
    Success,
    Failed,
}

/// The single user-facing status line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkflowStatus {
    pub kind: StatusKind,
    pub message: String,
}

impl WorkflowStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn pending(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Pending,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Failed,
            message: message.into(),
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Why a save or clear did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// The bridge does not offer the capability this operation needs.
    #[error("bridge capability unavailable")]
    BridgeUnavailable,

    /// The form failed local validation; the bridge was not contacted.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The bridge rejected the request.
    #[error("backend rejected request: {0}")]
    BackendRejected(String),
}

/// The two operations that talk to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Save,
    Clear,
}

impl Operation {
    fn pending_text(self) -> &'static str {
        match self {
            Operation::Save => messages::WRITING,
            Operation::Clear => messages::PROCESSING,
        }
    }

    fn success_text(self, detail: &str) -> String {
        let base = match self {
            Operation::Save => messages::WRITE_SUCCEEDED,
            Operation::Clear => messages::CLEAR_SUCCEEDED,
        };
        if detail.is_empty() {
            base.to_string()
        } else {
            format!("{base}: {detail}")
        }
    }

    fn failure_text(self, err: &WorkflowError) -> String {
        match err {
            WorkflowError::BridgeUnavailable => messages::BRIDGE_NOT_READY.to_string(),
            WorkflowError::Validation(ValidationError::MissingEndpoint) => {
                messages::ENDPOINT_REQUIRED.to_string()
            }
            WorkflowError::Validation(ValidationError::EmptyPathList) => {
                messages::PATH_REQUIRED.to_string()
            }
            WorkflowError::BackendRejected(reason) => {
                let prefix = match self {
                    Operation::Save => messages::WRITE_FAILED,
                    Operation::Clear => messages::CLEAR_FAILED,
                };
                format!("{prefix}: {reason}")
            }
        }
    }
}

// ── Controller ────────────────────────────────────────────────────────────────

/// Orchestrates save, clear and reset against an injected bridge.
pub struct WorkflowController {
    bridge: BridgeCapabilities,
    form: Mutex<FormState>,
    status: watch::Sender<WorkflowStatus>,
}

impl WorkflowController {
    /// Creates a controller with a default form and an idle status.
    pub fn new(bridge: BridgeCapabilities) -> Self {
        Self::with_form(bridge, FormState::default())
    }

    pub fn with_form(bridge: BridgeCapabilities, form: FormState) -> Self {
        let (status, _) = watch::channel(WorkflowStatus::idle());
        Self {
            bridge,
            form: Mutex::new(form),
            status,
        }
    }

    /// Snapshot of the current form values.
    pub fn form(&self) -> FormState {
        self.lock_form().clone()
    }

    /// Replaces every form value.
    pub fn set_form(&self, form: FormState) {
        *self.lock_form() = form;
    }

    /// Edits the form in place.
    pub fn update_form(&self, edit: impl FnOnce(&mut FormState)) {
        edit(&mut self.lock_form());
    }

    /// The status line as it is right now.
    pub fn status(&self) -> WorkflowStatus {
        self.status.borrow().clone()
    }

    /// Follows every status change from this point on.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowStatus> {
        self.status.subscribe()
    }

    /// Pre-fills the backend path from the bridge's discovery capability.
    ///
    /// The path is only written if the field is still empty when discovery
    /// resolves.  Discovery failures are logged and otherwise ignored; they
    /// never touch the status line.
    pub async fn initialize(&self) {
        let Some(discover) = self.bridge.discover.clone() else {
            debug!("bridge offers no default path discovery; skipping prefill");
            return;
        };

        match discover.discover_default_path().await {
            Ok(path) => {
                let mut form = self.lock_form();
                if form.backend_path.trim().is_empty() {
                    debug!("prefilling backend path with {path}");
                    form.backend_path = path;
                }
            }
            Err(e) => warn!("default backend path discovery failed: {e}"),
        }
    }

    /// Validates the form and asks the bridge to persist it.
    ///
    /// Returns the bridge's detail text on success.  The outcome is also
    /// published as the current status.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::BridgeUnavailable`] if the bridge cannot save.
    /// - [`WorkflowError::Validation`] if the endpoint or path list is missing.
    /// - [`WorkflowError::BackendRejected`] if the bridge rejects the record.
    pub async fn save(&self) -> Result<String, WorkflowError> {
        let result = self.run_save().await;
        self.finish(Operation::Save, &result);
        result
    }

    /// Asks the bridge to erase the persisted configuration.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::BridgeUnavailable`] if the bridge cannot clear.
    /// - [`WorkflowError::BackendRejected`] if the bridge rejects the request.
    pub async fn clear(&self) -> Result<String, WorkflowError> {
        let result = self.run_clear().await;
        self.finish(Operation::Clear, &result);
        result
    }

    /// Restores the form defaults, clears the status line and re-runs the
    /// backend path prefill.
    pub async fn reset(&self) {
        self.lock_form().reset();
        self.publish(WorkflowStatus::idle());
        info!("form reset to defaults");
        self.initialize().await;
    }

    /// Runs [`save`](Self::save) on a Tokio task without blocking the caller.
    pub fn spawn_save(self: &Arc<Self>) -> JoinHandle<Result<String, WorkflowError>> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.save().await })
    }

    /// Runs [`clear`](Self::clear) on a Tokio task without blocking the caller.
    pub fn spawn_clear(self: &Arc<Self>) -> JoinHandle<Result<String, WorkflowError>> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.clear().await })
    }

    /// Runs [`reset`](Self::reset) on a Tokio task without blocking the caller.
    pub fn spawn_reset(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.reset().await })
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    async fn run_save(&self) -> Result<String, WorkflowError> {
        let saver = self
            .bridge
            .save
            .clone()
            .ok_or(WorkflowError::BridgeUnavailable)?;

        let (record, backend_path) = {
            let form = self.lock_form();
            (form.parse(), form.backend_handle())
        };
        validate(&record)?;

        self.publish(WorkflowStatus::pending(Operation::Save.pending_text()));
        info!(
            "saving configuration for {} ({} paths) to '{backend_path}'",
            record.url,
            record.list.len()
        );

        saver
            .save(record, backend_path)
            .await
            .map_err(|e| WorkflowError::BackendRejected(e.message().to_string()))
    }

    async fn run_clear(&self) -> Result<String, WorkflowError> {
        let clearer = self
            .bridge
            .clear
            .clone()
            .ok_or(WorkflowError::BridgeUnavailable)?;

        let backend_path = self.lock_form().backend_handle();

        self.publish(WorkflowStatus::pending(Operation::Clear.pending_text()));
        info!("clearing configuration of '{backend_path}'");

        clearer
            .clear(backend_path)
            .await
            .map_err(|e| WorkflowError::BackendRejected(e.message().to_string()))
    }

    fn finish(&self, op: Operation, result: &Result<String, WorkflowError>) {
        let status = match result {
            Ok(detail) => WorkflowStatus::success(op.success_text(detail)),
            Err(e) => {
                if matches!(e, WorkflowError::BackendRejected(_)) {
                    error!("{op:?} rejected by backend: {e}");
                } else {
                    warn!("{op:?} not sent to backend: {e}");
                }
                WorkflowStatus::failed(op.failure_text(e))
            }
        };
        self.publish(status);
    }

    /// Last write wins: no generation check against older operations.
    fn publish(&self, status: WorkflowStatus) {
        self.status.send_replace(status);
    }

    fn lock_form(&self) -> MutexGuard<'_, FormState> {
        // The form holds plain values; a panic mid-edit leaves nothing to repair.
        self.form.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::backend::{
        BridgeError, ConfigClearer, ConfigSaver, MockConfigClearer, MockConfigSaver,
        MockDefaultPathDiscovery,
    };
    use tokio::sync::oneshot;
    use wdbak_core::{ConfigRecord, ConflictMode, StorageType};

    fn valid_form() -> FormState {
        FormState {
            url: "http://x".to_string(),
            list: "/a\n/b".to_string(),
            backend_path: " /opt/WDBak.bak ".to_string(),
            ..FormState::default()
        }
    }

    fn saver_returning(result: Result<String, BridgeError>) -> Arc<MockConfigSaver> {
        let mut saver = MockConfigSaver::new();
        saver
            .expect_save()
            .times(1)
            .returning(move |_, _| result.clone());
        Arc::new(saver)
    }

    fn clearer_returning(result: Result<String, BridgeError>) -> Arc<MockConfigClearer> {
        let mut clearer = MockConfigClearer::new();
        clearer
            .expect_clear()
            .times(1)
            .returning(move |_| result.clone());
        Arc::new(clearer)
    }

    /// Saver and clearer that hold their answer until the test releases it.
    struct Gate {
        answer: tokio::sync::Mutex<Option<oneshot::Receiver<Result<String, BridgeError>>>>,
    }

    impl Gate {
        fn new() -> (Arc<Self>, oneshot::Sender<Result<String, BridgeError>>) {
            let (tx, rx) = oneshot::channel();
            let gate = Arc::new(Self {
                answer: tokio::sync::Mutex::new(Some(rx)),
            });
            (gate, tx)
        }

        async fn wait(&self) -> Result<String, BridgeError> {
            let rx = self.answer.lock().await.take();
            match rx {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(BridgeError::new("gate dropped"))),
                None => Ok(String::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ConfigSaver for Gate {
        async fn save(&self, _record: ConfigRecord, _path: String) -> Result<String, BridgeError> {
            self.wait().await
        }
    }

    #[async_trait::async_trait]
    impl ConfigClearer for Gate {
        async fn clear(&self, _path: String) -> Result<String, BridgeError> {
            self.wait().await
        }
    }

    // ── save ──────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_save_without_capability_reports_backend_not_ready() {
        // Arrange
        let controller = WorkflowController::with_form(BridgeCapabilities::none(), valid_form());

        // Act
        let result = controller.save().await;

        // Assert
        assert_eq!(result, Err(WorkflowError::BridgeUnavailable));
        assert_eq!(controller.status(), WorkflowStatus::failed("backend not ready"));
    }

    #[tokio::test]
    async fn test_save_without_endpoint_never_calls_backend() {
        // Arrange
        let mut saver = MockConfigSaver::new();
        saver.expect_save().times(0);
        let bridge = BridgeCapabilities::none().with_save(Arc::new(saver));
        let controller = WorkflowController::with_form(
            bridge,
            FormState {
                url: "  ".to_string(),
                ..valid_form()
            },
        );

        // Act
        let result = controller.save().await;

        // Assert
        assert_eq!(
            result,
            Err(WorkflowError::Validation(ValidationError::MissingEndpoint))
        );
        assert_eq!(
            controller.status(),
            WorkflowStatus::failed(messages::ENDPOINT_REQUIRED)
        );
    }

    #[tokio::test]
    async fn test_save_without_paths_never_calls_backend() {
        let mut saver = MockConfigSaver::new();
        saver.expect_save().times(0);
        let bridge = BridgeCapabilities::none().with_save(Arc::new(saver));
        let controller = WorkflowController::with_form(
            bridge,
            FormState {
                list: "\n \n".to_string(),
                ..valid_form()
            },
        );

        let result = controller.save().await;

        assert_eq!(
            result,
            Err(WorkflowError::Validation(ValidationError::EmptyPathList))
        );
        assert_eq!(controller.status(), WorkflowStatus::failed(messages::PATH_REQUIRED));
    }

    #[tokio::test]
    async fn test_save_sends_parsed_record_and_trimmed_backend_path() {
        // Arrange
        let mut saver = MockConfigSaver::new();
        saver
            .expect_save()
            .withf(|record, backend_path| {
                record.url == "http://x"
                    && record.list == vec!["/a".to_string(), "/b".to_string()]
                    && record.thr == 4
                    && record.mode == ConflictMode::Skip
                    && record.typ == StorageType::Dav
                    && backend_path == "/opt/WDBak.bak"
            })
            .times(1)
            .returning(|_, _| Ok(String::new()));
        let bridge = BridgeCapabilities::none().with_save(Arc::new(saver));
        let controller = WorkflowController::with_form(bridge, valid_form());

        // Act
        let result = controller.save().await;

        // Assert
        assert_eq!(result, Ok(String::new()));
        assert_eq!(controller.status(), WorkflowStatus::success("write succeeded"));
    }

    #[tokio::test]
    async fn test_save_success_appends_backend_detail() {
        let bridge =
            BridgeCapabilities::none().with_save(saver_returning(Ok("3 files".to_string())));
        let controller = WorkflowController::with_form(bridge, valid_form());

        controller.save().await.unwrap();

        assert_eq!(
            controller.status(),
            WorkflowStatus::success("write succeeded: 3 files")
        );
    }

    #[tokio::test]
    async fn test_save_rejection_prefixes_backend_message() {
        let bridge = BridgeCapabilities::none()
            .with_save(saver_returning(Err(BridgeError::new("permission denied"))));
        let controller = WorkflowController::with_form(bridge, valid_form());

        let result = controller.save().await;

        assert_eq!(
            result,
            Err(WorkflowError::BackendRejected("permission denied".to_string()))
        );
        assert_eq!(
            controller.status(),
            WorkflowStatus::failed("write failed: permission denied")
        );
    }

    #[tokio::test]
    async fn test_save_publishes_writing_before_backend_answers() {
        // Arrange
        let (gate, release) = Gate::new();
        let controller = Arc::new(WorkflowController::with_form(
            BridgeCapabilities::none().with_save(gate),
            valid_form(),
        ));
        let mut rx = controller.subscribe();

        // Act
        let task = controller.spawn_save();
        rx.changed().await.unwrap();
        let pending = rx.borrow_and_update().clone();
        release.send(Ok(String::new())).unwrap();
        task.await.unwrap().unwrap();

        // Assert
        assert_eq!(pending, WorkflowStatus::pending(messages::WRITING));
        assert_eq!(controller.status(), WorkflowStatus::success("write succeeded"));
    }

    // ── clear ─────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_clear_without_capability_reports_backend_not_ready() {
        let controller = WorkflowController::new(BridgeCapabilities::none());

        let result = controller.clear().await;

        assert_eq!(result, Err(WorkflowError::BridgeUnavailable));
        assert_eq!(controller.status(), WorkflowStatus::failed("backend not ready"));
    }

    #[tokio::test]
    async fn test_clear_ignores_form_validation() {
        // Arrange: an empty form would fail save validation; clear must not care.
        let bridge = BridgeCapabilities::none().with_clear(clearer_returning(Ok(String::new())));
        let controller = WorkflowController::new(bridge);

        // Act
        let result = controller.clear().await;

        // Assert
        assert!(result.is_ok());
        assert_eq!(controller.status(), WorkflowStatus::success("clear succeeded"));
    }

    #[tokio::test]
    async fn test_clear_success_appends_backend_detail() {
        let bridge = BridgeCapabilities::none()
            .with_clear(clearer_returning(Ok("/opt/WDBak".to_string())));
        let controller = WorkflowController::with_form(bridge, valid_form());

        controller.clear().await.unwrap();

        assert_eq!(
            controller.status(),
            WorkflowStatus::success("clear succeeded: /opt/WDBak")
        );
    }

    #[tokio::test]
    async fn test_clear_publishes_processing_before_backend_answers() {
        // Arrange
        let (gate, release) = Gate::new();
        let controller = Arc::new(WorkflowController::with_form(
            BridgeCapabilities::none().with_clear(gate),
            valid_form(),
        ));
        let mut rx = controller.subscribe();

        // Act
        let task = controller.spawn_clear();
        rx.changed().await.unwrap();
        let pending = rx.borrow_and_update().clone();
        release.send(Err(BridgeError::new("disk full"))).unwrap();
        let result = task.await.unwrap();

        // Assert
        assert_eq!(pending, WorkflowStatus::pending(messages::PROCESSING));
        assert_eq!(pending.kind, StatusKind::Pending);
        assert_eq!(result, Err(WorkflowError::BackendRejected("disk full".to_string())));
        assert_eq!(
            controller.status(),
            WorkflowStatus::failed("clear failed: disk full")
        );
    }

    #[tokio::test]
    async fn test_clear_rejection_reports_disk_full() {
        let bridge = BridgeCapabilities::none()
            .with_clear(clearer_returning(Err(BridgeError::new("disk full"))));
        let controller = WorkflowController::with_form(bridge, valid_form());

        let _ = controller.clear().await;

        assert_eq!(
            controller.status(),
            WorkflowStatus::failed("clear failed: disk full")
        );
    }

    // ── initialize / reset ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_initialize_fills_empty_backend_path() {
        let mut discover = MockDefaultPathDiscovery::new();
        discover
            .expect_discover_default_path()
            .times(1)
            .returning(|| Ok("/opt/WDBak.bak".to_string()));
        let controller =
            WorkflowController::new(BridgeCapabilities::none().with_discover(Arc::new(discover)));

        controller.initialize().await;

        assert_eq!(controller.form().backend_path, "/opt/WDBak.bak");
    }

    #[tokio::test]
    async fn test_initialize_keeps_user_backend_path() {
        let mut discover = MockDefaultPathDiscovery::new();
        discover
            .expect_discover_default_path()
            .returning(|| Ok("/opt/WDBak.bak".to_string()));
        let controller =
            WorkflowController::new(BridgeCapabilities::none().with_discover(Arc::new(discover)));
        controller.update_form(|f| f.backend_path = "/home/me/custom.bak".to_string());

        controller.initialize().await;

        assert_eq!(controller.form().backend_path, "/home/me/custom.bak");
    }

    #[tokio::test]
    async fn test_initialize_failure_never_touches_status() {
        // Arrange
        let mut discover = MockDefaultPathDiscovery::new();
        discover
            .expect_discover_default_path()
            .returning(|| Err(BridgeError::new("no executable dir")));
        let controller =
            WorkflowController::new(BridgeCapabilities::none().with_discover(Arc::new(discover)));

        // Act
        controller.initialize().await;

        // Assert
        assert_eq!(controller.status(), WorkflowStatus::idle());
        assert_eq!(controller.form().backend_path, "");
    }

    #[tokio::test]
    async fn test_reset_restores_defaults_and_clears_status() {
        // Arrange
        let bridge = BridgeCapabilities::none()
            .with_clear(clearer_returning(Err(BridgeError::new("disk full"))));
        let controller = WorkflowController::with_form(
            bridge,
            FormState {
                mode: ConflictMode::Overwrite,
                typ: StorageType::Smb,
                thr: "9".to_string(),
                user: "u".to_string(),
                pass: "p".to_string(),
                root: "/r".to_string(),
                ..valid_form()
            },
        );
        let _ = controller.clear().await;
        assert_eq!(controller.status().kind, StatusKind::Failed);

        // Act
        controller.reset().await;

        // Assert
        let form = controller.form();
        assert_eq!(form.url, "");
        assert_eq!(form.user, "");
        assert_eq!(form.pass, "");
        assert_eq!(form.root, "");
        assert_eq!(form.list, "");
        assert_eq!(form.thr, "4");
        assert_eq!(form.mode, ConflictMode::ALL[0]);
        assert_eq!(form.typ, StorageType::ALL[0]);
        assert_eq!(controller.status(), WorkflowStatus::idle());
    }

    #[tokio::test]
    async fn test_reset_reruns_discovery() {
        let mut discover = MockDefaultPathDiscovery::new();
        discover
            .expect_discover_default_path()
            .times(1)
            .returning(|| Ok("/opt/WDBak.bak".to_string()));
        let controller =
            WorkflowController::new(BridgeCapabilities::none().with_discover(Arc::new(discover)));

        controller.reset().await;

        assert_eq!(controller.form().backend_path, "/opt/WDBak.bak");
    }

    #[tokio::test]
    async fn test_spawned_save_runs_to_completion() {
        let bridge =
            BridgeCapabilities::none().with_save(saver_returning(Ok("done".to_string())));
        let controller = Arc::new(WorkflowController::with_form(bridge, valid_form()));

        let result = controller.spawn_save().await.expect("task must not panic");

        assert_eq!(result, Ok("done".to_string()));
        assert_eq!(controller.status(), WorkflowStatus::success("write succeeded: done"));
    }
}
