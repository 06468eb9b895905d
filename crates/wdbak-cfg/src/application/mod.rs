//! Application layer use cases for the configuration editor.
//!
//! Use cases in this layer orchestrate the domain model from `wdbak-core`
//! and depend only on the bridge traits declared here, never on a concrete
//! host.  No file system access, no process spawning.
//!
//! # Sub-modules
//!
//! - **`backend`**  – The three optional host capabilities (default path
//!   discovery, save, clear) and the [`BridgeCapabilities`] bundle that
//!   carries them.
//!
//! - **`workflow`** – The [`WorkflowController`]: owns the form and the
//!   status line and runs the save / clear / reset flows.

pub mod backend;
pub mod workflow;

pub use backend::{
    BridgeCapabilities, BridgeError, ConfigClearer, ConfigSaver, DefaultPathDiscovery,
};
pub use workflow::{StatusKind, WorkflowController, WorkflowError, WorkflowStatus};
