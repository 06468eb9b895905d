//! Infrastructure layer for the configuration editor.
//!
//! Contains the OS-facing adapters: the editor settings file, the host
//! program bridge, and the JSON-lines form adapter.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `wdbak_core`, but MUST NOT be imported by the `application` layer.

pub mod host_bridge;
pub mod storage;
pub mod ui_bridge;
