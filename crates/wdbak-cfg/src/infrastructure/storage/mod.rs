//! Storage infrastructure: editor settings persistence.
//!
//! The `config` sub-module reads the TOML settings file from the
//! platform-appropriate directory and supplies defaults on first run.
//! The backup configuration itself is never stored here; persisting it is
//! the host program's job.

pub mod config;
