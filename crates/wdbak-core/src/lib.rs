//! # wdbak-core
//!
//! Shared library for the WDBak configuration editor containing the backup
//! configuration record, the rules that turn raw form input into that record,
//! and the structural validation applied before anything is handed to a host.
//!
//! It has zero dependencies on OS APIs, async runtimes, or UI frameworks.
//!
//! # Architecture overview (for beginners)
//!
//! WDBak is a backup client that copies a list of local paths to a remote
//! endpoint (WebDAV, FTP or SMB).  Its settings are edited in a small form
//! and then persisted by a host program.  This crate is the pure part of that
//! editor:
//!
//! - **`domain::record`** – The validated [`ConfigRecord`] value object and
//!   its enumerated fields ([`ConflictMode`], [`StorageType`]), including the
//!   JSON shape the host receives.
//!
//! - **`domain::form`** – [`FormState`], the raw string values a user typed,
//!   and [`FormState::parse`] which trims, defaults and splits them.
//!
//! - **`domain::validation`** – [`validate`], which reports the first missing
//!   required field.

pub mod domain;

// Re-export the most-used types at the crate root so callers can write
// `wdbak_core::ConfigRecord` instead of `wdbak_core::domain::record::ConfigRecord`.
pub use domain::form::{FormState, DEFAULT_THREADS};
pub use domain::record::{ConfigRecord, ConflictMode, RecordError, StorageType};
pub use domain::validation::{validate, ValidationError};
