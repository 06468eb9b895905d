//! The validated backup configuration and its enumerated fields.
//!
//! A [`ConfigRecord`] is what the host program persists and what the backup
//! executable eventually reads.  It is a plain value object: two records with
//! the same field values are interchangeable.
//!
//! # JSON shape
//!
//! The host receives the record as a JSON object with short keys:
//!
//! ```json
//! {
//!   "url": "https://dav.example.com/backup",
//!   "user": "alice",
//!   "pass": "secret",
//!   "root": "/srv/backup",
//!   "mode": "skip",
//!   "thr": 4,
//!   "typ": "dav",
//!   "list": ["/home/alice/docs", "/etc"],
//!   "debug": false
//! }
//! ```
//!
//! Records produced by [`FormState::parse`](crate::FormState::parse) already
//! satisfy the field constraints.  Records arriving as JSON from elsewhere go
//! through [`ConfigRecord::from_json`], which fills the same defaults and
//! rejects what cannot be repaired.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::form::DEFAULT_THREADS;
use crate::domain::validation::{validate, ValidationError};

/// Error type for building a record from an external JSON document.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The document is not valid JSON or has fields of the wrong type.
    #[error("bad cfg json: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but a required field is missing.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The `mode` field names no known conflict mode.
    #[error("unknown conflict mode '{0}'")]
    UnknownMode(String),

    /// The `typ` field names no known storage backend.
    #[error("unknown storage type '{0}'")]
    UnknownStorageType(String),
}

// ── Conflict mode ─────────────────────────────────────────────────────────────

/// What the backup does when a path already exists at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConflictMode {
    /// Leave the remote copy untouched.
    #[default]
    #[serde(rename = "skip")]
    Skip,
    /// Replace the remote copy.
    #[serde(rename = "over", alias = "overwrite")]
    Overwrite,
}

impl ConflictMode {
    /// Every mode in the order the form offers them.  The first entry is the
    /// form default.
    pub const ALL: [ConflictMode; 2] = [ConflictMode::Skip, ConflictMode::Overwrite];

    /// Wire name used in the JSON record.
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictMode::Skip => "skip",
            ConflictMode::Overwrite => "over",
        }
    }
}

impl fmt::Display for ConflictMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictMode {
    type Err = RecordError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(ConflictMode::Skip),
            "over" | "overwrite" => Ok(ConflictMode::Overwrite),
            other => Err(RecordError::UnknownMode(other.to_string())),
        }
    }
}

// ── Storage type ──────────────────────────────────────────────────────────────

/// Transport family used to reach the remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// WebDAV over HTTP(S).
    #[default]
    Dav,
    Ftp,
    /// SMB / CIFS share.
    Smb,
}

impl StorageType {
    /// Every storage type in the order the form offers them.  The first entry
    /// is the form default.
    pub const ALL: [StorageType; 3] = [StorageType::Dav, StorageType::Ftp, StorageType::Smb];

    pub fn as_str(self) -> &'static str {
        match self {
            StorageType::Dav => "dav",
            StorageType::Ftp => "ftp",
            StorageType::Smb => "smb",
        }
    }

    /// Guesses the storage type from the endpoint URL.
    ///
    /// `ftp://` selects FTP, `smb://` or a UNC path (`\\host\share`) selects
    /// SMB, anything else is treated as WebDAV.
    pub fn infer_from_url(url: &str) -> Self {
        let url = url.trim().to_ascii_lowercase();
        if url.starts_with("ftp://") {
            StorageType::Ftp
        } else if url.starts_with("smb://") || url.starts_with(r"\\") {
            StorageType::Smb
        } else {
            StorageType::Dav
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dav" => Ok(StorageType::Dav),
            "ftp" => Ok(StorageType::Ftp),
            "smb" => Ok(StorageType::Smb),
            other => Err(RecordError::UnknownStorageType(other.to_string())),
        }
    }
}

// ── Record ────────────────────────────────────────────────────────────────────

/// A complete backup configuration.
///
/// Invariants for records built by this crate:
/// - `url` is trimmed and, once validated, non-empty.
/// - `thr` is at least 1.
/// - `list` holds trimmed, non-empty paths in the order the user gave them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// Remote endpoint, e.g. `https://dav.example.com/backup`.
    pub url: String,
    pub user: String,
    pub pass: String,
    /// Local root the listed paths are resolved against.
    pub root: String,
    pub mode: ConflictMode,
    /// Number of concurrent upload workers.
    pub thr: u32,
    pub typ: StorageType,
    /// Paths to back up.
    pub list: Vec<String>,
    /// Enables verbose logging in the backup executable.
    #[serde(default)]
    pub debug: bool,
}

/// Loosely typed mirror of [`ConfigRecord`] used when reading external JSON.
///
/// Every field is optional so that defaults can be applied after the fact,
/// exactly where the form would apply them.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LooseRecord {
    url: String,
    user: String,
    pass: String,
    root: String,
    mode: String,
    thr: i64,
    typ: String,
    list: Vec<String>,
    debug: bool,
}

impl ConfigRecord {
    /// Builds a record from a JSON document, filling defaults and validating.
    ///
    /// - empty `mode` becomes `skip`
    /// - `thr` below 1 (or absent) becomes 4; values beyond `u32` saturate
    /// - empty `typ` is inferred from the URL scheme
    /// - blank `list` entries are dropped
    ///
    /// # Errors
    ///
    /// - [`RecordError::Json`] if the text is not a JSON object of the right shape.
    /// - [`RecordError::Invalid`] if `url` or `list` is empty.
    /// - [`RecordError::UnknownMode`] / [`RecordError::UnknownStorageType`] for
    ///   unrecognised enumerated values.
    pub fn from_json(text: &str) -> Result<Self, RecordError> {
        let loose: LooseRecord = serde_json::from_str(text)?;

        let url = loose.url.trim().to_string();
        let mode = if loose.mode.trim().is_empty() {
            ConflictMode::default()
        } else {
            loose.mode.parse()?
        };
        let typ = if loose.typ.trim().is_empty() {
            let inferred = StorageType::infer_from_url(&url);
            debug!("storage type not set; inferred '{inferred}' from url");
            inferred
        } else {
            loose.typ.parse()?
        };
        let thr = if loose.thr < 1 {
            DEFAULT_THREADS
        } else {
            u32::try_from(loose.thr).unwrap_or(u32::MAX)
        };

        let record = ConfigRecord {
            url,
            user: loose.user.trim().to_string(),
            pass: loose.pass.trim().to_string(),
            root: loose.root.trim().to_string(),
            mode,
            thr,
            typ,
            list: loose
                .list
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
            debug: loose.debug,
        };

        validate(&record)?;
        Ok(record)
    }

    /// Serializes the record the way the host expects it: pretty-printed JSON
    /// with two-space indentation.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Json`] if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
