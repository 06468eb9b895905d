//! Raw form input and its conversion into a [`ConfigRecord`].
//!
//! [`FormState`] holds exactly what the user typed: free text for the
//! endpoint, credentials, root, thread count and path list, plus the two
//! enumerated selections.  Nothing is checked when fields are written;
//! [`FormState::parse`] does the trimming, defaulting and splitting in one
//! deterministic step.
//!
//! # Parsing rules
//!
//! | Field  | Rule                                                         |
//! |--------|--------------------------------------------------------------|
//! | text   | surrounding whitespace removed                               |
//! | `thr`  | leading integer; unparseable or below 1 becomes `4`, too large saturates |
//! | `list` | split on `\n` / `\r\n`, each line trimmed, blank lines dropped |

use serde::{Deserialize, Serialize};

use crate::domain::record::{ConfigRecord, ConflictMode, StorageType};

/// Thread count used whenever the form value is missing or unusable.
pub const DEFAULT_THREADS: u32 = 4;

/// Every value shown in the configuration form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormState {
    pub url: String,
    pub user: String,
    pub pass: String,
    pub root: String,
    pub mode: ConflictMode,
    /// Thread count as typed.
    pub thr: String,
    pub typ: StorageType,
    /// Newline-delimited paths as typed.
    pub list: String,
    pub debug: bool,
    /// Path of the backup executable the host should target.
    pub backend_path: String,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            pass: String::new(),
            root: String::new(),
            mode: ConflictMode::ALL[0],
            thr: DEFAULT_THREADS.to_string(),
            typ: StorageType::ALL[0],
            list: String::new(),
            debug: false,
            backend_path: String::new(),
        }
    }
}

impl FormState {
    /// Builds a form pre-filled from an existing record.
    ///
    /// Parsing the returned form yields `record` again, provided `record`
    /// already satisfies the record invariants.
    pub fn from_record(record: &ConfigRecord, backend_path: impl Into<String>) -> Self {
        Self {
            url: record.url.clone(),
            user: record.user.clone(),
            pass: record.pass.clone(),
            root: record.root.clone(),
            mode: record.mode,
            thr: record.thr.to_string(),
            typ: record.typ,
            list: record.list.join("\n"),
            debug: record.debug,
            backend_path: backend_path.into(),
        }
    }

    /// Converts the raw values into a [`ConfigRecord`].
    ///
    /// Never fails; missing required values show up as empty fields that
    /// [`validate`](crate::validate) reports.
    pub fn parse(&self) -> ConfigRecord {
        ConfigRecord {
            url: self.url.trim().to_string(),
            user: self.user.trim().to_string(),
            pass: self.pass.trim().to_string(),
            root: self.root.trim().to_string(),
            mode: self.mode,
            thr: parse_threads(&self.thr),
            typ: self.typ,
            list: split_paths(&self.list),
            debug: self.debug,
        }
    }

    /// Trimmed backend executable path.
    pub fn backend_handle(&self) -> String {
        self.backend_path.trim().to_string()
    }

    /// Restores every configuration field to its default.
    ///
    /// The backend path is not a configuration field and is left alone.
    pub fn reset(&mut self) {
        *self = Self {
            backend_path: std::mem::take(&mut self.backend_path),
            ..Self::default()
        };
    }
}

/// Reads the leading integer of `raw`, falling back to [`DEFAULT_THREADS`].
///
/// Mirrors how a form's number box is usually read: `"8"` and `"8 threads"`
/// both give 8, while `""`, `"abc"`, `"0"` and `"-2"` give the default.
/// Values too large for a `u32` saturate at `u32::MAX`.
fn parse_threads(raw: &str) -> u32 {
    let raw = raw.trim();
    let (negative, rest) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..digits_end];

    if negative || digits.is_empty() {
        return DEFAULT_THREADS;
    }
    // `digits` is non-empty ASCII digits, so the only parse error is overflow.
    match digits.parse::<u32>() {
        Ok(0) => DEFAULT_THREADS,
        Ok(n) => n,
        Err(_) => u32::MAX,
    }
}

/// Splits a multi-line path list, trimming lines and dropping blank ones.
fn split_paths(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
