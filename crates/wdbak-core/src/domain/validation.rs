//! Structural validation of a [`ConfigRecord`].
//!
//! Only presence is checked here: the endpoint must be set and at least one
//! path must be listed.  Whether the endpoint is reachable or the paths exist
//! is the backup executable's business.

use thiserror::Error;

use crate::domain::record::ConfigRecord;

/// A required field is missing.
///
/// Variants are listed in the order [`validate`] checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("cfg url empty")]
    MissingEndpoint,
    #[error("cfg list empty")]
    EmptyPathList,
}

/// Checks `record` and reports the first violation found.
///
/// The endpoint is checked before the path list, so a record missing both
/// yields [`ValidationError::MissingEndpoint`].
///
/// # Errors
///
/// - [`ValidationError::MissingEndpoint`] when `url` is empty after trimming.
/// - [`ValidationError::EmptyPathList`] when `list` has no non-blank entry.
pub fn validate(record: &ConfigRecord) -> Result<(), ValidationError> {
    if record.url.trim().is_empty() {
        return Err(ValidationError::MissingEndpoint);
    }
    if record.list.iter().all(|p| p.trim().is_empty()) {
        return Err(ValidationError::EmptyPathList);
    }
    Ok(())
}
