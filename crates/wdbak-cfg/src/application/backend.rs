//! Host bridge capabilities consumed by the workflow.
//!
//! The host that actually persists configuration is not part of this crate.
//! The workflow only sees three asynchronous capabilities, each of which may
//! be missing at runtime:
//!
//! | Capability               | Returns on success                     |
//! |--------------------------|----------------------------------------|
//! | [`DefaultPathDiscovery`] | a guess for the backend executable path |
//! | [`ConfigSaver`]          | optional detail text (empty = none)    |
//! | [`ConfigClearer`]        | optional detail text (empty = none)    |
//!
//! A missing capability is a normal state, modelled as `None` in
//! [`BridgeCapabilities`]; the workflow reports it instead of failing hard.
//! Every capability may be invoked repeatedly and concurrently.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use wdbak_core::ConfigRecord;

/// A rejection from the host, carrying its human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BridgeError {
    message: String,
}

impl BridgeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Suggests where the backup executable lives.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DefaultPathDiscovery: Send + Sync {
    /// Returns a filesystem path guess for the backup executable.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError`] if the host cannot produce a guess.
    async fn discover_default_path(&self) -> Result<String, BridgeError>;
}

/// Persists a configuration record for a backup executable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigSaver: Send + Sync {
    /// Persists `record` for the executable at `backend_path`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError`] with the host's message if persisting fails.
    async fn save(&self, record: ConfigRecord, backend_path: String) -> Result<String, BridgeError>;
}

/// Erases the persisted configuration of a backup executable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigClearer: Send + Sync {
    /// Removes the configuration stored for the executable at `backend_path`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError`] with the host's message if clearing fails.
    async fn clear(&self, backend_path: String) -> Result<String, BridgeError>;
}

/// The set of capabilities the host currently offers.
#[derive(Clone, Default)]
pub struct BridgeCapabilities {
    pub discover: Option<Arc<dyn DefaultPathDiscovery>>,
    pub save: Option<Arc<dyn ConfigSaver>>,
    pub clear: Option<Arc<dyn ConfigClearer>>,
}

impl BridgeCapabilities {
    /// A bridge offering nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Uses one backend for all three capabilities.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: DefaultPathDiscovery + ConfigSaver + ConfigClearer + 'static,
    {
        Self {
            discover: Some(backend.clone()),
            save: Some(backend.clone()),
            clear: Some(backend),
        }
    }

    pub fn with_discover(mut self, discover: Arc<dyn DefaultPathDiscovery>) -> Self {
        self.discover = Some(discover);
        self
    }

    pub fn with_save(mut self, save: Arc<dyn ConfigSaver>) -> Self {
        self.save = Some(save);
        self
    }

    pub fn with_clear(mut self, clear: Arc<dyn ConfigClearer>) -> Self {
        self.clear = Some(clear);
        self
    }
}

impl std::fmt::Debug for BridgeCapabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeCapabilities")
            .field("discover", &self.discover.is_some())
            .field("save", &self.save.is_some())
            .field("clear", &self.clear.is_some())
            .finish()
    }
}
