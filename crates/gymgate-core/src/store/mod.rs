//! Settings persistence for the session gate.
//!
//! Trait-based abstraction for persisting the PIN digest, timer settings and
//! the last session record. The trait is synchronous (no async) to match the
//! gate's synchronous API.
//!
//! Persistence is best-effort for this subsystem: the runtime logs session
//! record failures and carries on, and a cold start always begins locked
//! whatever the stored record says.

mod chaotic;
mod memory;

use std::time::Duration;

pub use chaotic::ChaoticStore;
pub use memory::MemoryStore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    gate::{DEFAULT_COUNTDOWN_TICKS, DEFAULT_HAPTIC_AT, DEFAULT_IDLE_TIMEOUT, DEFAULT_TICK_INTERVAL},
    GateConfig, PinDigest,
};

/// Errors that can occur during store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Requested record does not exist.
    #[error("record not found: {0}")]
    NotFound(&'static str),

    /// Serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, etc.)
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Persisted gate settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSettings {
    /// Stored PIN. `None` until the PIN is set up.
    pub pin: Option<PinDigest>,
    /// Inactivity period in seconds.
    pub idle_timeout_secs: u64,
    /// Countdown length in ticks.
    pub countdown_ticks: u32,
    /// Remaining-tick count for the haptic pulse.
    pub haptic_at: u32,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            pin: None,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT.as_secs(),
            countdown_ticks: DEFAULT_COUNTDOWN_TICKS,
            haptic_at: DEFAULT_HAPTIC_AT,
        }
    }
}

impl GateSettings {
    /// Gate configuration described by these settings.
    pub fn to_config(&self) -> GateConfig {
        GateConfig {
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            countdown_ticks: self.countdown_ticks,
            tick_interval: DEFAULT_TICK_INTERVAL,
            haptic_at: self.haptic_at,
        }
    }

    /// CBOR encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        encode_cbor(self)
    }

    /// Decode from CBOR.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        decode_cbor(bytes)
    }
}

/// Last recorded authentication change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Authentication state after the change.
    pub authenticated: bool,
    /// Unix timestamp (seconds) of the change.
    pub changed_at_secs: u64,
}

impl SessionRecord {
    /// CBOR encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        encode_cbor(self)
    }

    /// Decode from CBOR.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        decode_cbor(bytes)
    }
}

fn encode_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(bytes)
}

fn decode_cbor<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, StoreError> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Storage abstraction for gate settings and session records.
///
/// Must be Clone (shared by the runtime and setup code), Send + Sync
/// (thread-safe), and synchronous (no async methods). Implementations
/// typically share internal state via Arc, so clones access the same
/// underlying storage.
pub trait SettingsStore: Clone + Send + Sync + 'static {
    /// Load settings. `None` on first run.
    fn load_settings(&self) -> Result<Option<GateSettings>, StoreError>;

    /// Store settings, overwriting any previous value.
    fn save_settings(&self, settings: &GateSettings) -> Result<(), StoreError>;

    /// Load the last session record. `None` if never written.
    fn load_session(&self) -> Result<Option<SessionRecord>, StoreError>;

    /// Store the session record, overwriting any previous value.
    fn save_session(&self, record: &SessionRecord) -> Result<(), StoreError>;
}
