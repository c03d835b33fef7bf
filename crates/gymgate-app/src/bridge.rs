//! Session-to-storage translation layer.
//!
//! The [`SessionBridge`] wraps a [`SettingsStore`] and adapts it to the
//! application lifecycle.
//!
//! # Responsibilities
//!
//! - Converts [`crate::AppAction::PersistSession`] into session records.
//! - Treats every write as best-effort: failures are logged and counted, never
//!   propagated.
//! - Reads back the last record for status display. It never decides the
//!   starting state; a cold start is always locked.

use gymgate_core::{SessionRecord, SettingsStore};

/// Bridge between App session changes and the settings store.
pub struct SessionBridge<S: SettingsStore> {
    store: S,
    failures: usize,
}

impl<S: SettingsStore> SessionBridge<S> {
    /// Create a bridge over `store`.
    pub fn new(store: S) -> Self {
        Self { store, failures: 0 }
    }

    /// Record an authentication change.
    ///
    /// Returns `false` if the write failed. The failure is logged; callers
    /// carry on either way.
    pub fn record_session(&mut self, authenticated: bool, changed_at_secs: u64) -> bool {
        let record = SessionRecord { authenticated, changed_at_secs };
        match self.store.save_session(&record) {
            Ok(()) => {
                tracing::debug!(authenticated, "session record saved");
                true
            },
            Err(e) => {
                self.failures += 1;
                tracing::warn!(error = %e, authenticated, "failed to persist session record");
                false
            },
        }
    }

    /// Last persisted session record. `None` if never written or unreadable.
    pub fn last_session(&self) -> Option<SessionRecord> {
        match self.store.load_session() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load session record");
                None
            },
        }
    }

    /// Number of failed writes.
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}
