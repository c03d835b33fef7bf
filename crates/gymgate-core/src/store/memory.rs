#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::sync::{Arc, Mutex};

use super::{GateSettings, SessionRecord, SettingsStore, StoreError};

/// In-memory store for testing and simulation.
///
/// State is wrapped in Arc<Mutex<>> so clones share it. Uses
/// `lock().expect()`, which panics if the mutex is poisoned - acceptable for
/// test code.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    settings: Option<GateSettings>,
    session: Option<SessionRecord>,
    session_writes: usize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with `settings` already saved.
    pub fn with_settings(settings: GateSettings) -> Self {
        let inner = MemoryStoreInner { settings: Some(settings), ..MemoryStoreInner::default() };
        Self { inner: Arc::new(Mutex::new(inner)) }
    }

    /// Number of successful session record writes.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn session_writes(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").session_writes
    }
}

impl SettingsStore for MemoryStore {
    #[allow(clippy::expect_used)]
    fn load_settings(&self) -> Result<Option<GateSettings>, StoreError> {
        Ok(self.inner.lock().expect("Mutex poisoned").settings.clone())
    }

    #[allow(clippy::expect_used)]
    fn save_settings(&self, settings: &GateSettings) -> Result<(), StoreError> {
        self.inner.lock().expect("Mutex poisoned").settings = Some(settings.clone());
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn load_session(&self) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.inner.lock().expect("Mutex poisoned").session)
    }

    #[allow(clippy::expect_used)]
    fn save_session(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        inner.session = Some(*record);
        inner.session_writes += 1;
        Ok(())
    }
}
