//! Redb-backed settings store.
//!
//! One table, two keys: the gate settings (PIN digest and timer settings) and
//! the last session record. Both values are CBOR. Every write is its own
//! transaction, so a crash leaves either the old or the new value.

use std::{path::Path, sync::Arc};

use gymgate_core::{GateSettings, SessionRecord, SettingsStore, StoreError};
use redb::{Database, ReadableTable, TableDefinition};

/// Table: gate
/// Key: record name
/// Value: CBOR-encoded `GateSettings` or `SessionRecord`
const GATE: TableDefinition<&str, &[u8]> = TableDefinition::new("gate");

const SETTINGS_KEY: &str = "settings";
const SESSION_KEY: &str = "session";

/// Durable store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create a Redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        let txn = db.begin_write().map_err(io)?;
        {
            let _ = txn.open_table(GATE).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(GATE).map_err(io)?;
        let value = table.get(key).map_err(io)?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = txn.open_table(GATE).map_err(io)?;
            table.insert(key, bytes).map_err(io)?;
        }
        txn.commit().map_err(io)
    }
}

impl SettingsStore for RedbStore {
    fn load_settings(&self) -> Result<Option<GateSettings>, StoreError> {
        self.get(SETTINGS_KEY)?.map(|bytes| GateSettings::from_bytes(&bytes)).transpose()
    }

    fn save_settings(&self, settings: &GateSettings) -> Result<(), StoreError> {
        self.put(SETTINGS_KEY, &settings.to_bytes()?)
    }

    fn load_session(&self) -> Result<Option<SessionRecord>, StoreError> {
        self.get(SESSION_KEY)?.map(|bytes| SessionRecord::from_bytes(&bytes)).transpose()
    }

    fn save_session(&self, record: &SessionRecord) -> Result<(), StoreError> {
        self.put(SESSION_KEY, &record.to_bytes()?)
    }
}

fn io(err: impl std::fmt::Display) -> StoreError {
    StoreError::Io(err.to_string())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn empty_database_has_no_records() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("gate.redb")).unwrap();

        assert_eq!(store.load_settings().unwrap(), None);
        assert_eq!(store.load_session().unwrap(), None);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gate.redb");

        let settings = GateSettings { idle_timeout_secs: 120, ..GateSettings::default() };
        let record = SessionRecord { authenticated: true, changed_at_secs: 1_704_067_200 };
        {
            let store = RedbStore::open(&path).unwrap();
            store.save_settings(&settings).unwrap();
            store.save_session(&record).unwrap();
        }

        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.load_settings().unwrap(), Some(settings));
        assert_eq!(store.load_session().unwrap(), Some(record));
    }

    #[test]
    fn session_writes_overwrite() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("gate.redb")).unwrap();

        store.save_session(&SessionRecord { authenticated: true, changed_at_secs: 10 }).unwrap();
        store.save_session(&SessionRecord { authenticated: false, changed_at_secs: 20 }).unwrap();

        let record = store.load_session().unwrap().unwrap();
        assert!(!record.authenticated);
        assert_eq!(record.changed_at_secs, 20);
    }

    #[test]
    fn clones_share_the_database() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("gate.redb")).unwrap();
        let other = store.clone();

        store.save_settings(&GateSettings::default()).unwrap();

        assert!(other.load_settings().unwrap().is_some());
    }

    #[test]
    fn corrupt_value_is_a_serialization_error() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("gate.redb")).unwrap();

        store.put(SETTINGS_KEY, &[0xff, 0x00]).unwrap();

        assert!(matches!(store.load_settings(), Err(StoreError::Serialization(_))));
    }
}
