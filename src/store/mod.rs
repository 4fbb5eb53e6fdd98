//! Durable client-side key/value store.
//!
//! One string key maps to one JSON string. The queue synchronizer reads the
//! latest triage capture once at startup; the triage recorder overwrites it
//! after every capture. Read and write failures never reach callers of the
//! `*_latest_record` helpers: they are logged and degrade to "absent" or
//! "dropped write".

pub mod file_store;
pub mod memory_store;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;

use thiserror::Error;

use crate::config::LATEST_TRIAGE_KEY;
use crate::models::TriageRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid store key: {0:?}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store write failed: {0}")]
    Write(String),

    #[error("Internal lock error")]
    LockPoisoned,
}

/// String key → string value storage.
pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite any previous value for `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Read the latest triage capture. Missing, unreadable and unparsable
/// content all come back as `None`.
pub fn read_latest_record(store: &dyn LocalStore) -> Option<TriageRecord> {
    let raw = match store.get(LATEST_TRIAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(error = %e, "Local store read failed, ignoring stored triage");
            return None;
        }
    };

    match serde_json::from_str::<TriageRecord>(&raw) {
        Ok(record) => {
            tracing::debug!(session_id = ?record.session_id, "Found triage record in local store");
            Some(record)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Stored triage record is corrupt, ignoring");
            None
        }
    }
}

/// Persist the latest triage capture. Returns whether the write landed.
pub fn write_latest_record(store: &dyn LocalStore, record: &TriageRecord) -> bool {
    let json = match serde_json::to_string(record) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize triage record");
            return false;
        }
    };

    match store.set(LATEST_TRIAGE_KEY, &json) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Local store write failed, triage record not persisted");
            false
        }
    }
}
