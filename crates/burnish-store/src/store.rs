use burnish_changebus::StoreChangeBus;
use burnish_protocol::records::{
    ConnectionSettings, HistoryLog, JobRecord, StoreKey, StoreRecord,
};
use std::sync::Arc;

use crate::error::StoreError;

/// Behavioral contract of the store both processes share.
///
/// Reads and writes are whole-record; writes are single-writer-per-key by
/// convention (coordinator: job/history; view: draft; settings surface:
/// connection), not enforced by the store. Every `write`/`remove`
/// publishes a change envelope on the bus handed in at construction.
pub trait SharedStore: Send + Sync {
    fn read(&self, key: StoreKey) -> Result<Option<StoreRecord>, StoreError>;
    fn write(&self, record: StoreRecord) -> Result<(), StoreError>;
    fn remove(&self, key: StoreKey) -> Result<Option<StoreRecord>, StoreError>;
    fn change_bus(&self) -> Arc<StoreChangeBus>;
}

fn unexpected_kind(key: StoreKey, found: StoreKey) -> StoreError {
    StoreError::Codec(format!(
        "record under key '{}' carries tag '{}'",
        key.as_str(),
        found.as_str()
    ))
}

/// Typed accessors over the tagged record union.
pub trait SharedStoreExt: SharedStore {
    fn job(&self) -> Result<Option<JobRecord>, StoreError> {
        match self.read(StoreKey::Job)? {
            None => Ok(None),
            Some(StoreRecord::Job(record)) => Ok(Some(record)),
            Some(other) => Err(unexpected_kind(StoreKey::Job, other.key())),
        }
    }

    fn put_job(&self, record: JobRecord) -> Result<(), StoreError> {
        self.write(StoreRecord::Job(record))
    }

    fn clear_job(&self) -> Result<(), StoreError> {
        self.remove(StoreKey::Job).map(|_| ())
    }

    fn history(&self) -> Result<HistoryLog, StoreError> {
        match self.read(StoreKey::History)? {
            None => Ok(HistoryLog::default()),
            Some(StoreRecord::History(log)) => Ok(log),
            Some(other) => Err(unexpected_kind(StoreKey::History, other.key())),
        }
    }

    fn put_history(&self, log: HistoryLog) -> Result<(), StoreError> {
        self.write(StoreRecord::History(log))
    }

    fn draft(&self) -> Result<Option<String>, StoreError> {
        match self.read(StoreKey::Draft)? {
            None => Ok(None),
            Some(StoreRecord::Draft(text)) => Ok(Some(text)),
            Some(other) => Err(unexpected_kind(StoreKey::Draft, other.key())),
        }
    }

    fn put_draft(&self, text: String) -> Result<(), StoreError> {
        self.write(StoreRecord::Draft(text))
    }

    fn clear_draft(&self) -> Result<(), StoreError> {
        self.remove(StoreKey::Draft).map(|_| ())
    }

    fn connection(&self) -> Result<ConnectionSettings, StoreError> {
        match self.read(StoreKey::Connection)? {
            None => Ok(ConnectionSettings::default()),
            Some(StoreRecord::Connection(settings)) => Ok(settings),
            Some(other) => Err(unexpected_kind(StoreKey::Connection, other.key())),
        }
    }
}

impl<S: SharedStore + ?Sized> SharedStoreExt for S {}
