//! Status sinks implementing [`StatusWriter`].
//!
//! The binary writes one JSON object per line to standard output for a
//! sidecar that applies the records as status patches. Tests use the
//! in-memory store.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::domain::ports::{StatusWriteError, StatusWriter};
use crate::domain::{ResourceKey, TenantStatus};

/// One status patch as emitted on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Namespace of the descriptor.
    pub namespace: String,
    /// Name of the descriptor.
    pub name: String,
    /// Full replacement status.
    pub status: TenantStatus,
}

impl StatusRecord {
    fn new(key: &ResourceKey, status: &TenantStatus) -> Self {
        Self {
            namespace: key.namespace.clone(),
            name: key.name.clone(),
            status: status.clone(),
        }
    }
}

/// Writes each status as a JSON line to `W`.
#[derive(Debug)]
pub struct JsonLinesStatusWriter<W> {
    sink: Mutex<W>,
}

impl<W: Write + Send> JsonLinesStatusWriter<W> {
    /// Wrap `sink`; lines are flushed as they are written.
    pub fn new(sink: W) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }

    /// Recover the underlying sink.
    pub fn into_inner(self) -> W {
        self.sink.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> StatusWriter for JsonLinesStatusWriter<W> {
    fn write_status(
        &self,
        key: &ResourceKey,
        status: &TenantStatus,
    ) -> Result<(), StatusWriteError> {
        let mut line = serde_json::to_vec(&StatusRecord::new(key, status))
            .map_err(|err| StatusWriteError::serialization(err.to_string()))?;
        line.push(b'\n');

        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.write_all(&line)
            .and_then(|()| sink.flush())
            .map_err(|err| StatusWriteError::write(err.to_string()))
    }
}

/// Keeps every written status in memory.
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    history: Mutex<Vec<StatusRecord>>,
}

impl InMemoryStatusStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest status written for `key`.
    pub fn latest(&self, key: &ResourceKey) -> Option<TenantStatus> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history
            .iter()
            .rev()
            .find(|record| record.namespace == key.namespace && record.name == key.name)
            .map(|record| record.status.clone())
    }

    /// Latest status per descriptor.
    pub fn snapshot(&self) -> BTreeMap<ResourceKey, TenantStatus> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history
            .iter()
            .map(|record| {
                (
                    ResourceKey::new(record.namespace.as_str(), record.name.as_str()),
                    record.status.clone(),
                )
            })
            .collect()
    }

    /// Number of writes recorded so far.
    pub fn write_count(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl StatusWriter for InMemoryStatusStore {
    fn write_status(
        &self,
        key: &ResourceKey,
        status: &TenantStatus,
    ) -> Result<(), StatusWriteError> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StatusRecord::new(key, status));
        Ok(())
    }
}
