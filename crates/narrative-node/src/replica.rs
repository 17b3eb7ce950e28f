//! Local replica: a [`Repo`] whose documents live in RocksDB.
//!
//! There is no network transport. Documents other identities own reach this
//! replica through `import`, and leave it through `export`; a merge on
//! import keeps the newest copy of every record.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use narrative_core::{new_document_address, PersonalDocument, TrustAttestation};
use narrative_sync::{DocHandle, Repo, SyncError};

use crate::storage::Storage;

/// A document as carried between replicas by `export` and `import`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentBundle {
    pub address: String,
    pub document: Value,
}

/// A document handle whose every mutation is written through to storage.
pub struct StoredHandle {
    address: String,
    storage: Arc<Storage>,
    tx: watch::Sender<Option<Value>>,
    /// Serializes read-change-persist so concurrent writers see each other.
    write_lock: Mutex<()>,
}

impl StoredHandle {
    fn new(address: String, storage: Arc<Storage>, value: Option<Value>) -> Self {
        let (tx, _rx) = watch::channel(value);
        Self {
            address,
            storage,
            tx,
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the value with `change(current)` under the write lock.
    fn write_with<F>(&self, change: F) -> Result<Value, SyncError>
    where
        F: FnOnce(Option<Value>) -> Result<Value, SyncError>,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SyncError::Storage(format!("write lock poisoned: {}", self.address)))?;
        let value = change(self.current_value())?;
        self.persist_and_publish(value.clone())?;
        Ok(value)
    }

    fn persist_and_publish(&self, value: Value) -> Result<(), SyncError> {
        self.storage
            .put_document(&self.address, &value)
            .map_err(|e| SyncError::Storage(e.to_string()))?;
        self.tx.send_replace(Some(value));
        Ok(())
    }
}

impl DocHandle for StoredHandle {
    fn address(&self) -> &str {
        &self.address
    }

    fn current_value(&self) -> Option<Value> {
        self.tx.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<Value>> {
        self.tx.subscribe()
    }

    fn mutate(&self, change: &mut dyn FnMut(&mut Value)) -> Result<(), SyncError> {
        self.write_with(|current| {
            let Some(mut value) = current else {
                return Err(SyncError::NotReady(self.address.clone()));
            };
            change(&mut value);
            Ok(value)
        })
        .map(|_| ())
    }
}

/// Substrate over the node's RocksDB `documents` column family.
pub struct StoredRepo {
    storage: Arc<Storage>,
    /// address -> open handle, shared by every caller of `find`
    handles: DashMap<String, Arc<StoredHandle>>,
}

impl StoredRepo {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            handles: DashMap::new(),
        }
    }

    fn open(&self, address: &str) -> Result<Option<Arc<StoredHandle>>, SyncError> {
        if let Some(handle) = self.handles.get(address) {
            return Ok(Some(handle.clone()));
        }
        let stored = self
            .storage
            .get_document(address)
            .map_err(|e| SyncError::Storage(e.to_string()))?;
        let Some(value) = stored else {
            return Ok(None);
        };
        let handle = self
            .handles
            .entry(address.to_string())
            .or_insert_with(|| {
                Arc::new(StoredHandle::new(
                    address.to_string(),
                    self.storage.clone(),
                    Some(value),
                ))
            })
            .clone();
        Ok(Some(handle))
    }

    /// Current content of a stored document.
    pub fn export(&self, address: &str) -> Result<Option<Value>, SyncError> {
        Ok(self.open(address)?.and_then(|h| h.current_value()))
    }

    /// Bring a copy of a document into this replica, merging with any copy
    /// already held. Returns the merged content.
    ///
    /// `owned` marks the local identity's own document: its local profile
    /// and `trust_given` stay authoritative and only `trust_received`
    /// entries are taken from the incoming copy.
    pub fn import(&self, address: &str, incoming: Value, owned: bool) -> Result<Value, SyncError> {
        let merged = match self.open(address)? {
            Some(handle) => handle.write_with(|current| {
                Ok(match current {
                    Some(local) => merge_documents(local, incoming, owned),
                    None => incoming,
                })
            })?,
            None => {
                self.storage
                    .put_document(address, &incoming)
                    .map_err(|e| SyncError::Storage(e.to_string()))?;
                incoming
            }
        };
        tracing::info!(address = %address, "document imported");
        Ok(merged)
    }
}

#[async_trait]
impl Repo for StoredRepo {
    async fn find(&self, address: &str) -> Result<Arc<dyn DocHandle>, SyncError> {
        match self.open(address)? {
            Some(handle) => Ok(handle),
            None => Err(SyncError::Unavailable {
                address: address.to_string(),
                reason: "not held by the local replica".into(),
            }),
        }
    }

    fn create(&self, initial: Value) -> Result<Arc<dyn DocHandle>, SyncError> {
        let address = new_document_address();
        let handle = Arc::new(StoredHandle::new(
            address.clone(),
            self.storage.clone(),
            None,
        ));
        handle.persist_and_publish(initial)?;
        self.handles.insert(address.clone(), handle.clone());
        tracing::debug!(address = %address, "document created");
        Ok(handle)
    }
}

/// Merge two copies of a personal document.
///
/// Attestations are last-write-wins per key on `updated_at`; the profile
/// with the newer `updated_at` wins. With `owned`, only `trust_received`
/// is merged. Values that are not personal documents are replaced by the
/// incoming copy.
pub fn merge_documents(local: Value, incoming: Value, owned: bool) -> Value {
    if !PersonalDocument::is_ready_value(&local) || !PersonalDocument::is_ready_value(&incoming) {
        return incoming;
    }
    let (Ok(mut ours), Ok(theirs)) = (
        PersonalDocument::from_value(local),
        PersonalDocument::from_value(incoming.clone()),
    ) else {
        return incoming;
    };

    if ours.did != theirs.did {
        tracing::warn!(local = %ours.did, incoming = %theirs.did, "import replaces a foreign document");
        return incoming;
    }

    ours.version = ours.version.max(theirs.version);
    if !owned {
        if theirs.profile.updated_at > ours.profile.updated_at {
            ours.profile = theirs.profile;
        }
        merge_newest(&mut ours.trust_given, theirs.trust_given);
    }
    merge_newest(&mut ours.trust_received, theirs.trust_received);

    ours.to_value().unwrap_or(incoming)
}

fn merge_newest(
    ours: &mut BTreeMap<String, TrustAttestation>,
    theirs: BTreeMap<String, TrustAttestation>,
) {
    for (key, att) in theirs {
        match ours.get(&key) {
            Some(existing) if existing.updated_at >= att.updated_at => {}
            _ => {
                ours.insert(key, att);
            }
        }
    }
}
