//! In-process replication substrate with fault injection.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;

use narrative_core::new_document_address;

use crate::error::SyncError;
use crate::repo::{DocHandle, Repo};

/// Injected failure mode for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Every `find` fails immediately.
    Unreachable,
    /// Every `find` never completes.
    Hang,
    /// The next `n` finds fail, then the address behaves normally.
    FailTimes(u32),
}

/// A document living in a [`MemoryRepo`].
pub struct MemoryHandle {
    address: String,
    tx: watch::Sender<Option<Value>>,
}

impl MemoryHandle {
    fn new(address: String, initial: Option<Value>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { address, tx }
    }

    /// Replace the whole content, as a remote merge would.
    pub fn replace(&self, value: Value) {
        self.tx.send_replace(Some(value));
    }
}

impl DocHandle for MemoryHandle {
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
        if self.tx.borrow().is_none() {
            return Err(SyncError::NotReady(self.address.clone()));
        }
        self.tx.send_modify(|slot| {
            if let Some(value) = slot {
                change(value);
            }
        });
        Ok(())
    }
}

/// Substrate backed by a concurrent in-memory map.
pub struct MemoryRepo {
    /// address -> handle
    docs: DashMap<String, Arc<MemoryHandle>>,
    faults: DashMap<String, Fault>,
    find_calls: DashMap<String, u32>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self {
            docs: DashMap::new(),
            faults: DashMap::new(),
            find_calls: DashMap::new(),
        }
    }

    /// Insert (or overwrite) a document at a known address.
    pub fn insert(&self, address: &str, value: Value) -> Arc<MemoryHandle> {
        if let Some(existing) = self.docs.get(address) {
            existing.replace(value);
            return existing.clone();
        }
        let handle = Arc::new(MemoryHandle::new(address.to_string(), Some(value)));
        self.docs.insert(address.to_string(), handle.clone());
        handle
    }

    /// Insert a document that is found but has no content yet.
    pub fn insert_syncing(&self, address: &str) -> Arc<MemoryHandle> {
        let handle = Arc::new(MemoryHandle::new(address.to_string(), None));
        self.docs.insert(address.to_string(), handle.clone());
        handle
    }

    pub fn get(&self, address: &str) -> Option<Arc<MemoryHandle>> {
        self.docs.get(address).map(|h| h.clone())
    }

    pub fn set_fault(&self, address: &str, fault: Fault) {
        self.faults.insert(address.to_string(), fault);
    }

    pub fn clear_fault(&self, address: &str) {
        self.faults.remove(address);
    }

    /// Number of `find` calls seen for an address.
    pub fn find_calls(&self, address: &str) -> u32 {
        self.find_calls.get(address).map(|c| *c).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Consume one application of the fault for an address, if any.
    fn take_fault(&self, address: &str) -> Option<Fault> {
        let mut entry = self.faults.get_mut(address)?;
        let fault = *entry;
        if let Fault::FailTimes(n) = fault {
            if n == 0 {
                drop(entry);
                self.faults.remove(address);
                return None;
            }
            *entry = Fault::FailTimes(n - 1);
        }
        Some(fault)
    }
}

impl Default for MemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repo for MemoryRepo {
    async fn find(&self, address: &str) -> Result<Arc<dyn DocHandle>, SyncError> {
        *self.find_calls.entry(address.to_string()).or_insert(0) += 1;

        match self.take_fault(address) {
            Some(Fault::Hang) => std::future::pending::<()>().await,
            Some(Fault::Unreachable) | Some(Fault::FailTimes(_)) => {
                return Err(SyncError::Unavailable {
                    address: address.to_string(),
                    reason: "no peer holds this document".into(),
                })
            }
            None => {}
        }

        let handle = self
            .docs
            .get(address)
            .map(|h| h.clone())
            .ok_or_else(|| SyncError::NotFound(address.to_string()))?;
        Ok(handle)
    }

    fn create(&self, initial: Value) -> Result<Arc<dyn DocHandle>, SyncError> {
        let address = new_document_address();
        let handle = self.insert(&address, initial);
        tracing::debug!(address = %address, "document created");
        Ok(handle)
    }
}
