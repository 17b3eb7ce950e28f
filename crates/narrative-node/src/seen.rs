//! Seen-attestation sets persisted in the `seen` column family.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use narrative_trust::{SeenStore, TrustError};

use crate::storage::Storage;

pub struct StoredSeenStore {
    storage: Arc<Storage>,
    /// Serializes read-modify-write of a context's set.
    write_lock: Mutex<()>,
}

impl StoredSeenStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }
}

impl SeenStore for StoredSeenStore {
    fn seen(&self, context: &str) -> Result<HashSet<String>, TrustError> {
        let ids = self
            .storage
            .get_seen(context)
            .map_err(|e| TrustError::Storage(e.to_string()))?;
        Ok(ids.into_iter().collect())
    }

    fn mark_seen(&self, context: &str, ids: &[String]) -> Result<(), TrustError> {
        if ids.is_empty() {
            return Ok(());
        }
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| TrustError::Storage("seen-set lock poisoned".into()))?;

        let mut set: BTreeSet<String> = self
            .storage
            .get_seen(context)
            .map_err(|e| TrustError::Storage(e.to_string()))?
            .into_iter()
            .collect();
        set.extend(ids.iter().cloned());
        let ids: Vec<String> = set.into_iter().collect();
        self.storage
            .put_seen(context, &ids)
            .map_err(|e| TrustError::Storage(e.to_string()))?;
        tracing::debug!(context = %context, total = ids.len(), "seen set updated");
        Ok(())
    }
}
