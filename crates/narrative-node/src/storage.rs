//! RocksDB storage backend for the narrative node.

use anyhow::Result;
use rocksdb::{ColumnFamilyDescriptor, IteratorMode, Options, DB};
use std::path::Path;

/// Column family names for different data types.
pub const CF_DOCUMENTS: &str = "documents";
pub const CF_SEEN: &str = "seen";
pub const CF_IDENTITY: &str = "identity";
pub const CF_STATE: &str = "state";

/// RocksDB-backed storage for the narrative node.
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open or create a RocksDB database at the given path with column families.
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_DOCUMENTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_SEEN, Options::default()),
            ColumnFamilyDescriptor::new(CF_IDENTITY, Options::default()),
            ColumnFamilyDescriptor::new(CF_STATE, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cf_descriptors)?;
        tracing::debug!(path = %path.display(), "storage opened");

        Ok(Self { db })
    }

    /// Put a value into a column family.
    pub fn put(&self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self
            .db
            .cf_handle(cf_name)
            .ok_or_else(|| anyhow::anyhow!("column family '{}' not found", cf_name))?;
        self.db.put_cf(&cf, key, value)?;
        Ok(())
    }

    /// Get a value from a column family.
    pub fn get(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self
            .db
            .cf_handle(cf_name)
            .ok_or_else(|| anyhow::anyhow!("column family '{}' not found", cf_name))?;
        let value = self.db.get_cf(&cf, key)?;
        Ok(value)
    }

    /// Delete a key from a column family.
    pub fn delete(&self, cf_name: &str, key: &[u8]) -> Result<()> {
        let cf = self
            .db
            .cf_handle(cf_name)
            .ok_or_else(|| anyhow::anyhow!("column family '{}' not found", cf_name))?;
        self.db.delete_cf(&cf, key)?;
        Ok(())
    }

    /// All keys of a column family, in key order.
    pub fn keys(&self, cf_name: &str) -> Result<Vec<String>> {
        let cf = self
            .db
            .cf_handle(cf_name)
            .ok_or_else(|| anyhow::anyhow!("column family '{}' not found", cf_name))?;
        let mut keys = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, _) = item?;
            keys.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(keys)
    }

    /// Store a replicated document as JSON.
    pub fn put_document(&self, address: &str, value: &serde_json::Value) -> Result<()> {
        self.put(CF_DOCUMENTS, address.as_bytes(), &serde_json::to_vec(value)?)
    }

    /// Get a replicated document.
    pub fn get_document(&self, address: &str) -> Result<Option<serde_json::Value>> {
        match self.get(CF_DOCUMENTS, address.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn document_addresses(&self) -> Result<Vec<String>> {
        self.keys(CF_DOCUMENTS)
    }

    /// Store the seen-id set of one context.
    pub fn put_seen(&self, context: &str, ids: &[String]) -> Result<()> {
        self.put(CF_SEEN, context.as_bytes(), &serde_json::to_vec(ids)?)
    }

    /// Get the seen-id set of one context.
    pub fn get_seen(&self, context: &str) -> Result<Vec<String>> {
        match self.get(CF_SEEN, context.as_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    /// Store identity material.
    pub fn put_identity(&self, key: &str, data: &[u8]) -> Result<()> {
        self.put(CF_IDENTITY, key.as_bytes(), data)
    }

    /// Get identity material.
    pub fn get_identity(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.get(CF_IDENTITY, key.as_bytes())
    }

    /// Store node state.
    pub fn put_state(&self, key: &str, data: &[u8]) -> Result<()> {
        self.put(CF_STATE, key.as_bytes(), data)
    }

    /// Get node state.
    pub fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.get(CF_STATE, key.as_bytes())
    }
}
