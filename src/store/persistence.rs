//! Sled-backed store

use crate::error::StorageError;
use crate::store::batch::{key_in_prefix, Lookup, PendingOp, PendingWrites};
use crate::store::{join_key, read_dump, strip_key_prefix, write_dump, Database, Dump};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Sled-based implementation of [`Database`]
pub struct SledDatabase {
    db: sled::Db,
    pending: Mutex<PendingWrites>,
    flush_on_batch: bool,
}

impl SledDatabase {
    /// Open (or create) a sled database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            StorageError::Backend(format!(
                "Failed to open sled database at {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        Ok(Self {
            db,
            pending: Mutex::new(PendingWrites::default()),
            flush_on_batch: false,
        })
    }

    /// Flush to disk after every applied batch instead of relying on sled's
    /// background flusher.
    pub fn with_flush_on_batch(mut self, flush: bool) -> Self {
        self.flush_on_batch = flush;
        self
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    fn read_backend(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.db.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn read(&self, pending: &PendingWrites, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match pending.lookup(key) {
            Lookup::Present(value) => Ok(Some(value)),
            Lookup::Deleted => Ok(None),
            Lookup::Unknown => self.read_backend(key),
        }
    }

    fn backend_keys(&self, prefix: &str) -> Result<BTreeSet<String>, StorageError> {
        let mut keys = BTreeSet::new();
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            let key = String::from_utf8_lossy(&key).into_owned();
            if key_in_prefix(&key, prefix) {
                keys.insert(key);
            }
        }
        Ok(keys)
    }

    /// Apply ops as one atomic sled batch.
    fn apply(&self, ops: Vec<PendingOp>) -> Result<(), StorageError> {
        let mut batch = sled::Batch::default();
        let mut staged: BTreeSet<String> = BTreeSet::new();
        for op in ops {
            match op {
                PendingOp::Put(key, value) => {
                    batch.insert(key.as_bytes(), value);
                    staged.insert(key);
                }
                PendingOp::Erase(key) => {
                    batch.remove(key.as_bytes());
                    staged.remove(&key);
                }
                PendingOp::Clear(prefix) => {
                    for key in self.backend_keys(&prefix)? {
                        batch.remove(key.as_bytes());
                    }
                    let doomed: Vec<String> = staged
                        .iter()
                        .filter(|k| key_in_prefix(k, &prefix))
                        .cloned()
                        .collect();
                    for key in doomed {
                        batch.remove(key.as_bytes());
                        staged.remove(&key);
                    }
                }
            }
        }
        self.db.apply_batch(batch)?;
        if self.flush_on_batch {
            self.db.flush()?;
        }
        Ok(())
    }

    fn write(&self, op: PendingOp) -> Result<(), StorageError> {
        let mut pending = self.pending.lock();
        if pending.is_active() {
            pending.record(op);
            Ok(())
        } else {
            drop(pending);
            self.apply(vec![op])
        }
    }
}

impl Database for SledDatabase {
    fn get(&self, key: &[&str]) -> Result<Vec<u8>, StorageError> {
        let key = join_key(key);
        let pending = self.pending.lock();
        self.read(&pending, &key)?
            .ok_or(StorageError::NotFound(key))
    }

    fn put(&self, value: &[u8], key: &[&str]) -> Result<(), StorageError> {
        self.write(PendingOp::Put(join_key(key), value.to_vec()))
    }

    fn clear(&self, prefix: &[&str]) -> Result<(), StorageError> {
        self.write(PendingOp::Clear(join_key(prefix)))
    }

    fn erase(&self, key: &[&str]) -> Result<(), StorageError> {
        let key = join_key(key);
        {
            let pending = self.pending.lock();
            if self.read(&pending, &key)?.is_none() {
                return Err(StorageError::NotFound(key));
            }
        }
        self.write(PendingOp::Erase(key))
    }

    fn keys(&self, prefix: &[&str]) -> Result<Vec<String>, StorageError> {
        let prefix = join_key(prefix);
        let base = self.backend_keys(&prefix)?;
        let pending = self.pending.lock();
        Ok(pending
            .overlay_keys(base, &prefix)
            .iter()
            .map(|k| strip_key_prefix(k, &prefix))
            .collect())
    }

    fn begin_batch(&self) {
        self.pending.lock().begin();
    }

    fn flush_batch(&self) -> Result<(), StorageError> {
        let ops = self.pending.lock().finish()?;
        if let Some(ops) = ops {
            debug!(ops = ops.len(), "Applying store batch");
            self.apply(ops)?;
        }
        Ok(())
    }

    fn rollback_batch(&self) {
        self.pending.lock().rollback();
    }

    fn have_writes(&self) -> bool {
        self.pending.lock().has_writes()
    }

    fn export(&self, writer: &mut dyn Write) -> Result<(), StorageError> {
        let mut entries = Vec::new();
        for item in self.db.iter() {
            let (key, value) = item?;
            entries.push((String::from_utf8_lossy(&key).into_owned(), value.to_vec()));
        }
        write_dump(writer, &Dump { entries })
    }

    fn import(&self, reader: &mut dyn Read) -> Result<(), StorageError> {
        let dump = read_dump(reader)?;
        for (key, value) in dump.entries {
            self.write(PendingOp::Put(key, value))?;
        }
        Ok(())
    }

    fn close(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}
