//! In-memory store backend

use crate::error::StorageError;
use crate::store::batch::{key_in_prefix, Lookup, PendingOp, PendingWrites};
use crate::store::{join_key, read_dump, strip_key_prefix, write_dump, Database, Dump};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};

#[derive(Default)]
struct Inner {
    data: BTreeMap<String, Vec<u8>>,
    pending: PendingWrites,
}

impl Inner {
    fn read(&self, key: &str) -> Option<Vec<u8>> {
        match self.pending.lookup(key) {
            Lookup::Present(value) => Some(value),
            Lookup::Deleted => None,
            Lookup::Unknown => self.data.get(key).cloned(),
        }
    }

    fn apply(&mut self, op: PendingOp) {
        match op {
            PendingOp::Put(key, value) => {
                self.data.insert(key, value);
            }
            PendingOp::Erase(key) => {
                self.data.remove(&key);
            }
            PendingOp::Clear(prefix) => self.data.retain(|k, _| !key_in_prefix(k, &prefix)),
        }
    }

    fn write(&mut self, op: PendingOp) {
        if self.pending.is_active() {
            self.pending.record(op);
        } else {
            self.apply(op);
        }
    }
}

/// `BTreeMap`-backed database. Nothing survives the process.
#[derive(Default)]
pub struct MemoryDatabase {
    inner: Mutex<Inner>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Database for MemoryDatabase {
    fn get(&self, key: &[&str]) -> Result<Vec<u8>, StorageError> {
        let key = join_key(key);
        self.inner
            .lock()
            .read(&key)
            .ok_or(StorageError::NotFound(key))
    }

    fn put(&self, value: &[u8], key: &[&str]) -> Result<(), StorageError> {
        self.inner
            .lock()
            .write(PendingOp::Put(join_key(key), value.to_vec()));
        Ok(())
    }

    fn clear(&self, prefix: &[&str]) -> Result<(), StorageError> {
        self.inner.lock().write(PendingOp::Clear(join_key(prefix)));
        Ok(())
    }

    fn erase(&self, key: &[&str]) -> Result<(), StorageError> {
        let key = join_key(key);
        let mut inner = self.inner.lock();
        if inner.read(&key).is_none() {
            return Err(StorageError::NotFound(key));
        }
        inner.write(PendingOp::Erase(key));
        Ok(())
    }

    fn keys(&self, prefix: &[&str]) -> Result<Vec<String>, StorageError> {
        let prefix = join_key(prefix);
        let inner = self.inner.lock();
        let base: BTreeSet<String> = inner
            .data
            .keys()
            .filter(|k| key_in_prefix(k, &prefix))
            .cloned()
            .collect();
        Ok(inner
            .pending
            .overlay_keys(base, &prefix)
            .iter()
            .map(|k| strip_key_prefix(k, &prefix))
            .collect())
    }

    fn begin_batch(&self) {
        self.inner.lock().pending.begin();
    }

    fn flush_batch(&self) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        if let Some(ops) = inner.pending.finish()? {
            for op in ops {
                inner.apply(op);
            }
        }
        Ok(())
    }

    fn rollback_batch(&self) {
        self.inner.lock().pending.rollback();
    }

    fn have_writes(&self) -> bool {
        self.inner.lock().pending.has_writes()
    }

    fn export(&self, writer: &mut dyn Write) -> Result<(), StorageError> {
        let dump = Dump {
            entries: self
                .inner
                .lock()
                .data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        write_dump(writer, &dump)
    }

    fn import(&self, reader: &mut dyn Read) -> Result<(), StorageError> {
        let dump = read_dump(reader)?;
        let mut inner = self.inner.lock();
        for (key, value) in dump.entries {
            inner.write(PendingOp::Put(key, value));
        }
        Ok(())
    }

    fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
