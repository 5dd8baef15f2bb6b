//! Pending-write overlay shared by the store backends
//!
//! While at least one batch is open, writes are recorded here instead of
//! hitting the backend. Reads consult the overlay first so a batch always
//! observes its own writes.

use std::collections::BTreeSet;

use crate::error::StorageError;

#[derive(Debug, Clone)]
pub(crate) enum PendingOp {
    Put(String, Vec<u8>),
    Erase(String),
    Clear(String),
}

/// What the overlay knows about a single key.
pub(crate) enum Lookup {
    /// The overlay says nothing; ask the backend.
    Unknown,
    Present(Vec<u8>),
    Deleted,
}

#[derive(Debug, Default)]
pub(crate) struct PendingWrites {
    depth: usize,
    ops: Vec<PendingOp>,
}

/// True if `key` lies within the key range named by `prefix`.
pub(crate) fn key_in_prefix(key: &str, prefix: &str) -> bool {
    prefix.is_empty() || key == prefix || key.starts_with(&format!("{}/", prefix))
}

impl PendingWrites {
    pub fn is_active(&self) -> bool {
        self.depth > 0
    }

    pub fn has_writes(&self) -> bool {
        !self.ops.is_empty()
    }

    pub fn begin(&mut self) {
        self.depth += 1;
    }

    /// Close one batch level. Returns the ops to apply once the outermost
    /// batch is closed, `None` while batches remain open.
    pub fn finish(&mut self) -> Result<Option<Vec<PendingOp>>, StorageError> {
        if self.depth == 0 {
            return Err(StorageError::BatchUnderflow);
        }
        self.depth -= 1;
        if self.depth == 0 {
            Ok(Some(std::mem::take(&mut self.ops)))
        } else {
            Ok(None)
        }
    }

    pub fn rollback(&mut self) {
        self.depth = 0;
        self.ops.clear();
    }

    pub fn record(&mut self, op: PendingOp) {
        self.ops.push(op);
    }

    pub fn lookup(&self, key: &str) -> Lookup {
        for op in self.ops.iter().rev() {
            match op {
                PendingOp::Put(k, v) if k == key => return Lookup::Present(v.clone()),
                PendingOp::Erase(k) if k == key => return Lookup::Deleted,
                PendingOp::Clear(prefix) if key_in_prefix(key, prefix) => return Lookup::Deleted,
                _ => {}
            }
        }
        Lookup::Unknown
    }

    /// Apply the overlay to the backend's view of the keys below `prefix`.
    pub fn overlay_keys(&self, mut keys: BTreeSet<String>, prefix: &str) -> BTreeSet<String> {
        for op in &self.ops {
            match op {
                PendingOp::Put(k, _) if key_in_prefix(k, prefix) => {
                    keys.insert(k.clone());
                }
                PendingOp::Erase(k) => {
                    keys.remove(k);
                }
                PendingOp::Clear(p) => keys.retain(|k| !key_in_prefix(k, p)),
                _ => {}
            }
        }
        keys
    }
}
