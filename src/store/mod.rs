//! Key/Value Store
//!
//! Hierarchical, bucketed byte-string storage with nested batching. Keys are
//! given as segment slices (`&["objects", "<hex>"]`) and joined with `/`.
//! The core only talks to the [`Database`] trait; the backends here are an
//! in-memory map and a sled database.

mod batch;
pub mod memory;
pub mod persistence;

pub use memory::MemoryDatabase;
pub use persistence::SledDatabase;

use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

pub const KEY_SEPARATOR: &str = "/";

/// Join key segments into one flat key.
pub fn join_key(segments: &[&str]) -> String {
    segments.join(KEY_SEPARATOR)
}

/// Storage backend contract.
///
/// Writes made while a batch is open become durable only after the
/// outermost batch is flushed, i.e. after `flush_batch` was called as many
/// times as `begin_batch`.
pub trait Database: Send + Sync {
    /// Value at `key`; `StorageError::NotFound` if absent.
    fn get(&self, key: &[&str]) -> Result<Vec<u8>, StorageError>;

    fn put(&self, value: &[u8], key: &[&str]) -> Result<(), StorageError>;

    /// Delete every key starting with `prefix`.
    fn clear(&self, prefix: &[&str]) -> Result<(), StorageError>;

    /// Delete `key`; `StorageError::NotFound` if absent.
    fn erase(&self, key: &[&str]) -> Result<(), StorageError>;

    /// Keys below `prefix`, each with the prefix stripped, in sorted order.
    fn keys(&self, prefix: &[&str]) -> Result<Vec<String>, StorageError>;

    fn begin_batch(&self);

    fn flush_batch(&self) -> Result<(), StorageError>;

    /// Drop every pending write and close all open batches.
    fn rollback_batch(&self);

    /// True if an open batch holds writes that are not yet flushed.
    fn have_writes(&self) -> bool;

    fn export(&self, writer: &mut dyn Write) -> Result<(), StorageError>;

    fn import(&self, reader: &mut dyn Read) -> Result<(), StorageError>;

    fn close(&self) -> Result<(), StorageError>;
}

/// RAII guard around one batch level.
///
/// Call [`Batch::flush`] on success; dropping an unflushed guard rolls the
/// pending writes back.
pub struct Batch<'a> {
    db: &'a dyn Database,
    done: bool,
}

impl<'a> Batch<'a> {
    pub fn new(db: &'a dyn Database) -> Self {
        db.begin_batch();
        Batch { db, done: false }
    }

    pub fn flush(mut self) -> Result<(), StorageError> {
        self.done = true;
        self.db.flush_batch()
    }
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        if !self.done {
            tracing::warn!("Rolling back unflushed store batch");
            self.db.rollback_batch();
        }
    }
}

/// Dump format shared by all backends.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Dump {
    pub entries: Vec<(String, Vec<u8>)>,
}

pub(crate) fn write_dump(writer: &mut dyn Write, dump: &Dump) -> Result<(), StorageError> {
    let bytes = bincode::serialize(dump)?;
    writer.write_all(&bytes)?;
    Ok(())
}

pub(crate) fn read_dump(reader: &mut dyn Read) -> Result<Dump, StorageError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bincode::deserialize(&bytes)?)
}

/// Strip `prefix` plus separator from `key`.
pub(crate) fn strip_key_prefix(key: &str, prefix: &str) -> String {
    if prefix.is_empty() {
        return key.to_string();
    }
    key.strip_prefix(prefix)
        .map(|rest| rest.strip_prefix(KEY_SEPARATOR).unwrap_or(rest))
        .unwrap_or(key)
        .to_string()
}
