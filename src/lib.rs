//! Treeline: versioned metadata core for an encrypted filesystem
//!
//! A Merkle DAG of files, directories, commits and ghost tombstones with
//! git-like semantics: a mutable staging commit, finalized commits linked
//! by parent hashes, rename-aware per-node history and mark-and-sweep
//! collection of unreachable objects, all persisted in a key/value store.
//!
//! ```no_run
//! use std::sync::Arc;
//! use treeline::{ops, Author, Hash, Linker, MemoryDatabase};
//!
//! # fn main() -> treeline::Result<()> {
//! let mut linker = Linker::new(Arc::new(MemoryDatabase::new()));
//! ops::mkdir(&mut linker, "/photos", false)?;
//! ops::stage_file(&mut linker, "/photos/cat.png", Hash::sum(b"meow"), 4, Vec::new())?;
//! linker.make_commit(&Author::new("alice"), "add cat")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gc;
pub mod history;
pub mod linker;
pub mod logging;
pub mod node;
pub mod ops;
pub mod store;
pub mod types;

pub use config::CoreConfig;
pub use error::{CoreError, Result, StorageError};
pub use gc::{GarbageCollector, GcStats};
pub use history::{Change, ChangeMask, HistoryWalker};
pub use linker::Linker;
pub use node::{
    Author, Commit, Directory, File, Ghost, Hierarchy, Metadata, Node, NodeKind, Settable,
};
pub use store::{Database, MemoryDatabase, SledDatabase};
pub use types::{Hash, Inode};
