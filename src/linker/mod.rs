//! Linker
//!
//! The single authority translating between in-memory nodes and the
//! key/value store. It owns the in-memory indices, the staging protocol,
//! commit creation and the refs.
//!
//! Storage layout:
//!
//! ```text
//! objects/<hash>          encoded finalized node
//! tree/<path>[/.]         hash ("/." marks a directory entry)
//! stage/objects/<hash>    encoded staged node
//! stage/tree/<path>[/.]   hash
//! stage/STATUS            encoded staging commit
//! inode/<id-hex>          hash of the live node with that inode
//! refs/<name>             hash (lower-cased name; head and curr are reserved)
//! stats/node-count        inode counter (u64, big-endian)
//! metadata/<key>          caller-defined bytes
//! ```
//!
//! Read operations take `&self`; operations that change the staged tree take
//! `&mut self`, so a caller sharing a linker needs one lock per repository.

mod commit;
mod index;
mod trie;

pub use commit::{CURR, HEAD};
pub use index::MemIndex;

use crate::error::{CoreError, Result, StorageError};
use crate::node::{
    decode, encode, path, Commit, Directory, Metadata, Node, NodeKind, NodeResolver,
};
use crate::store::{Batch, Database};
use crate::types::{Hash, Inode};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

pub(crate) const OBJECTS: &str = "objects";
pub(crate) const TREE: &str = "tree";
pub(crate) const STAGE: &str = "stage";
pub(crate) const STATUS: &str = "STATUS";
pub(crate) const INODE: &str = "inode";
pub(crate) const REFS: &str = "refs";
pub(crate) const STATS: &str = "stats";
pub(crate) const NODE_COUNT: &str = "node-count";
pub(crate) const METADATA: &str = "metadata";

/// Key below `tree/` for a node; directories get a trailing `/.`.
pub(crate) fn tree_key(node_path: &str, is_dir: bool) -> String {
    let clean = path::clean(node_path);
    if !is_dir {
        return clean;
    }
    if clean == path::ROOT {
        "/.".to_string()
    } else {
        format!("{}/.", clean)
    }
}

pub(crate) fn inode_key(inode: Inode) -> String {
    format!("{:x}", inode)
}

/// Directories and ghosts of directories share the directory key.
fn is_dir_entry(node: &Node) -> bool {
    match node {
        Node::Directory(_) => true,
        Node::Ghost(ghost) => ghost.old_node().kind() == NodeKind::Directory,
        _ => false,
    }
}

fn ignore_not_found(result: std::result::Result<(), StorageError>) -> Result<()> {
    match result {
        Ok(()) | Err(StorageError::NotFound(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

pub struct Linker {
    kv: Arc<dyn Database>,
    index: RwLock<MemIndex>,
}

impl Linker {
    pub fn new(kv: Arc<dyn Database>) -> Self {
        Self {
            kv,
            index: RwLock::new(MemIndex::default()),
        }
    }

    pub fn kv(&self) -> &dyn Database {
        self.kv.as_ref()
    }

    /// Increment and persist the inode counter; ids are never reused.
    pub fn next_inode(&self) -> Result<Inode> {
        let current = match self.kv.get(&[STATS, NODE_COUNT]) {
            Ok(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    CoreError::bad_node(format!("corrupt node counter ({} bytes)", bytes.len()))
                })?;
                u64::from_be_bytes(raw)
            }
            Err(StorageError::NotFound(_)) => 0,
            Err(e) => return Err(e.into()),
        };
        let next = current + 1;
        self.kv.put(&next.to_be_bytes(), &[STATS, NODE_COUNT])?;
        Ok(next)
    }

    /// Node with the given tree hash, from cache, stage or permanent store.
    ///
    /// Absent hashes yield `Ok(None)`.
    pub fn node_by_hash(&self, hash: &Hash) -> Result<Option<Node>> {
        if hash.is_empty() {
            return Ok(None);
        }
        if let Some(node) = self.index.read().get(hash) {
            return Ok(Some(node.clone()));
        }

        let hex = hash.to_hex();
        for bucket in [&[STAGE, OBJECTS][..], &[OBJECTS][..]] {
            let mut key = bucket.to_vec();
            key.push(&hex);
            match self.kv.get(&key) {
                Ok(bytes) => {
                    let node = decode(&bytes)?;
                    trace!(hash = %hash.short(), kind = %node.kind(), "Loaded node from store");
                    self.index.write().remember(node.clone());
                    return Ok(Some(node));
                }
                Err(StorageError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }

    /// Live node carrying `inode`, following it across content changes.
    pub fn node_by_inode(&self, inode: Inode) -> Result<Option<Node>> {
        let cached = self.index.read().hash_for_inode(inode).cloned();
        if let Some(hash) = cached {
            if let Some(node) = self.node_by_hash(&hash)? {
                return Ok(Some(node));
            }
        }
        let hash = match self.kv.get(&[INODE, &inode_key(inode)]) {
            Ok(bytes) => Hash::from_bytes(bytes),
            Err(StorageError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let node = self.node_by_hash(&hash)?;
        if node.is_some() {
            self.index.write().remember_inode(inode, hash);
        }
        Ok(node)
    }

    /// Raw path -> hash resolution through the trie, stage and tree buckets.
    ///
    /// Unlike [`Linker::lookup_node`] this may return staged-but-uncommitted
    /// or ghosted nodes.
    pub fn resolve_node(&self, node_path: &str) -> Result<Option<Node>> {
        let node_path = path::clean(node_path);
        let cached = self.index.read().hash_for_path(&node_path).cloned();
        if let Some(hash) = cached {
            if let Some(node) = self.node_by_hash(&hash)? {
                return Ok(Some(node));
            }
        }

        for bucket in [&[STAGE, TREE][..], &[TREE][..]] {
            for is_dir in [false, true] {
                let entry = tree_key(&node_path, is_dir);
                let mut key = bucket.to_vec();
                key.push(&entry);
                match self.kv.get(&key) {
                    Ok(bytes) => {
                        let hash = Hash::from_bytes(bytes);
                        let node = self.node_by_hash(&hash)?;
                        if node.is_some() {
                            self.index.write().remember_path(&node_path, hash);
                        }
                        return Ok(node);
                    }
                    Err(StorageError::NotFound(_)) => continue,
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(None)
    }

    /// Walk the live tree from the staging root down to `node_path`.
    pub fn lookup_node(&self, node_path: &str) -> Result<Node> {
        let root = self.root()?;
        self.lookup_in(root, node_path)
    }

    /// Like [`Linker::lookup_node`], but in the tree of `commit`.
    pub fn lookup_node_at(&self, commit: &Commit, node_path: &str) -> Result<Node> {
        let root = self.directory_by_hash(commit.root())?;
        self.lookup_in(root, node_path)
    }

    pub fn lookup_directory(&self, node_path: &str) -> Result<Directory> {
        self.lookup_node(node_path)?.into_directory()
    }

    fn lookup_in(&self, root: Directory, node_path: &str) -> Result<Node> {
        let mut curr = Node::Directory(root);
        for part in path::split(node_path) {
            let hash = match &curr {
                Node::Directory(dir) => dir
                    .child(&part)
                    .cloned()
                    .ok_or_else(|| CoreError::NoSuchFile(path::clean(node_path)))?,
                Node::File(_) | Node::Ghost(_) => {
                    return Err(CoreError::NoSuchFile(path::clean(node_path)))
                }
                Node::Commit(_) => return Err(CoreError::bad_node("commit inside a tree")),
            };
            curr = self.node_by_hash(&hash)?.ok_or_else(|| {
                CoreError::NotFound(format!("object {} for {}", hash.short(), node_path))
            })?;
        }
        Ok(curr)
    }

    pub fn directory_by_hash(&self, hash: &Hash) -> Result<Directory> {
        self.node_by_hash(hash)?
            .ok_or_else(|| CoreError::NotFound(format!("directory {}", hash.short())))?
            .into_directory()
    }

    pub fn commit_by_hash(&self, hash: &Hash) -> Result<Commit> {
        self.node_by_hash(hash)?
            .ok_or_else(|| CoreError::NotFound(format!("commit {}", hash.short())))?
            .into_commit()
    }

    /// Root directory of the staging commit.
    pub fn root(&self) -> Result<Directory> {
        let status = self.status()?;
        self.directory_by_hash(status.root())
    }

    /// Stage `node` and re-stage every ancestor up to the root.
    ///
    /// The node takes the slot named after it in its parent directory,
    /// replacing whatever was there. Commits are rejected; they are only
    /// written by [`Linker::make_commit`].
    #[instrument(skip(self, node), fields(path = %node.path(), hash = %node.tree_hash().short()))]
    pub fn stage_node(&mut self, node: &Node) -> Result<()> {
        if node.kind() == NodeKind::Commit {
            return Err(CoreError::bad_node("commits cannot be staged directly"));
        }
        self.in_batch(|lkr| lkr.stage_and_propagate(node.clone()))?;
        debug!("Staged node");
        Ok(())
    }

    /// Run `f` inside one store batch.
    ///
    /// The caches are swapped while the batch is still pending, so on any
    /// failure they are dropped together with the rolled back writes.
    pub(crate) fn in_batch<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let kv = Arc::clone(&self.kv);
        let batch = Batch::new(kv.as_ref());
        let result = match f(self) {
            Ok(value) => batch.flush().map(|()| value).map_err(CoreError::from),
            Err(e) => {
                drop(batch);
                Err(e)
            }
        };
        if result.is_err() {
            self.clear_caches();
        }
        result
    }

    /// Single upward pass: swap the node into its parent, then the parent
    /// into the grandparent, until the root lands in the staging commit.
    fn stage_and_propagate(&self, node: Node) -> Result<()> {
        let mut node = node;
        loop {
            let parent_path = node.parent_path().map(str::to_string);
            let parent_path = match parent_path {
                Some(parent_path) => parent_path,
                None => return self.stage_root(node),
            };
            let mut parent = self.lookup_directory(&parent_path)?;
            let previous = parent.replace_child(&node);
            self.replace_staged(previous.map(|entry| entry.tree_hash).as_ref(), &node)?;
            node = Node::Directory(parent);
        }
    }

    fn stage_root(&self, node: Node) -> Result<()> {
        let is_root = matches!(&node, Node::Directory(dir) if dir.is_root());
        if !is_root {
            return Err(CoreError::bad_node(format!(
                "{} is not attached to a parent",
                node.path()
            )));
        }
        let mut status = self.status()?;
        let old_root = status.root().clone();
        self.replace_staged(Some(&old_root), &node)?;
        status.set_root(node.tree_hash().clone())?;
        self.save_status(&status)
    }

    /// Write `node` into the stage without touching its ancestors.
    pub(crate) fn stage_detached(&self, node: &Node) -> Result<()> {
        self.replace_staged(None, node)
    }

    /// Write `node` to the staging buckets and swap it in for `old`.
    ///
    /// A superseded staged object is erased; committed versions stay in the
    /// permanent bucket.
    fn replace_staged(&self, old: Option<&Hash>, node: &Node) -> Result<()> {
        let hash = node.tree_hash();
        let hex = hash.to_hex();
        self.kv.put(&encode(node)?, &[STAGE, OBJECTS, &hex])?;
        self.kv.put(
            hash.as_bytes(),
            &[STAGE, TREE, &tree_key(&node.path(), is_dir_entry(node))],
        )?;

        let inode = inode_key(node.inode());
        match node.kind() {
            NodeKind::File | NodeKind::Directory => {
                self.kv.put(hash.as_bytes(), &[INODE, &inode])?;
            }
            NodeKind::Ghost => {
                if let Some(old) = old {
                    match self.kv.get(&[INODE, &inode]) {
                        Ok(current) if current == old.as_bytes() => {
                            self.kv.erase(&[INODE, &inode])?;
                        }
                        Ok(_) | Err(StorageError::NotFound(_)) => {}
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            NodeKind::Commit => {}
        }

        if let Some(old) = old {
            if old != hash {
                ignore_not_found(self.kv.erase(&[STAGE, OBJECTS, &old.to_hex()]))?;
            }
        }

        self.index.write().swap(old, node.clone());
        trace!(path = %node.path(), hash = %hash.short(), "Wrote staged node");
        Ok(())
    }

    pub(crate) fn purge_cached(&self, node: &Node) {
        self.index.write().purge(node);
    }

    /// Drop all in-memory caches; the store stays untouched.
    pub fn clear_caches(&self) {
        self.index.write().clear();
    }

    pub fn cached_nodes(&self) -> usize {
        self.index.read().len()
    }

    pub fn metadata_get(&self, key: &str) -> Result<Vec<u8>> {
        Ok(self.kv.get(&[METADATA, key])?)
    }

    pub fn metadata_put(&self, key: &str, value: &[u8]) -> Result<()> {
        Ok(self.kv.put(value, &[METADATA, key])?)
    }
}

impl NodeResolver for Linker {
    fn resolve_hash(&self, hash: &Hash) -> Result<Option<Node>> {
        self.node_by_hash(hash)
    }
}
