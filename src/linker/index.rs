//! In-memory indices kept in lock-step: hash -> node, inode -> hash and
//! path -> hash.
//!
//! The hash map owns the cached node; the other two indices only hold hashes
//! into it, so a node can never be reachable under a hash it no longer has.

use crate::linker::trie::PathTrie;
use crate::node::{Metadata, Node, NodeKind};
use crate::types::{Hash, Inode};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemIndex {
    by_hash: HashMap<Hash, Node>,
    by_inode: HashMap<Inode, Hash>,
    by_path: PathTrie,
}

/// Only live tree nodes own their inode slot; ghosts share the inode of the
/// node they wrap and commits are not looked up by inode.
fn owns_inode(node: &Node) -> bool {
    matches!(node.kind(), NodeKind::File | NodeKind::Directory)
}

impl MemIndex {
    pub fn get(&self, hash: &Hash) -> Option<&Node> {
        self.by_hash.get(hash)
    }

    pub fn hash_for_inode(&self, inode: Inode) -> Option<&Hash> {
        self.by_inode.get(&inode)
    }

    pub fn hash_for_path(&self, path: &str) -> Option<&Hash> {
        self.by_path.lookup(path)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.by_hash.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Cache a node loaded from the store, by hash only.
    ///
    /// A loaded node may be a historical version, so it never claims the path
    /// or inode slot of the live one.
    pub fn remember(&mut self, node: Node) {
        let hash = node.tree_hash().clone();
        if hash.is_empty() {
            return;
        }
        self.by_hash.insert(hash, node);
    }

    /// Record the live hash at `path`, as read from the tree buckets.
    pub fn remember_path(&mut self, path: &str, hash: Hash) {
        self.by_path.insert(path, hash);
    }

    /// Record the live hash for `inode`, as read from the inode bucket.
    pub fn remember_inode(&mut self, inode: Inode, hash: Hash) {
        self.by_inode.insert(inode, hash);
    }

    /// Replace the cache entry for `old` with `node`.
    ///
    /// The old hash key is removed before the new one is inserted, and the
    /// path and inode slots are overwritten. A ghost replacing the node that
    /// still owns the inode slot releases that slot.
    pub fn swap(&mut self, old: Option<&Hash>, node: Node) {
        if let Some(old) = old {
            if old != node.tree_hash() {
                self.by_hash.remove(old);
            }
            if node.is_ghost() && self.by_inode.get(&node.inode()) == Some(old) {
                self.by_inode.remove(&node.inode());
            }
        }
        let hash = node.tree_hash().clone();
        if node.kind() != NodeKind::Commit {
            self.by_path.insert(&node.path(), hash.clone());
        }
        if owns_inode(&node) {
            self.by_inode.insert(node.inode(), hash.clone());
        }
        self.by_hash.insert(hash, node);
    }

    /// Drop every trace of `node`.
    pub fn purge(&mut self, node: &Node) {
        let hash = node.tree_hash();
        self.by_hash.remove(hash);
        if self.by_inode.get(&node.inode()) == Some(hash) {
            self.by_inode.remove(&node.inode());
        }
        let path = node.path();
        if self.by_path.lookup(&path) == Some(hash) {
            self.by_path.remove(&path);
        }
    }

    pub fn clear(&mut self) {
        self.by_hash.clear();
        self.by_inode.clear();
        self.by_path.clear();
    }
}
