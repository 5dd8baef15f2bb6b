//! Directory nodes and the XOR hash-mixing scheme
//!
//! A directory's tree hash is its identity seed XOR the tree hash of every
//! child; its content hash is a fixed seed XOR every child's content hash.
//! Adding a child XORs its hashes in, removing XORs them back out, so the
//! result is independent of insertion order and add/remove are exact
//! inverses. Folding the change into ancestors is the Linker's job, since a
//! directory holds no reference to its parent.

use crate::error::{CoreError, Result};
use crate::node::{node_path, Hierarchy, Metadata, Node, NodeKind, Settable};
use crate::types::{Hash, Inode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a directory remembers about each child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildEntry {
    pub tree_hash: Hash,
    pub content_hash: Hash,
    pub size: u64,
    pub is_ghost: bool,
}

impl ChildEntry {
    pub fn of(node: &Node) -> Self {
        ChildEntry {
            tree_hash: node.tree_hash().clone(),
            content_hash: node.content_hash().clone(),
            size: node.size(),
            is_ghost: node.is_ghost(),
        }
    }

    /// Size contributed to the parent; ghosts contribute nothing.
    fn accounted_size(&self) -> u64 {
        if self.is_ghost {
            0
        } else {
            self.size
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directory {
    name: String,
    parent_path: String,
    inode: Inode,
    mod_time: DateTime<Utc>,
    size: u64,
    children: BTreeMap<String, ChildEntry>,
    tree_hash: Hash,
    content_hash: Hash,
}

fn content_seed() -> Hash {
    Hash::sum(b"directory-content")
}

impl Directory {
    /// Create an empty, detached directory.
    pub fn new(name: &str, inode: Inode) -> Self {
        let mut dir = Directory {
            name: name.to_string(),
            parent_path: String::new(),
            inode,
            mod_time: Utc::now(),
            size: 0,
            children: BTreeMap::new(),
            tree_hash: Hash::empty(),
            content_hash: content_seed(),
        };
        dir.rehash();
        dir
    }

    /// Create an empty root directory.
    pub fn root(inode: Inode) -> Self {
        Directory::new("", inode)
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty() && self.parent_path.is_empty()
    }

    pub fn child(&self, name: &str) -> Option<&Hash> {
        self.children.get(name).map(|entry| &entry.tree_hash)
    }

    pub fn child_entry(&self, name: &str) -> Option<&ChildEntry> {
        self.children.get(name)
    }

    /// Children as `(name, tree_hash)`, ordered by name.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Hash)> {
        self.children
            .iter()
            .map(|(name, entry)| (name.as_str(), &entry.tree_hash))
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Attach `child` below this directory.
    ///
    /// Sets the child's parent path (which changes its tree hash) and then
    /// folds the child into this directory's hashes and size.
    pub fn add(&mut self, child: &mut Node) -> Result<()> {
        if child.name().is_empty() {
            return Err(CoreError::bad_node("cannot add a node without a name"));
        }
        if self.children.contains_key(child.name()) {
            return Err(CoreError::AlreadyExists(node_path(
                &self.path(),
                child.name(),
            )));
        }
        child.set_parent_path(&self.path())?;
        self.link(child.name().to_string(), ChildEntry::of(child));
        Ok(())
    }

    /// Detach the child called `name`; exact inverse of [`Directory::add`].
    pub fn remove_child(&mut self, name: &str) -> Result<ChildEntry> {
        match self.children.remove(name) {
            Some(entry) => {
                self.unmix(&entry);
                self.mod_time = Utc::now();
                Ok(entry)
            }
            None => Err(CoreError::NoSuchFile(node_path(&self.path(), name))),
        }
    }

    /// Put `child` into its slot, swapping out whatever occupied that name.
    ///
    /// `child` must already carry this directory as its parent path.
    /// Returns the entry that was replaced, if any.
    pub fn replace_child(&mut self, child: &Node) -> Option<ChildEntry> {
        let previous = self.children.remove(child.name());
        if let Some(entry) = &previous {
            self.unmix(entry);
        }
        self.link(child.name().to_string(), ChildEntry::of(child));
        previous
    }

    fn link(&mut self, name: String, entry: ChildEntry) {
        self.mix(&entry);
        self.children.insert(name, entry);
        self.mod_time = Utc::now();
    }

    fn mix(&mut self, entry: &ChildEntry) {
        self.tree_hash.xor_in(&entry.tree_hash);
        self.content_hash.xor_in(&entry.content_hash);
        self.size += entry.accounted_size();
    }

    fn unmix(&mut self, entry: &ChildEntry) {
        self.tree_hash.xor_in(&entry.tree_hash);
        self.content_hash.xor_in(&entry.content_hash);
        self.size = self.size.saturating_sub(entry.accounted_size());
    }

    fn seed(&self) -> Hash {
        let path = self.path();
        Hash::sum_parts(&[b"directory:", path.as_bytes(), &self.inode.to_be_bytes()])
    }

    /// Full recomputation, needed only when the seed (path) changes.
    fn rehash(&mut self) {
        let mut tree_hash = self.seed();
        let mut content_hash = content_seed();
        for entry in self.children.values() {
            tree_hash.xor_in(&entry.tree_hash);
            content_hash.xor_in(&entry.content_hash);
        }
        self.tree_hash = tree_hash;
        self.content_hash = content_hash;
    }
}

impl Metadata for Directory {
    fn name(&self) -> &str {
        &self.name
    }

    fn tree_hash(&self) -> &Hash {
        &self.tree_hash
    }

    fn content_hash(&self) -> &Hash {
        &self.content_hash
    }

    fn mod_time(&self) -> DateTime<Utc> {
        self.mod_time
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn inode(&self) -> Inode {
        self.inode
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn path(&self) -> String {
        node_path(&self.parent_path, &self.name)
    }
}

impl Settable for Directory {
    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.rehash();
    }

    fn set_mod_time(&mut self, mod_time: DateTime<Utc>) {
        self.mod_time = mod_time;
    }
}

impl Hierarchy for Directory {
    fn parent_path(&self) -> Option<&str> {
        if self.parent_path.is_empty() {
            None
        } else {
            Some(&self.parent_path)
        }
    }

    fn set_parent_path(&mut self, parent: &str) {
        self.parent_path = parent.to_string();
        self.rehash();
    }
}
