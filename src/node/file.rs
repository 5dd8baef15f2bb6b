//! File nodes

use crate::node::{node_path, Hierarchy, Metadata, NodeKind, Settable};
use crate::types::{Hash, Inode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A leaf node describing one file's content.
///
/// `content_key` is opaque to the core (e.g. a reference to the key the
/// content was encrypted with).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    name: String,
    parent_path: String,
    inode: Inode,
    mod_time: DateTime<Utc>,
    size: u64,
    content_hash: Hash,
    content_key: Vec<u8>,
    tree_hash: Hash,
}

impl File {
    /// Create an empty, detached file.
    pub fn new(name: &str, inode: Inode) -> Self {
        let mut file = File {
            name: name.to_string(),
            parent_path: String::new(),
            inode,
            mod_time: Utc::now(),
            size: 0,
            content_hash: Hash::empty(),
            content_key: Vec::new(),
            tree_hash: Hash::empty(),
        };
        file.rehash();
        file
    }

    pub fn content_key(&self) -> &[u8] {
        &self.content_key
    }

    /// Point the file at new content.
    pub fn set_content(&mut self, content_hash: Hash, size: u64) {
        self.content_hash = content_hash;
        self.size = size;
        self.touch();
    }

    pub fn set_content_key(&mut self, key: Vec<u8>) {
        self.content_key = key;
        self.touch();
    }

    fn touch(&mut self) {
        self.mod_time = Utc::now();
        self.rehash();
    }

    /// tree_hash = hash("file:" || path || inode || content_hash || content_key)
    fn rehash(&mut self) {
        let path = self.path();
        self.tree_hash = Hash::sum_parts(&[
            b"file:",
            path.as_bytes(),
            &self.inode.to_be_bytes(),
            self.content_hash.as_bytes(),
            &self.content_key,
        ]);
    }
}

impl Metadata for File {
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
        NodeKind::File
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

impl Settable for File {
    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.rehash();
    }

    fn set_mod_time(&mut self, mod_time: DateTime<Utc>) {
        self.mod_time = mod_time;
    }
}

impl Hierarchy for File {
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
