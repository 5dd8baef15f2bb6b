//! Commit nodes
//!
//! A commit is mutable while it serves as the staging commit. Once `root`
//! is set and [`Commit::finalize`] is called it is boxed: its hash is fixed
//! and further mutation is rejected.

use crate::error::{CoreError, Result};
use crate::node::{Metadata, NodeKind};
use crate::types::{Hash, Inode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Commit author: display name plus identity hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub hash: Hash,
}

impl Author {
    /// Author whose identity hash is derived from the name.
    pub fn new(name: &str) -> Self {
        Author {
            name: name.to_string(),
            hash: Hash::sum(name.as_bytes()),
        }
    }

    pub fn with_hash(name: &str, hash: Hash) -> Self {
        Author {
            name: name.to_string(),
            hash,
        }
    }
}

impl Default for Author {
    fn default() -> Self {
        Author::with_hash("", Hash::empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    inode: Inode,
    mod_time: DateTime<Utc>,
    message: String,
    author: Author,
    root: Hash,
    parent: Hash,
    index: u64,
    tree_hash: Hash,
    boxed: bool,
}

impl Commit {
    /// Create a new (staging) commit.
    pub fn new(inode: Inode) -> Self {
        Commit {
            inode,
            mod_time: Utc::now(),
            message: String::new(),
            author: Author::default(),
            root: Hash::empty(),
            parent: Hash::empty(),
            index: 0,
            tree_hash: Hash::empty(),
            boxed: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn root(&self) -> &Hash {
        &self.root
    }

    /// Hash of the previous commit; `None` for the very first commit.
    pub fn parent(&self) -> Option<&Hash> {
        if self.parent.is_empty() {
            None
        } else {
            Some(&self.parent)
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn is_boxed(&self) -> bool {
        self.boxed
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.boxed {
            return Err(CoreError::bad_node(format!(
                "commit {} is finalized",
                self.tree_hash.short()
            )));
        }
        Ok(())
    }

    pub fn set_root(&mut self, root: Hash) -> Result<()> {
        self.ensure_mutable()?;
        self.root = root;
        Ok(())
    }

    pub fn set_parent(&mut self, parent: Option<Hash>) -> Result<()> {
        self.ensure_mutable()?;
        self.parent = parent.unwrap_or_default();
        Ok(())
    }

    pub fn set_message(&mut self, message: &str) -> Result<()> {
        self.ensure_mutable()?;
        self.message = message.to_string();
        Ok(())
    }

    pub fn set_author(&mut self, author: Author) -> Result<()> {
        self.ensure_mutable()?;
        self.author = author;
        Ok(())
    }

    pub fn set_index(&mut self, index: u64) -> Result<()> {
        self.ensure_mutable()?;
        self.index = index;
        Ok(())
    }

    /// hash(parent_padded || root_padded || author_padded || message)
    ///
    /// Also usable on a staging commit to get a provisional identity.
    pub fn compute_hash(&self) -> Hash {
        Hash::sum_parts(&[
            &self.parent.padded(),
            &self.root.padded(),
            &self.author.hash.padded(),
            self.message.as_bytes(),
        ])
    }

    /// Box the commit: compute its hash and freeze it.
    pub fn finalize(&mut self) -> Result<()> {
        self.ensure_mutable()?;
        if self.root.is_empty() {
            return Err(CoreError::bad_node("cannot finalize a commit without a root"));
        }
        self.mod_time = Utc::now();
        self.tree_hash = self.compute_hash();
        self.boxed = true;
        Ok(())
    }
}

impl Metadata for Commit {
    fn name(&self) -> &str {
        &self.message
    }

    /// Empty until the commit is boxed.
    fn tree_hash(&self) -> &Hash {
        &self.tree_hash
    }

    fn content_hash(&self) -> &Hash {
        &self.root
    }

    fn mod_time(&self) -> DateTime<Utc> {
        self.mod_time
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Commit
    }

    fn inode(&self) -> Inode {
        self.inode
    }

    fn size(&self) -> u64 {
        0
    }

    fn path(&self) -> String {
        String::new()
    }
}
