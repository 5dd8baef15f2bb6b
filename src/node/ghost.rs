//! Ghost nodes: tombstones left behind by moves and removals

use crate::error::{CoreError, Result};
use crate::node::{Hierarchy, Metadata, Node, NodeKind};
use crate::types::{Hash, Inode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The last known state of a moved or removed file or directory.
///
/// The ghost occupies the old slot in its parent directory. `moved_to`
/// points at the node's new tree hash when the ghost was left by a move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ghost {
    node: Box<Node>,
    moved_to: Option<Hash>,
    mod_time: DateTime<Utc>,
    tree_hash: Hash,
}

impl Ghost {
    /// Wrap a file or directory. Ghosts and commits cannot be wrapped.
    pub fn new(node: Node, moved_to: Option<Hash>) -> Result<Self> {
        match node.kind() {
            NodeKind::File | NodeKind::Directory => {}
            other => {
                return Err(CoreError::bad_node(format!("cannot make a ghost of a {}", other)))
            }
        }
        let mut ghost = Ghost {
            node: Box::new(node),
            moved_to,
            mod_time: Utc::now(),
            tree_hash: Hash::empty(),
        };
        ghost.rehash();
        Ok(ghost)
    }

    /// The node as it was right before it was moved or removed.
    pub fn old_node(&self) -> &Node {
        &self.node
    }

    pub fn into_old_node(self) -> Node {
        *self.node
    }

    pub fn moved_to(&self) -> Option<&Hash> {
        self.moved_to.as_ref()
    }

    pub fn set_moved_to(&mut self, moved_to: Option<Hash>) {
        self.moved_to = moved_to;
    }

    /// tree_hash = hash("ghost:" || wrapped.tree_hash)
    fn rehash(&mut self) {
        self.tree_hash = Hash::sum_parts(&[b"ghost:", self.node.tree_hash().as_bytes()]);
    }
}

impl Metadata for Ghost {
    fn name(&self) -> &str {
        self.node.name()
    }

    fn tree_hash(&self) -> &Hash {
        &self.tree_hash
    }

    fn content_hash(&self) -> &Hash {
        self.node.content_hash()
    }

    fn mod_time(&self) -> DateTime<Utc> {
        self.mod_time
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Ghost
    }

    fn inode(&self) -> Inode {
        self.node.inode()
    }

    fn size(&self) -> u64 {
        self.node.size()
    }

    fn path(&self) -> String {
        self.node.path()
    }
}

impl Hierarchy for Ghost {
    fn parent_path(&self) -> Option<&str> {
        self.node.parent_path()
    }

    fn set_parent_path(&mut self, parent: &str) {
        if let Some(node) = self.node.as_hierarchy_mut() {
            node.set_parent_path(parent);
        }
        self.rehash();
    }
}
