//! Node Model
//!
//! The tagged-variant entities stored in the tree: files, directories,
//! commits and ghosts. Nodes never hold references to other nodes; every
//! relationship (parent, children, commit parent) is a path or a hash that
//! is resolved through the [`Linker`](crate::linker::Linker).
//!
//! Each node carries two hashes:
//! - `tree_hash`: storage identity, depends on path and inode.
//! - `content_hash`: path-independent payload hash.

pub mod codec;
pub mod commit;
pub mod directory;
pub mod file;
pub mod ghost;
pub mod path;
pub mod walk;

pub use codec::{decode, encode};
pub use commit::{Author, Commit};
pub use directory::{ChildEntry, Directory};
pub use file::File;
pub use ghost::Ghost;
pub use walk::{walk, walk_with, NodeResolver, Walk, WalkOrder};

use crate::error::{CoreError, Result};
use crate::types::{Hash, Inode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Directory,
    Commit,
    Ghost,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::File => "file",
            NodeKind::Directory => "directory",
            NodeKind::Commit => "commit",
            NodeKind::Ghost => "ghost",
        };
        f.write_str(name)
    }
}

/// Attributes every node exposes.
pub trait Metadata {
    fn name(&self) -> &str;
    fn tree_hash(&self) -> &Hash;
    fn content_hash(&self) -> &Hash;
    fn mod_time(&self) -> DateTime<Utc>;
    fn kind(&self) -> NodeKind;
    fn inode(&self) -> Inode;
    fn size(&self) -> u64;
    fn path(&self) -> String;
}

/// Nodes that live at a position in the tree.
pub trait Hierarchy: Metadata {
    /// Parent directory path; `None` for the root directory.
    fn parent_path(&self) -> Option<&str>;

    /// Re-attach below `parent`. Recomputes the tree hash.
    fn set_parent_path(&mut self, parent: &str);
}

/// Tree nodes a caller may rename or re-time. Renaming recomputes the tree
/// hash; the modification time is not part of it.
pub trait Settable: Hierarchy {
    fn set_name(&mut self, name: &str);
    fn set_mod_time(&mut self, mod_time: DateTime<Utc>);
}

/// Path of a node given its (possibly empty) parent path and name.
pub(crate) fn node_path(parent_path: &str, name: &str) -> String {
    if parent_path.is_empty() && name.is_empty() {
        path::ROOT.to_string()
    } else {
        path::join(parent_path, name)
    }
}

/// Any node that can be stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    File(File),
    Directory(Directory),
    Commit(Commit),
    Ghost(Ghost),
}

impl Node {
    pub fn is_ghost(&self) -> bool {
        matches!(self, Node::Ghost(_))
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Node::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    pub fn into_directory(self) -> Result<Directory> {
        match self {
            Node::Directory(dir) => Ok(dir),
            other => Err(CoreError::bad_node(format!(
                "expected directory, got {} at {}",
                other.kind(),
                other.path()
            ))),
        }
    }

    pub fn into_file(self) -> Result<File> {
        match self {
            Node::File(file) => Ok(file),
            other => Err(CoreError::bad_node(format!(
                "expected file, got {} at {}",
                other.kind(),
                other.path()
            ))),
        }
    }

    pub fn into_commit(self) -> Result<Commit> {
        match self {
            Node::Commit(commit) => Ok(commit),
            other => Err(CoreError::bad_node(format!(
                "expected commit, got {}",
                other.kind()
            ))),
        }
    }

    pub fn into_ghost(self) -> Result<Ghost> {
        match self {
            Node::Ghost(ghost) => Ok(ghost),
            other => Err(CoreError::bad_node(format!(
                "expected ghost, got {} at {}",
                other.kind(),
                other.path()
            ))),
        }
    }

    /// Parent path for tree nodes; `None` for the root and for commits.
    pub fn parent_path(&self) -> Option<&str> {
        match self {
            Node::File(file) => file.parent_path(),
            Node::Directory(dir) => dir.parent_path(),
            Node::Ghost(ghost) => ghost.parent_path(),
            Node::Commit(_) => None,
        }
    }

    /// Capability view for nodes that live in the tree.
    pub fn as_hierarchy_mut(&mut self) -> Option<&mut dyn Hierarchy> {
        match self {
            Node::File(file) => Some(file),
            Node::Directory(dir) => Some(dir),
            Node::Ghost(ghost) => Some(ghost),
            Node::Commit(_) => None,
        }
    }

    /// Re-attach a tree node below `parent`; commits have no position.
    pub fn set_parent_path(&mut self, parent: &str) -> Result<()> {
        match self.as_hierarchy_mut() {
            Some(node) => {
                node.set_parent_path(parent);
                Ok(())
            }
            None => Err(CoreError::bad_node("commits have no parent path")),
        }
    }

    /// Depth derived from the path; the root has depth 0.
    pub fn depth(&self) -> usize {
        path::depth(&self.path())
    }
}

impl Metadata for Node {
    fn name(&self) -> &str {
        match self {
            Node::File(n) => n.name(),
            Node::Directory(n) => n.name(),
            Node::Commit(n) => n.name(),
            Node::Ghost(n) => n.name(),
        }
    }

    fn tree_hash(&self) -> &Hash {
        match self {
            Node::File(n) => n.tree_hash(),
            Node::Directory(n) => n.tree_hash(),
            Node::Commit(n) => n.tree_hash(),
            Node::Ghost(n) => n.tree_hash(),
        }
    }

    fn content_hash(&self) -> &Hash {
        match self {
            Node::File(n) => n.content_hash(),
            Node::Directory(n) => n.content_hash(),
            Node::Commit(n) => n.content_hash(),
            Node::Ghost(n) => n.content_hash(),
        }
    }

    fn mod_time(&self) -> DateTime<Utc> {
        match self {
            Node::File(n) => n.mod_time(),
            Node::Directory(n) => n.mod_time(),
            Node::Commit(n) => n.mod_time(),
            Node::Ghost(n) => n.mod_time(),
        }
    }

    fn kind(&self) -> NodeKind {
        match self {
            Node::File(_) => NodeKind::File,
            Node::Directory(_) => NodeKind::Directory,
            Node::Commit(_) => NodeKind::Commit,
            Node::Ghost(_) => NodeKind::Ghost,
        }
    }

    fn inode(&self) -> Inode {
        match self {
            Node::File(n) => n.inode(),
            Node::Directory(n) => n.inode(),
            Node::Commit(n) => n.inode(),
            Node::Ghost(n) => n.inode(),
        }
    }

    fn size(&self) -> u64 {
        match self {
            Node::File(n) => n.size(),
            Node::Directory(n) => n.size(),
            Node::Commit(n) => n.size(),
            Node::Ghost(n) => n.size(),
        }
    }

    fn path(&self) -> String {
        match self {
            Node::File(n) => n.path(),
            Node::Directory(n) => n.path(),
            Node::Commit(n) => n.path(),
            Node::Ghost(n) => n.path(),
        }
    }
}

impl From<File> for Node {
    fn from(file: File) -> Self {
        Node::File(file)
    }
}

impl From<Directory> for Node {
    fn from(dir: Directory) -> Self {
        Node::Directory(dir)
    }
}

impl From<Commit> for Node {
    fn from(commit: Commit) -> Self {
        Node::Commit(commit)
    }
}

impl From<Ghost> for Node {
    fn from(ghost: Ghost) -> Self {
        Node::Ghost(ghost)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}, inode {})",
            self.kind(),
            self.path(),
            self.tree_hash().short(),
            self.inode()
        )
    }
}
