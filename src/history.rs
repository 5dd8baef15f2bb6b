//! History of a single node across the commit chain
//!
//! The walker follows a node backwards through parent commits by inode, so
//! renames and content changes are tracked even though every version has a
//! different tree hash. Each step reports how the node at that commit differs
//! from its version in the parent commit.

use crate::error::{CoreError, Result};
use crate::linker::Linker;
use crate::node::{walk, Commit, Metadata, Node, WalkOrder};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

bitflags! {
    /// Set of change bits for one history step.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ChangeMask: u8 {
        const ADD = 1;
        const MODIFY = 1 << 1;
        const MOVE = 1 << 2;
        const REMOVE = 1 << 3;
    }
}

impl ChangeMask {
    /// No difference to the parent commit.
    pub const NONE: ChangeMask = ChangeMask::empty();
}

impl fmt::Display for ChangeMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names = [
            (ChangeMask::ADD, "added"),
            (ChangeMask::MODIFY, "modified"),
            (ChangeMask::MOVE, "moved"),
            (ChangeMask::REMOVE, "removed"),
        ];
        let parts: Vec<&str> = names
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&parts.join("|"))
    }
}

/// One step of a node's history.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Commit this step describes.
    pub commit: Commit,
    /// Path the node had before this commit; its own path for an add.
    pub path: String,
    pub mask: ChangeMask,
    /// Version of the node in `commit`.
    pub node: Node,
}

/// Difference between a node and its version in the parent commit.
fn diff(curr: &Node, prev: &Node) -> ChangeMask {
    let mut mask = ChangeMask::NONE;
    if curr.is_ghost() != prev.is_ghost() {
        mask |= ChangeMask::REMOVE;
    }
    if curr.path() != prev.path() {
        mask |= ChangeMask::MOVE;
    }
    if curr.content_hash() != prev.content_hash() {
        mask |= ChangeMask::MODIFY;
    }
    mask
}

/// Pull-based iterator over the history of one node, newest first.
///
/// The first step always carries [`ChangeMask::NONE`]; the walk ends with
/// the commit where the node appeared, reported as [`ChangeMask::ADD`].
pub struct HistoryWalker<'a> {
    linker: &'a Linker,
    commit: Option<Commit>,
    node: Node,
    first: bool,
}

impl<'a> HistoryWalker<'a> {
    /// Walk the history of `node`, which must be its version in `start`.
    pub fn new(linker: &'a Linker, start: Commit, node: Node) -> Self {
        Self {
            linker,
            commit: Some(start),
            node,
            first: true,
        }
    }

    /// Walk from the staging commit, starting with the node at `path`.
    pub fn from_path(linker: &'a Linker, path: &str) -> Result<Self> {
        let status = linker.status()?;
        let node = linker.lookup_node(path)?;
        Ok(Self::new(linker, status, node))
    }

    /// Version of `curr` in `parent`, found by inode.
    ///
    /// Live nodes win over ghosts sharing the inode, so a node moved back to
    /// a path its own ghost still occupies is found at its live location.
    fn find_in(&self, parent: &Commit, curr: &Node) -> Result<Option<Node>> {
        match self.linker.lookup_node_at(parent, &curr.path()) {
            Ok(node) if node.inode() == curr.inode() && !node.is_ghost() => return Ok(Some(node)),
            Ok(_) | Err(CoreError::NoSuchFile(_)) => {}
            Err(e) => return Err(e),
        }

        let root = self.linker.directory_by_hash(parent.root())?;
        let mut ghost = None;
        for item in walk(self.linker, Node::Directory(root), WalkOrder::PreOrder) {
            let node = item?;
            if node.inode() != curr.inode() {
                continue;
            }
            if node.is_ghost() {
                ghost.get_or_insert(node);
            } else {
                return Ok(Some(node));
            }
        }
        Ok(ghost)
    }

    fn step(&mut self, commit: Commit) -> Result<Change> {
        let curr = self.node.clone();
        let first = std::mem::replace(&mut self.first, false);

        let prev = match commit.parent() {
            Some(parent) => {
                let parent = self.linker.commit_by_hash(parent)?;
                self.find_in(&parent, &curr)?.map(|node| (parent, node))
            }
            None => None,
        };

        let (parent, prev) = match prev {
            Some(found) => found,
            None => {
                let mask = if first { ChangeMask::NONE } else { ChangeMask::ADD };
                trace!(commit = %commit.compute_hash().short(), %mask, "History reached origin");
                return Ok(Change {
                    path: curr.path(),
                    commit,
                    mask,
                    node: curr,
                });
            }
        };

        let mask = if first { ChangeMask::NONE } else { diff(&curr, &prev) };
        let path = prev.path();
        trace!(commit = %commit.compute_hash().short(), %mask, path = %path, "History step");

        self.node = match prev {
            Node::Ghost(ghost) => ghost.into_old_node(),
            live => live,
        };
        self.commit = Some(parent);
        Ok(Change {
            commit,
            path,
            mask,
            node: curr,
        })
    }
}

impl Iterator for HistoryWalker<'_> {
    type Item = Result<Change>;

    fn next(&mut self) -> Option<Self::Item> {
        let commit = self.commit.take()?;
        Some(self.step(commit))
    }
}

/// Collect the full history of `node` starting at `start`.
pub fn history(linker: &Linker, start: Commit, node: Node) -> Result<Vec<Change>> {
    HistoryWalker::new(linker, start, node).collect()
}
