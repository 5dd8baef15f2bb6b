//! Lazy pre-order and post-order traversal of a node and its descendants
//!
//! Children are stored as hashes, so the walk resolves them through a
//! [`NodeResolver`] as it goes. Ghosts are visited but never descended into.

use crate::error::{CoreError, Result};
use crate::node::{Metadata, Node};
use crate::types::Hash;

/// Anything that can turn a tree hash back into a node.
pub trait NodeResolver {
    fn resolve_hash(&self, hash: &Hash) -> Result<Option<Node>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOrder {
    /// Parents before their children.
    PreOrder,
    /// Children before their parents.
    PostOrder,
}

enum Frame {
    Pending(Node),
    Expanded(Node),
}

/// Iterator over a subtree.
pub struct Walk<'a, R: NodeResolver + ?Sized> {
    resolver: &'a R,
    order: WalkOrder,
    stack: Vec<Frame>,
}

/// Start a lazy traversal rooted at `node`.
pub fn walk<R: NodeResolver + ?Sized>(resolver: &R, node: Node, order: WalkOrder) -> Walk<'_, R> {
    Walk {
        resolver,
        order,
        stack: vec![Frame::Pending(node)],
    }
}

/// Eager traversal calling `visit` once per node; stops at the first error.
pub fn walk_with<R, F>(resolver: &R, node: Node, order: WalkOrder, mut visit: F) -> Result<()>
where
    R: NodeResolver + ?Sized,
    F: FnMut(&Node) -> Result<()>,
{
    for item in walk(resolver, node, order) {
        visit(&item?)?;
    }
    Ok(())
}

impl<'a, R: NodeResolver + ?Sized> Walk<'a, R> {
    fn children_of(&self, node: &Node) -> Result<Vec<Node>> {
        let dir = match node {
            Node::Directory(dir) => dir,
            _ => return Ok(Vec::new()),
        };
        let mut children = Vec::with_capacity(dir.len());
        for (name, hash) in dir.children() {
            match self.resolver.resolve_hash(hash)? {
                Some(child) => children.push(child),
                None => {
                    return Err(CoreError::NotFound(format!(
                        "child {} ({}) of {}",
                        name,
                        hash.short(),
                        dir.path()
                    )))
                }
            }
        }
        Ok(children)
    }

    fn push_children(&mut self, node: &Node) -> Result<()> {
        let children = self.children_of(node)?;
        // Reversed so that children pop off the stack in name order.
        for child in children.into_iter().rev() {
            self.stack.push(Frame::Pending(child));
        }
        Ok(())
    }
}

impl<'a, R: NodeResolver + ?Sized> Iterator for Walk<'a, R> {
    type Item = Result<Node>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.pop()?;
            match (self.order, frame) {
                (WalkOrder::PreOrder, Frame::Pending(node)) => {
                    if let Err(e) = self.push_children(&node) {
                        self.stack.clear();
                        return Some(Err(e));
                    }
                    return Some(Ok(node));
                }
                (WalkOrder::PostOrder, Frame::Pending(node)) => {
                    let children = match self.children_of(&node) {
                        Ok(children) => children,
                        Err(e) => {
                            self.stack.clear();
                            return Some(Err(e));
                        }
                    };
                    self.stack.push(Frame::Expanded(node));
                    for child in children.into_iter().rev() {
                        self.stack.push(Frame::Pending(child));
                    }
                }
                (_, Frame::Expanded(node)) => return Some(Ok(node)),
            }
        }
    }
}
