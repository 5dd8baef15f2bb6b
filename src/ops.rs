//! Filesystem-style operations on top of the linker
//!
//! These are the helpers filesystem-facing callers use: create directories,
//! stage file content, remove and move nodes. Removals and moves leave a
//! [`Ghost`] behind so history can follow the node.

use crate::error::{CoreError, Result};
use crate::linker::Linker;
use crate::node::{path, Directory, File, Ghost, Hierarchy, Metadata, Node, Settable};
use crate::types::Hash;
use chrono::Utc;
use tracing::{debug, info};

/// Live node at `node_path`, or `None` if the path is free or ghosted.
fn live_node(lkr: &Linker, node_path: &str) -> Result<Option<Node>> {
    match lkr.lookup_node(node_path) {
        Ok(Node::Ghost(_)) | Err(CoreError::NoSuchFile(_)) => Ok(None),
        Ok(node) => Ok(Some(node)),
        Err(e) => Err(e),
    }
}

fn parent_directory(lkr: &Linker, node_path: &str) -> Result<Directory> {
    let parent = path::parent_of(node_path)
        .ok_or_else(|| CoreError::bad_node("the root directory has no parent"))?;
    match live_node(lkr, &parent)? {
        Some(Node::Directory(dir)) => Ok(dir),
        Some(other) => Err(CoreError::bad_node(format!("{} is not a directory", other.path()))),
        None => Err(CoreError::NoSuchFile(parent)),
    }
}

/// Create the directory at `node_path`.
///
/// With `parents`, missing ancestors are created and an existing directory
/// is returned as is.
pub fn mkdir(lkr: &mut Linker, node_path: &str, parents: bool) -> Result<Directory> {
    let node_path = path::clean(node_path);
    match live_node(lkr, &node_path)? {
        Some(Node::Directory(dir)) if parents => return Ok(dir),
        Some(_) => return Err(CoreError::AlreadyExists(node_path)),
        None => {}
    }

    let parent = match parent_directory(lkr, &node_path) {
        Err(CoreError::NoSuchFile(missing)) if parents => mkdir(lkr, &missing, true)?,
        other => other?,
    };

    let mut dir = Directory::new(&path::base_name(&node_path), lkr.next_inode()?);
    dir.set_parent_path(&parent.path());
    let node = Node::Directory(dir);
    lkr.stage_node(&node)?;
    debug!(path = %node_path, "Created directory");
    node.into_directory()
}

/// Create or update the file at `node_path`.
///
/// A file re-created over the ghost of a removed file keeps that file's
/// inode, so its history continues across the removal.
pub fn stage_file(
    lkr: &mut Linker,
    node_path: &str,
    content_hash: Hash,
    size: u64,
    key: Vec<u8>,
) -> Result<File> {
    let node_path = path::clean(node_path);
    let mut file = match lkr.lookup_node(&node_path) {
        Ok(Node::File(file)) => file,
        Ok(Node::Directory(_)) => {
            return Err(CoreError::bad_node(format!("{} is a directory", node_path)))
        }
        Ok(Node::Ghost(ghost)) if ghost.moved_to().is_none() => match ghost.into_old_node() {
            Node::File(file) => file,
            _ => new_file(lkr, &node_path)?,
        },
        Ok(_) | Err(CoreError::NoSuchFile(_)) => new_file(lkr, &node_path)?,
        Err(e) => return Err(e),
    };

    file.set_content(content_hash, size);
    file.set_content_key(key);
    file.set_mod_time(Utc::now());
    let node = Node::File(file);
    lkr.stage_node(&node)?;
    debug!(path = %node_path, size, "Staged file");
    node.into_file()
}

fn new_file(lkr: &Linker, node_path: &str) -> Result<File> {
    let parent = parent_directory(lkr, node_path)?;
    let mut file = File::new(&path::base_name(node_path), lkr.next_inode()?);
    file.set_parent_path(&parent.path());
    Ok(file)
}

/// Replace the node at `node_path` with a ghost.
pub fn remove(lkr: &mut Linker, node_path: &str) -> Result<Ghost> {
    let node_path = path::clean(node_path);
    let node = live_node(lkr, &node_path)?.ok_or_else(|| CoreError::NoSuchFile(node_path.clone()))?;
    if node.parent_path().is_none() {
        return Err(CoreError::bad_node("cannot remove the root directory"));
    }
    let ghost = Node::Ghost(Ghost::new(node, None)?);
    lkr.stage_node(&ghost)?;
    info!(path = %node_path, "Removed node");
    ghost.into_ghost()
}

/// Move the node at `src` to `dst`.
///
/// If `dst` is a directory the node is moved beneath it. The node keeps its
/// inode; a ghost pointing at the new version stays behind at `src`.
/// Returns the node at its new location.
pub fn mv(lkr: &mut Linker, src: &str, dst: &str) -> Result<Node> {
    let src = path::clean(src);
    let node = live_node(lkr, &src)?.ok_or_else(|| CoreError::NoSuchFile(src.clone()))?;
    if node.parent_path().is_none() {
        return Err(CoreError::bad_node("cannot move the root directory"));
    }

    let mut dst = path::clean(dst);
    if let Some(Node::Directory(_)) = live_node(lkr, &dst)? {
        dst = path::join(&dst, node.name());
    }
    if dst == src {
        return Ok(node);
    }
    if dst.starts_with(&format!("{}/", src)) {
        return Err(CoreError::bad_node(format!("cannot move {} into itself", src)));
    }
    if live_node(lkr, &dst)?.is_some() {
        return Err(CoreError::AlreadyExists(dst));
    }

    let parent = parent_directory(lkr, &dst)?;
    let moved = repath(lkr, node.clone(), &parent.path(), &path::base_name(&dst))?;
    lkr.stage_node(&moved)?;

    let ghost = Node::Ghost(Ghost::new(node, Some(moved.tree_hash().clone()))?);
    lkr.stage_node(&ghost)?;
    info!(from = %src, to = %dst, "Moved node");
    Ok(moved)
}

/// Give `node` a new name and parent; directory contents follow.
///
/// Children are staged without touching ancestors; the caller stages the
/// returned node, which carries the updated child hashes.
fn place<T: Settable>(node: &mut T, parent: &str, name: &str) {
    node.set_name(name);
    node.set_parent_path(parent);
}

fn repath(lkr: &Linker, node: Node, parent: &str, name: &str) -> Result<Node> {
    match node {
        Node::File(mut file) => {
            place(&mut file, parent, name);
            Ok(Node::File(file))
        }
        Node::Directory(dir) => {
            let children: Vec<(String, Hash)> = dir
                .children()
                .map(|(child, hash)| (child.to_string(), hash.clone()))
                .collect();
            let mut moved = dir;
            place(&mut moved, parent, name);
            let new_path = moved.path();

            for (child, hash) in children {
                let node = lkr.node_by_hash(&hash)?.ok_or_else(|| {
                    CoreError::NotFound(format!("object {} for {}", hash.short(), child))
                })?;
                let node = repath(lkr, node, &new_path, &child)?;
                lkr.stage_detached(&node)?;
                moved.replace_child(&node);
            }
            Ok(Node::Directory(moved))
        }
        Node::Ghost(mut ghost) => {
            ghost.set_parent_path(parent);
            Ok(Node::Ghost(ghost))
        }
        Node::Commit(_) => Err(CoreError::bad_node("commits have no path")),
    }
}
