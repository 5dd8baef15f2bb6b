//! Staging commit, commits, checkout and refs

use super::{inode_key, tree_key, Linker, INODE, OBJECTS, REFS, STAGE, STATUS, TREE};
use crate::error::{CoreError, Result, StorageError};
use crate::node::{decode, encode, walk, Author, Commit, Directory, Metadata, Node, WalkOrder};
use crate::types::Hash;
use tracing::{debug, info, instrument};

/// Refs managed by the linker itself.
pub const HEAD: &str = "head";
pub const CURR: &str = "curr";

impl Linker {
    /// The staging commit, created on first use.
    ///
    /// A fresh staging commit inherits HEAD's root, or gets a new empty root
    /// directory when nothing was ever committed.
    pub fn status(&self) -> Result<Commit> {
        match self.kv.get(&[STAGE, STATUS]) {
            Ok(bytes) => return decode(&bytes)?.into_commit(),
            Err(StorageError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let status = self.in_batch(|lkr| {
            let mut status = Commit::new(lkr.next_inode()?);
            match lkr.head_opt()? {
                Some(head) => {
                    status.set_root(head.root().clone())?;
                    status.set_parent(Some(head.tree_hash().clone()))?;
                    status.set_index(head.index() + 1)?;
                }
                None => {
                    let root = Node::Directory(Directory::root(lkr.next_inode()?));
                    lkr.stage_detached(&root)?;
                    status.set_root(root.tree_hash().clone())?;
                }
            }
            lkr.save_status(&status)?;
            Ok(status)
        })?;
        debug!(root = %status.root().short(), "Created staging commit");
        Ok(status)
    }

    pub(crate) fn save_status(&self, status: &Commit) -> Result<()> {
        let node = Node::Commit(status.clone());
        self.kv.put(&encode(&node)?, &[STAGE, STATUS])?;
        self.save_ref(CURR, &status.compute_hash())
    }

    /// Most recent finalized commit.
    pub fn head(&self) -> Result<Commit> {
        let hash = self.resolve_ref(HEAD)?;
        self.commit_by_hash(&hash)
    }

    fn head_opt(&self) -> Result<Option<Commit>> {
        match self.head() {
            Ok(head) => Ok(Some(head)),
            Err(CoreError::NoSuchRef(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether the staged tree differs from HEAD.
    ///
    /// Without a HEAD, any child below the root counts as a change.
    pub fn have_staged_changes(&self) -> Result<bool> {
        let status = self.status()?;
        match self.head_opt()? {
            Some(head) => Ok(head.root() != status.root()),
            None => Ok(!self.directory_by_hash(status.root())?.is_empty()),
        }
    }

    /// Turn the staged tree into a finalized commit and start a new staging
    /// commit on top of it.
    #[instrument(skip(self, author), fields(author = %author.name))]
    pub fn make_commit(&mut self, author: &Author, message: &str) -> Result<Commit> {
        let mut status = self.status()?;
        let head = self.head_opt()?;
        if let Some(head) = &head {
            if head.root() == status.root() {
                return Err(CoreError::NoChange);
            }
        }

        let (node, persisted) = self.in_batch(|lkr| {
            let kv = lkr.kv();
            let root = lkr.directory_by_hash(status.root())?;
            let mut persisted = 0usize;
            for item in walk(lkr, Node::Directory(root), WalkOrder::PreOrder) {
                let node = item?;
                let hex = node.tree_hash().to_hex();
                let bytes = match kv.get(&[STAGE, OBJECTS, &hex]) {
                    Ok(bytes) => bytes,
                    Err(StorageError::NotFound(_)) => continue,
                    Err(e) => return Err(e.into()),
                };
                kv.put(&bytes, &[OBJECTS, &hex])?;
                let is_dir = matches!(node, Node::Directory(_))
                    || matches!(&node, Node::Ghost(g) if g.old_node().as_directory().is_some());
                kv.put(
                    node.tree_hash().as_bytes(),
                    &[TREE, &tree_key(&node.path(), is_dir)],
                )?;
                persisted += 1;
            }

            status.set_parent(head.as_ref().map(|h| h.tree_hash().clone()))?;
            status.set_index(head.as_ref().map_or(0, |h| h.index() + 1))?;
            status.set_author(author.clone())?;
            status.set_message(message)?;
            status.finalize()?;

            let node = Node::Commit(status.clone());
            kv.put(&encode(&node)?, &[OBJECTS, &status.tree_hash().to_hex()])?;
            lkr.save_ref(HEAD, status.tree_hash())?;
            kv.clear(&[STAGE, OBJECTS])?;
            kv.clear(&[STAGE, TREE])?;

            let mut next = Commit::new(lkr.next_inode()?);
            next.set_root(status.root().clone())?;
            next.set_parent(Some(status.tree_hash().clone()))?;
            next.set_index(status.index() + 1)?;
            lkr.save_status(&next)?;
            Ok((node, persisted))
        })?;

        self.index.write().remember(node);
        info!(
            commit = %status.tree_hash().short(),
            index = status.index(),
            persisted,
            "Created commit"
        );
        Ok(status)
    }

    /// Reset the staged tree to the tree of `commit`.
    ///
    /// Fails with `StageNotEmpty` when there are uncommitted changes and
    /// `force` is false.
    #[instrument(skip(self, commit), fields(commit = %commit.tree_hash().short()))]
    pub fn checkout_commit(&mut self, commit: &Commit, force: bool) -> Result<()> {
        if !force && self.have_staged_changes()? {
            return Err(CoreError::StageNotEmpty);
        }

        self.in_batch(|lkr| {
            let kv = lkr.kv();
            let mut status = lkr.status()?;
            status.set_root(commit.root().clone())?;
            kv.clear(&[STAGE, OBJECTS])?;
            kv.clear(&[STAGE, TREE])?;
            lkr.save_status(&status)?;
            lkr.clear_caches();

            // inode ids must point at the checked out versions
            let root = lkr.directory_by_hash(commit.root())?;
            for item in walk(lkr, Node::Directory(root), WalkOrder::PreOrder) {
                let node = item?;
                if node.is_ghost() {
                    continue;
                }
                kv.put(node.tree_hash().as_bytes(), &[INODE, &inode_key(node.inode())])?;
            }
            Ok(())
        })?;
        self.clear_caches();
        info!("Checked out commit");
        Ok(())
    }

    /// Restage the version of `node` recorded in `commit`.
    ///
    /// The historical node takes the place of the current one in its parent,
    /// and the ancestors are restaged as for [`Linker::stage_node`].
    #[instrument(skip(self, commit, node), fields(path = %node.path()))]
    pub fn checkout_file(&mut self, commit: &Commit, node: &Node) -> Result<()> {
        let node_path = node.path();
        let old = self.lookup_node_at(commit, &node_path)?;
        if old.is_ghost() {
            return Err(CoreError::NoSuchFile(node_path));
        }
        self.stage_node(&old)
    }

    /// Commits from `start` back to the first one, newest first.
    pub fn log(&self, start: &Commit) -> Result<Vec<Commit>> {
        let mut commits = vec![start.clone()];
        let mut curr = start.clone();
        while let Some(parent) = curr.parent().cloned() {
            curr = self.commit_by_hash(&parent)?;
            commits.push(curr.clone());
        }
        Ok(commits)
    }

    /// Finalized commit with the given index, searched from HEAD.
    pub fn commit_by_index(&self, index: u64) -> Result<Option<Commit>> {
        let head = match self.head_opt()? {
            Some(head) => head,
            None => return Ok(None),
        };
        Ok(self.log(&head)?.into_iter().find(|c| c.index() == index))
    }

    pub fn resolve_ref(&self, name: &str) -> Result<Hash> {
        let name = name.to_lowercase();
        match self.kv.get(&[REFS, &name]) {
            Ok(bytes) => Ok(Hash::from_bytes(bytes)),
            Err(StorageError::NotFound(_)) => Err(CoreError::NoSuchRef(name)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_ref(&self, name: &str, hash: &Hash) -> Result<()> {
        self.kv.put(hash.as_bytes(), &[REFS, &name.to_lowercase()])?;
        Ok(())
    }

    /// Delete a user ref. `head` and `curr` cannot be removed.
    pub fn remove_ref(&self, name: &str) -> Result<()> {
        let name = name.to_lowercase();
        if name == HEAD || name == CURR {
            return Err(CoreError::Conflict(format!("ref '{}' is reserved", name)));
        }
        match self.kv.erase(&[REFS, &name]) {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound(_)) => Err(CoreError::NoSuchRef(name)),
            Err(e) => Err(e.into()),
        }
    }

    /// All refs, sorted by name.
    pub fn list_refs(&self) -> Result<Vec<(String, Hash)>> {
        let mut refs = Vec::new();
        for name in self.kv.keys(&[REFS])? {
            let hash = self.resolve_ref(&name)?;
            refs.push((name, hash));
        }
        Ok(refs)
    }

    /// Resolve `name` with optional trailing `^` parent steps (`head^^`).
    ///
    /// `curr` resolves to the staging commit itself.
    pub fn resolve_commit_ref(&self, spec: &str) -> Result<Commit> {
        let name = spec.trim_end_matches('^');
        let steps = spec.len() - name.len();

        let mut commit = if name.eq_ignore_ascii_case(CURR) {
            self.status()?
        } else {
            self.commit_by_hash(&self.resolve_ref(name)?)?
        };
        for _ in 0..steps {
            let parent = commit
                .parent()
                .cloned()
                .ok_or_else(|| CoreError::NoSuchRef(spec.to_string()))?;
            commit = self.commit_by_hash(&parent)?;
        }
        Ok(commit)
    }
}
