//! Mark-and-sweep collection of unreachable objects

use crate::config::GcConfig;
use crate::error::Result;
use crate::linker::{Linker, OBJECTS, STAGE};
use crate::node::{decode, walk_with, Metadata, Node, WalkOrder};
use crate::store::Batch;
use crate::types::Hash;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Outcome of one collection run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GcStats {
    pub marked: usize,
    pub removed_staged: usize,
    pub removed_permanent: usize,
    /// Unreachable objects spared by the keep predicate.
    pub kept: usize,
}

impl GcStats {
    pub fn removed(&self) -> usize {
        self.removed_staged + self.removed_permanent
    }
}

type KeepFn<'a> = Box<dyn Fn(&Node) -> bool + Send + Sync + 'a>;

/// Collector bound to one linker.
///
/// Must not run while the same linker is staging or committing; read-only
/// lookups may proceed in parallel.
pub struct GarbageCollector<'a> {
    linker: &'a Linker,
    keep: Option<KeepFn<'a>>,
}

impl<'a> GarbageCollector<'a> {
    pub fn new(linker: &'a Linker) -> Self {
        Self { linker, keep: None }
    }

    /// Veto hook: unreachable objects for which `keep` returns true survive.
    pub fn with_keep<F>(mut self, keep: F) -> Self
    where
        F: Fn(&Node) -> bool + Send + Sync + 'a,
    {
        self.keep = Some(Box::new(keep));
        self
    }

    /// Mark from the staging commit and sweep.
    ///
    /// With `all_objects` the whole commit chain is marked and the permanent
    /// bucket is swept too; otherwise only staged objects are candidates.
    #[instrument(skip(self))]
    pub fn run(&self, all_objects: bool) -> Result<GcStats> {
        let marked = self.mark(all_objects)?;
        let mut stats = GcStats {
            marked: marked.len(),
            ..GcStats::default()
        };

        let kv = self.linker.kv();
        let batch = Batch::new(kv);
        let (removed, kept) = self.sweep(&[STAGE, OBJECTS], &marked)?;
        stats.removed_staged = removed;
        stats.kept += kept;
        if all_objects {
            let (removed, kept) = self.sweep(&[OBJECTS], &marked)?;
            stats.removed_permanent = removed;
            stats.kept += kept;
        }
        batch.flush()?;

        info!(
            marked = stats.marked,
            removed_staged = stats.removed_staged,
            removed_permanent = stats.removed_permanent,
            kept = stats.kept,
            "Garbage collection finished"
        );
        Ok(stats)
    }

    /// [`GarbageCollector::run`] with the `gc` section of the configuration.
    pub fn run_configured(&self, config: &GcConfig) -> Result<GcStats> {
        self.run(config.aggressive)
    }

    fn mark(&self, all_objects: bool) -> Result<HashSet<Hash>> {
        let mut marked = HashSet::new();
        let status = self.linker.status()?;
        marked.insert(status.compute_hash());
        self.mark_tree(status.root(), &mut marked)?;

        if all_objects {
            let mut parent = status.parent().cloned();
            while let Some(hash) = parent {
                let commit = self.linker.commit_by_hash(&hash)?;
                marked.insert(hash);
                self.mark_tree(commit.root(), &mut marked)?;
                parent = commit.parent().cloned();
            }
        }
        debug!(marked = marked.len(), "Marked reachable objects");
        Ok(marked)
    }

    fn mark_tree(&self, root: &Hash, marked: &mut HashSet<Hash>) -> Result<()> {
        // subtrees are shared between commits; skip the ones already seen
        if marked.contains(root) {
            return Ok(());
        }
        let root = Node::Directory(self.linker.directory_by_hash(root)?);
        walk_with(self.linker, root, WalkOrder::PreOrder, |node| {
            marked.insert(node.tree_hash().clone());
            if let Node::Ghost(ghost) = node {
                marked.insert(ghost.old_node().tree_hash().clone());
            }
            Ok(())
        })
    }

    /// Returns (removed, kept) for one bucket.
    fn sweep(&self, bucket: &[&str], marked: &HashSet<Hash>) -> Result<(usize, usize)> {
        let kv = self.linker.kv();
        let mut removed = 0;
        let mut kept = 0;
        for name in kv.keys(bucket)? {
            let hash = match Hash::from_hex(&name) {
                Ok(hash) => hash,
                Err(e) => {
                    warn!(key = %name, error = %e, "Skipping malformed object key");
                    continue;
                }
            };
            if marked.contains(&hash) {
                continue;
            }

            let mut key = bucket.to_vec();
            key.push(&name);
            let node = decode(&kv.get(&key)?)?;
            if self.keep.as_ref().map_or(false, |keep| keep(&node)) {
                kept += 1;
                continue;
            }
            self.linker.purge_cached(&node);
            kv.erase(&key)?;
            debug!(hash = %hash.short(), kind = %node.kind(), "Collected object");
            removed += 1;
        }
        Ok((removed, kept))
    }
}
