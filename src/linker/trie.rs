//! Path trie for O(depth) path -> hash lookups

use crate::node::path;
use crate::types::Hash;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<String, TrieNode>,
    hash: Option<Hash>,
}

#[derive(Debug, Default)]
pub struct PathTrie {
    root: TrieNode,
}

impl PathTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node_path: &str, hash: Hash) {
        let mut curr = &mut self.root;
        for part in path::split(node_path) {
            curr = curr.children.entry(part).or_default();
        }
        curr.hash = Some(hash);
    }

    pub fn lookup(&self, node_path: &str) -> Option<&Hash> {
        let mut curr = &self.root;
        for part in path::split(node_path) {
            curr = curr.children.get(&part)?;
        }
        curr.hash.as_ref()
    }

    /// Forget the hash at `node_path`, keeping entries below it.
    pub fn remove(&mut self, node_path: &str) -> Option<Hash> {
        let mut curr = &mut self.root;
        for part in path::split(node_path) {
            curr = curr.children.get_mut(&part)?;
        }
        curr.hash.take()
    }

    pub fn clear(&mut self) {
        self.root = TrieNode::default();
    }
}
