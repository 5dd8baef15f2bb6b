//! Property-based tests for determinism guarantees

use proptest::prelude::*;
use std::collections::BTreeMap;
use treeline::node::{decode, encode};
use treeline::{Author, Commit, Directory, File, Hash, Metadata, Node};

fn file(name: &str, inode: u64, content: &[u8]) -> Node {
    let mut file = File::new(name, inode);
    file.set_content(Hash::sum(content), content.len() as u64);
    Node::File(file)
}

/// Distinct child names with some content each.
fn children() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map("[a-z]{1,8}", any::<Vec<u8>>(), 1..12)
}

/// Test that directory hashes do not depend on insertion order
#[test]
fn test_directory_order_independence() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(children(), any::<u64>()), |(entries, seed)| {
            let nodes: Vec<Node> = entries
                .iter()
                .enumerate()
                .map(|(i, (name, content))| file(name, i as u64 + 2, content))
                .collect();

            let mut forward = Directory::root(1);
            for node in &nodes {
                forward.add(&mut node.clone()).unwrap();
            }

            // deterministic shuffle driven by the seed
            let mut shuffled = nodes.clone();
            let len = shuffled.len();
            for i in 0..len {
                let j = ((seed.rotate_left(i as u32) as usize) ^ i) % len;
                shuffled.swap(i, j);
            }
            let mut backward = Directory::root(1);
            for node in &shuffled {
                backward.add(&mut node.clone()).unwrap();
            }

            prop_assert_eq!(forward.tree_hash(), backward.tree_hash());
            prop_assert_eq!(forward.content_hash(), backward.content_hash());
            prop_assert_eq!(forward.size(), backward.size());
            Ok(())
        })
        .unwrap();
}

/// Test that remove_child exactly undoes add
#[test]
fn test_add_remove_inverse() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(children(), any::<Vec<u8>>()), |(entries, extra)| {
            let mut dir = Directory::root(1);
            for (i, (name, content)) in entries.iter().enumerate() {
                dir.add(&mut file(name, i as u64 + 2, content)).unwrap();
            }
            let tree_hash = dir.tree_hash().clone();
            let content_hash = dir.content_hash().clone();
            let size = dir.size();

            // uppercase never collides with the generated names
            dir.add(&mut file("EXTRA", 999, &extra)).unwrap();
            dir.remove_child("EXTRA").unwrap();

            prop_assert_eq!(dir.tree_hash(), &tree_hash);
            prop_assert_eq!(dir.content_hash(), &content_hash);
            prop_assert_eq!(dir.size(), size);
            Ok(())
        })
        .unwrap();
}

/// Test that commit hashes depend only on parent, root, author and message
#[test]
fn test_commit_determinism() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(any::<Vec<u8>>(), any::<Vec<u8>>(), ".{0,16}", ".{0,32}"),
            |(parent, root, author, message)| {
                let build = |inode| {
                    let mut commit = Commit::new(inode);
                    commit.set_parent(Some(Hash::sum(&parent))).unwrap();
                    commit.set_root(Hash::sum(&root)).unwrap();
                    commit.set_author(Author::new(&author)).unwrap();
                    commit.set_message(&message).unwrap();
                    commit.finalize().unwrap();
                    commit
                };
                let first = build(1);
                let second = build(2);
                prop_assert_eq!(first.tree_hash(), second.tree_hash());
                prop_assert_eq!(first.tree_hash(), &first.compute_hash());
                Ok(())
            },
        )
        .unwrap();
}

/// Test that every node kind survives encode/decode unchanged
#[test]
fn test_encoding_preserves_files() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &("[a-z]{1,12}", any::<u64>(), any::<Vec<u8>>(), any::<Vec<u8>>()),
            |(name, inode, content, key)| {
                let mut file = File::new(&name, inode);
                file.set_content(Hash::sum(&content), content.len() as u64);
                file.set_content_key(key);
                let node = Node::File(file);
                let decoded = decode(&encode(&node).unwrap()).unwrap();
                prop_assert_eq!(decoded, node);
                Ok(())
            },
        )
        .unwrap();
}

/// Test that distinct content gives distinct file hashes
#[test]
fn test_different_content_different_hash() {
    let a = file("same", 1, b"alpha");
    let b = file("same", 1, b"beta");
    assert_ne!(a.tree_hash(), b.tree_hash());
    assert_ne!(a.content_hash(), b.content_hash());
}
