//! Staging, commits and checkout through the linker

use super::test_utils::{commit, memory_linker, sled_linker, write};
use std::sync::Arc;
use treeline::{ops, Author, CoreError, Database, Linker, Metadata, Node};

#[test]
fn test_inode_stability_across_content_change() {
    let mut lkr = memory_linker();
    let v1 = write(&mut lkr, "/notes.txt", b"first");
    let v2 = write(&mut lkr, "/notes.txt", b"second version");

    assert_eq!(v1.inode(), v2.inode());
    assert_ne!(v1.tree_hash(), v2.tree_hash());

    let by_inode = lkr.node_by_inode(v1.inode()).unwrap().unwrap();
    assert_eq!(by_inode.tree_hash(), v2.tree_hash());
    assert!(lkr.node_by_hash(v1.tree_hash()).unwrap().is_none());

    // same answer once the caches are gone
    lkr.clear_caches();
    let by_inode = lkr.node_by_inode(v1.inode()).unwrap().unwrap();
    assert_eq!(by_inode.tree_hash(), v2.tree_hash());
    assert!(lkr.node_by_hash(v1.tree_hash()).unwrap().is_none());
}

#[test]
fn test_ancestors_restaged() {
    let mut lkr = memory_linker();
    ops::mkdir(&mut lkr, "/a/b", true).unwrap();
    let root_before = lkr.root().unwrap();
    let a_before = lkr.lookup_directory("/a").unwrap();

    write(&mut lkr, "/a/b/f", b"hello");

    let root = lkr.root().unwrap();
    let a = lkr.lookup_directory("/a").unwrap();
    let b = lkr.lookup_directory("/a/b").unwrap();
    assert_ne!(root.tree_hash(), root_before.tree_hash());
    assert_ne!(a.tree_hash(), a_before.tree_hash());
    assert_eq!(root.child("a"), Some(a.tree_hash()));
    assert_eq!(a.child("b"), Some(b.tree_hash()));
    assert_eq!(root.size(), 5);
    assert_eq!(lkr.status().unwrap().root(), root.tree_hash());
}

#[test]
fn test_no_op_commit_rejected() {
    let mut lkr = memory_linker();
    write(&mut lkr, "/a", b"a");
    commit(&mut lkr, "first");
    assert!(matches!(
        lkr.make_commit(&Author::new("tester"), "again"),
        Err(CoreError::NoChange)
    ));
}

#[test]
fn test_commit_chain() {
    let mut lkr = memory_linker();
    write(&mut lkr, "/a", b"a");
    let c1 = commit(&mut lkr, "one");
    write(&mut lkr, "/b", b"b");
    let c2 = commit(&mut lkr, "two");

    assert_eq!(c1.index(), 0);
    assert_eq!(c2.index(), 1);
    assert_eq!(c2.parent(), Some(c1.tree_hash()));
    assert_eq!(c2.author().name, "tester");
    assert_eq!(c2.message(), "two");
    assert!(!lkr.have_staged_changes().unwrap());

    let old = lkr.lookup_node_at(&c1, "/a").unwrap();
    assert_eq!(old.path(), "/a");
    assert!(matches!(
        lkr.lookup_node_at(&c1, "/b"),
        Err(CoreError::NoSuchFile(_))
    ));
}

#[test]
fn test_checkout_file_restores_old_version() {
    let mut lkr = memory_linker();
    let v1 = write(&mut lkr, "/doc", b"v1");
    let c1 = commit(&mut lkr, "one");
    write(&mut lkr, "/doc", b"version two");
    commit(&mut lkr, "two");

    let current = lkr.lookup_node("/doc").unwrap();
    lkr.checkout_file(&c1, &current).unwrap();

    let restored = lkr.lookup_node("/doc").unwrap();
    assert_eq!(restored.content_hash(), v1.content_hash());
    assert_eq!(restored.inode(), v1.inode());
    assert_eq!(lkr.root().unwrap().size(), 2);
    assert!(lkr.have_staged_changes().unwrap());
}

#[test]
fn test_checkout_file_missing_in_commit() {
    let mut lkr = memory_linker();
    write(&mut lkr, "/a", b"a");
    let c1 = commit(&mut lkr, "one");
    let b = Node::File(write(&mut lkr, "/b", b"b"));
    assert!(matches!(
        lkr.checkout_file(&c1, &b),
        Err(CoreError::NoSuchFile(_))
    ));
}

#[test]
fn test_checkout_commit_discards_stage() {
    let mut lkr = memory_linker();
    write(&mut lkr, "/a", b"a");
    let c1 = commit(&mut lkr, "one");
    write(&mut lkr, "/scratch", b"tmp");

    lkr.checkout_commit(&c1, true).unwrap();
    assert!(matches!(
        lkr.lookup_node("/scratch"),
        Err(CoreError::NoSuchFile(_))
    ));
    assert!(lkr.kv().keys(&["stage", "objects"]).unwrap().is_empty());
}

#[test]
fn test_resolve_node_sees_staged_and_committed() {
    let mut lkr = memory_linker();
    let a = write(&mut lkr, "/a", b"a");
    commit(&mut lkr, "one");
    let b = write(&mut lkr, "/b", b"b");
    lkr.clear_caches();

    let found_a = lkr.resolve_node("/a").unwrap().unwrap();
    let found_b = lkr.resolve_node("/b").unwrap().unwrap();
    assert_eq!(found_a.tree_hash(), a.tree_hash());
    assert_eq!(found_b.tree_hash(), b.tree_hash());
    assert!(lkr.resolve_node("/nope").unwrap().is_none());
    assert_eq!(lkr.resolve_node("/").unwrap().unwrap().kind(), treeline::NodeKind::Directory);
}

#[test]
fn test_state_lives_in_store() {
    let (_dir, db, mut lkr) = sled_linker();
    ops::mkdir(&mut lkr, "/docs", false).unwrap();
    let file = write(&mut lkr, "/docs/readme", b"read me");
    let head = commit(&mut lkr, "docs");
    drop(lkr);

    let kv: Arc<dyn Database> = db;
    let lkr = Linker::new(kv);
    assert_eq!(lkr.head().unwrap(), head);
    let node = lkr.lookup_node("/docs/readme").unwrap();
    assert_eq!(node.tree_hash(), file.tree_hash());
    assert_eq!(lkr.node_by_inode(file.inode()).unwrap().unwrap(), node);
}

#[test]
fn test_history_reads_do_not_shadow_live_node() {
    let mut lkr = memory_linker();
    let v1 = write(&mut lkr, "/f", b"one");
    let c1 = commit(&mut lkr, "one");
    let v2 = write(&mut lkr, "/f", b"two");
    commit(&mut lkr, "two");
    lkr.clear_caches();

    let old = lkr.lookup_node_at(&c1, "/f").unwrap();
    assert_eq!(old.tree_hash(), v1.tree_hash());

    let by_inode = lkr.node_by_inode(v1.inode()).unwrap().unwrap();
    assert_eq!(by_inode.tree_hash(), v2.tree_hash());
    let by_path = lkr.resolve_node("/f").unwrap().unwrap();
    assert_eq!(by_path.tree_hash(), v2.tree_hash());
}

#[test]
fn test_fresh_linker_after_log_walk() {
    let (_dir, db, mut lkr) = sled_linker();
    write(&mut lkr, "/f", b"one");
    commit(&mut lkr, "one");
    let live = write(&mut lkr, "/f", b"two");
    let head = commit(&mut lkr, "two");
    drop(lkr);

    let kv: Arc<dyn Database> = db;
    let lkr = Linker::new(kv);
    // oldest first, so the first version is loaded before the live one
    for c in lkr.log(&head).unwrap().iter().rev() {
        lkr.lookup_node_at(c, "/f").unwrap();
    }
    let found = lkr.node_by_inode(live.inode()).unwrap().unwrap();
    assert_eq!(found.tree_hash(), live.tree_hash());
    assert_eq!(
        lkr.resolve_node("/f").unwrap().unwrap().tree_hash(),
        live.tree_hash()
    );
}
