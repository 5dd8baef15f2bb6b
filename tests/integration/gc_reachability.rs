//! Garbage collection over staged and committed objects

use super::test_utils::{commit, memory_linker, write};
use treeline::node::encode;
use treeline::{ops, Database, File, GarbageCollector, Hash, Hierarchy, Metadata, Node};

/// A node written straight into a bucket, referenced by no tree.
fn plant_orphan(kv: &dyn Database, bucket: &[&str], name: &str) -> Node {
    let mut file = File::new(name, 4242);
    file.set_parent_path("/");
    file.set_content(Hash::sum(name.as_bytes()), 1);
    let node = Node::File(file);
    let hex = node.tree_hash().to_hex();
    let mut key = bucket.to_vec();
    key.push(&hex);
    kv.put(&encode(&node).unwrap(), &key).unwrap();
    node
}

#[test]
fn test_aggressive_gc_removes_unreachable_permanent_objects() {
    let mut lkr = memory_linker();
    let a = write(&mut lkr, "/a", b"a");
    let b = write(&mut lkr, "/b", b"b");
    commit(&mut lkr, "a and b");
    let stray = plant_orphan(lkr.kv(), &["objects"], "stray");
    assert!(lkr.node_by_hash(stray.tree_hash()).unwrap().is_some());

    let stats = GarbageCollector::new(&lkr).run(true).unwrap();

    assert_eq!(stats.removed_permanent, 1);
    assert!(lkr.node_by_hash(stray.tree_hash()).unwrap().is_none());
    assert!(lkr.node_by_hash(a.tree_hash()).unwrap().is_some());
    assert!(lkr.node_by_hash(b.tree_hash()).unwrap().is_some());
    let root = lkr.root().unwrap();
    assert!(lkr.node_by_hash(root.tree_hash()).unwrap().is_some());
}

#[test]
fn test_history_survives_aggressive_gc() {
    let mut lkr = memory_linker();
    write(&mut lkr, "/a", b"a");
    let b = write(&mut lkr, "/b", b"b");
    let c1 = commit(&mut lkr, "a and b");
    ops::remove(&mut lkr, "/b").unwrap();
    commit(&mut lkr, "drop b");

    let stats = GarbageCollector::new(&lkr).run(true).unwrap();
    assert_eq!(stats.removed(), 0);

    lkr.clear_caches();
    let old_b = lkr.lookup_node_at(&c1, "/b").unwrap();
    assert_eq!(old_b.tree_hash(), b.tree_hash());
    assert!(lkr.lookup_node("/b").unwrap().is_ghost());
}

#[test]
fn test_light_gc_only_touches_stage() {
    let mut lkr = memory_linker();
    write(&mut lkr, "/a", b"a");
    commit(&mut lkr, "a");
    write(&mut lkr, "/b", b"b");
    let staged = plant_orphan(lkr.kv(), &["stage", "objects"], "staged-stray");
    let committed = plant_orphan(lkr.kv(), &["objects"], "committed-stray");

    let stats = GarbageCollector::new(&lkr).run(false).unwrap();

    assert_eq!(stats.removed_staged, 1);
    assert_eq!(stats.removed_permanent, 0);
    assert!(lkr.node_by_hash(staged.tree_hash()).unwrap().is_none());
    assert!(lkr.node_by_hash(committed.tree_hash()).unwrap().is_some());
    assert_eq!(lkr.lookup_node("/b").unwrap().size(), 1);
}

#[test]
fn test_keep_predicate_pins_objects() {
    let mut lkr = memory_linker();
    write(&mut lkr, "/a", b"a");
    commit(&mut lkr, "a");
    let pinned = plant_orphan(lkr.kv(), &["objects"], "pinned");
    let loose = plant_orphan(lkr.kv(), &["objects"], "loose");

    let stats = GarbageCollector::new(&lkr)
        .with_keep(|node| node.name() == "pinned")
        .run(true)
        .unwrap();

    assert_eq!(stats.kept, 1);
    assert_eq!(stats.removed_permanent, 1);
    assert!(lkr.node_by_hash(pinned.tree_hash()).unwrap().is_some());
    assert!(lkr.node_by_hash(loose.tree_hash()).unwrap().is_none());
}

#[test]
fn test_gc_is_idempotent() {
    let mut lkr = memory_linker();
    write(&mut lkr, "/a", b"a");
    commit(&mut lkr, "a");
    plant_orphan(lkr.kv(), &["objects"], "stray");

    let first = GarbageCollector::new(&lkr).run(true).unwrap();
    let second = GarbageCollector::new(&lkr).run(true).unwrap();
    assert_eq!(first.removed(), 1);
    assert_eq!(second.removed(), 0);
    assert_eq!(first.marked, second.marked);
}

#[test]
fn test_uncommitted_removed_node_is_gone_after_gc() {
    let mut lkr = memory_linker();
    let a = write(&mut lkr, "/a", b"a");
    commit(&mut lkr, "a");
    let b = write(&mut lkr, "/b", b"b");
    ops::remove(&mut lkr, "/b").unwrap();
    commit(&mut lkr, "b came and went");

    GarbageCollector::new(&lkr).run(true).unwrap();

    let hex = b.tree_hash().to_hex();
    assert!(lkr.kv().get(&["objects", &hex]).is_err());
    assert!(lkr.kv().get(&["stage", "objects", &hex]).is_err());
    assert!(lkr.node_by_hash(b.tree_hash()).unwrap().is_none());
    assert!(lkr.node_by_hash(a.tree_hash()).unwrap().is_some());
    let root = lkr.root().unwrap();
    assert!(lkr.node_by_hash(root.tree_hash()).unwrap().is_some());
    assert!(lkr.lookup_node("/b").unwrap().is_ghost());
}
