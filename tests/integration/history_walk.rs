//! Per-node history across commits, renames and removals

use super::test_utils::{commit, memory_linker, write};
use treeline::history::history;
use treeline::{ops, ChangeMask, HistoryWalker, Metadata};

fn masks(changes: &[treeline::Change]) -> Vec<ChangeMask> {
    changes.iter().map(|c| c.mask).collect()
}

fn paths(changes: &[treeline::Change]) -> Vec<&str> {
    changes.iter().map(|c| c.path.as_str()).collect()
}

#[test]
fn test_modified_twice() {
    let mut lkr = memory_linker();
    write(&mut lkr, "/f", b"one");
    let c1 = commit(&mut lkr, "create");
    write(&mut lkr, "/f", b"two");
    let c2 = commit(&mut lkr, "edit");
    write(&mut lkr, "/f", b"three");
    let c3 = commit(&mut lkr, "edit again");

    let head = lkr.head().unwrap();
    let node = lkr.lookup_node_at(&head, "/f").unwrap();
    let changes = history(&lkr, head, node).unwrap();

    assert_eq!(
        masks(&changes),
        vec![ChangeMask::NONE, ChangeMask::MODIFY, ChangeMask::ADD]
    );
    let commits: Vec<_> = changes.iter().map(|c| c.commit.tree_hash().clone()).collect();
    assert_eq!(
        commits,
        vec![
            c3.tree_hash().clone(),
            c2.tree_hash().clone(),
            c1.tree_hash().clone()
        ]
    );
}

#[test]
fn test_move_history() {
    let mut lkr = memory_linker();
    write(&mut lkr, "/x.png", b"pixels");
    commit(&mut lkr, "add");
    ops::mv(&mut lkr, "/x.png", "/y.png").unwrap();
    commit(&mut lkr, "rename");

    let changes: Vec<_> = HistoryWalker::from_path(&lkr, "/y.png")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(
        masks(&changes),
        vec![ChangeMask::NONE, ChangeMask::MOVE, ChangeMask::ADD]
    );
    assert_eq!(paths(&changes), vec!["/y.png", "/x.png", "/x.png"]);
}

#[test]
fn test_cyclic_move() {
    let mut lkr = memory_linker();
    write(&mut lkr, "/x", b"data");
    commit(&mut lkr, "add");
    ops::mv(&mut lkr, "/x", "/y").unwrap();
    commit(&mut lkr, "x to y");
    ops::mv(&mut lkr, "/y", "/x").unwrap();
    commit(&mut lkr, "y to x");

    let changes: Vec<_> = HistoryWalker::from_path(&lkr, "/x")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(
        masks(&changes),
        vec![
            ChangeMask::NONE,
            ChangeMask::MOVE,
            ChangeMask::MOVE,
            ChangeMask::ADD
        ]
    );
    assert_eq!(paths(&changes), vec!["/x", "/y", "/x", "/x"]);
}

#[test]
fn test_move_and_modify_in_one_commit() {
    let mut lkr = memory_linker();
    write(&mut lkr, "/a", b"before");
    commit(&mut lkr, "add");
    ops::mv(&mut lkr, "/a", "/b").unwrap();
    write(&mut lkr, "/b", b"after");
    commit(&mut lkr, "move and edit");

    let head = lkr.head().unwrap();
    let node = lkr.lookup_node_at(&head, "/b").unwrap();
    let changes = history(&lkr, lkr.status().unwrap(), node).unwrap();

    assert_eq!(changes.len(), 3);
    assert!(changes[1].mask.contains(ChangeMask::MOVE));
    assert!(changes[1].mask.contains(ChangeMask::MODIFY));
    assert_eq!(changes[2].mask, ChangeMask::ADD);
}

#[test]
fn test_moved_into_directory() {
    let mut lkr = memory_linker();
    write(&mut lkr, "/photo", b"jpg");
    commit(&mut lkr, "add");
    ops::mkdir(&mut lkr, "/album", false).unwrap();
    ops::mv(&mut lkr, "/photo", "/album").unwrap();
    commit(&mut lkr, "file away");

    let changes: Vec<_> = HistoryWalker::from_path(&lkr, "/album/photo")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(paths(&changes), vec!["/album/photo", "/photo", "/photo"]);
    assert_eq!(changes[1].mask, ChangeMask::MOVE);
}

#[test]
fn test_removed_and_recreated() {
    let mut lkr = memory_linker();
    let original = write(&mut lkr, "/f", b"one");
    commit(&mut lkr, "add");
    ops::remove(&mut lkr, "/f").unwrap();
    commit(&mut lkr, "remove");
    let recreated = write(&mut lkr, "/f", b"two");
    commit(&mut lkr, "recreate");
    assert_eq!(recreated.inode(), original.inode());

    let changes: Vec<_> = HistoryWalker::from_path(&lkr, "/f")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(changes.len(), 4);
    assert!(changes[1].mask.contains(ChangeMask::REMOVE));
    assert!(changes[1].mask.contains(ChangeMask::MODIFY));
    assert!(changes[2].mask.is_empty());
    assert_eq!(changes[3].mask, ChangeMask::ADD);
}

#[test]
fn test_walker_is_lazy() {
    let mut lkr = memory_linker();
    write(&mut lkr, "/f", b"1");
    commit(&mut lkr, "one");
    write(&mut lkr, "/f", b"2");
    commit(&mut lkr, "two");

    let mut walker = HistoryWalker::from_path(&lkr, "/f").unwrap();
    let first = walker.next().unwrap().unwrap();
    assert!(first.mask.is_empty());
    assert_eq!(first.node.path(), "/f");
    assert_eq!(walker.count(), 2);
}
