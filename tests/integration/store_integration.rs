//! Key/value backends: batching, persistence and dump/restore

use super::test_utils::{commit, write};
use std::sync::Arc;
use tempfile::TempDir;
use treeline::store::Batch;
use treeline::{Database, Linker, MemoryDatabase, Metadata, SledDatabase, StorageError};

fn backends() -> (TempDir, Vec<Arc<dyn Database>>) {
    let temp_dir = TempDir::new().unwrap();
    let sled = SledDatabase::new(temp_dir.path().join("db")).unwrap();
    (
        temp_dir,
        vec![Arc::new(MemoryDatabase::new()), Arc::new(sled)],
    )
}

#[test]
fn test_dropped_batch_rolls_back() {
    let (_dir, dbs) = backends();
    for db in dbs {
        db.put(b"keep", &["refs", "head"]).unwrap();
        {
            let _batch = Batch::new(db.as_ref());
            db.put(b"lost", &["refs", "head"]).unwrap();
            db.put(b"lost", &["refs", "other"]).unwrap();
            assert_eq!(db.get(&["refs", "head"]).unwrap(), b"lost");
        }
        assert_eq!(db.get(&["refs", "head"]).unwrap(), b"keep");
        assert!(matches!(
            db.get(&["refs", "other"]),
            Err(StorageError::NotFound(_))
        ));
    }
}

#[test]
fn test_nested_batches_apply_on_outermost_flush() {
    let (_dir, dbs) = backends();
    for db in dbs {
        let outer = Batch::new(db.as_ref());
        {
            let inner = Batch::new(db.as_ref());
            db.put(b"1", &["stats", "node-count"]).unwrap();
            inner.flush().unwrap();
        }
        assert!(db.have_writes());
        outer.flush().unwrap();
        assert!(!db.have_writes());
        assert_eq!(db.get(&["stats", "node-count"]).unwrap(), b"1");
    }
}

#[test]
fn test_flush_without_batch_fails() {
    let db = MemoryDatabase::new();
    assert!(matches!(db.flush_batch(), Err(StorageError::BatchUnderflow)));
}

#[test]
fn test_keys_are_segment_scoped() {
    let (_dir, dbs) = backends();
    for db in dbs {
        db.put(b"1", &["objects", "aa"]).unwrap();
        db.put(b"2", &["objects-extra", "bb"]).unwrap();
        db.put(b"3", &["stage", "objects", "cc"]).unwrap();
        assert_eq!(db.keys(&["objects"]).unwrap(), vec!["aa"]);
        db.clear(&["objects"]).unwrap();
        assert_eq!(db.keys(&["objects-extra"]).unwrap(), vec!["bb"]);
        assert_eq!(db.keys(&["stage", "objects"]).unwrap(), vec!["cc"]);
    }
}

#[test]
fn test_export_repository_into_sled() {
    let source: Arc<dyn Database> = Arc::new(MemoryDatabase::new());
    let mut lkr = Linker::new(source.clone());
    let file = write(&mut lkr, "/a", b"content");
    let head = commit(&mut lkr, "snapshot");

    let mut dump = Vec::new();
    source.export(&mut dump).unwrap();

    let temp_dir = TempDir::new().unwrap();
    let target: Arc<dyn Database> = Arc::new(SledDatabase::new(temp_dir.path()).unwrap());
    target.import(&mut dump.as_slice()).unwrap();

    let restored = Linker::new(target.clone());
    assert_eq!(restored.head().unwrap(), head);
    assert_eq!(
        restored.lookup_node("/a").unwrap().tree_hash(),
        file.tree_hash()
    );
    target.close().unwrap();
}

#[test]
fn test_sled_reopen_keeps_repository() {
    let temp_dir = TempDir::new().unwrap();
    let head = {
        let db: Arc<dyn Database> =
            Arc::new(SledDatabase::new(temp_dir.path()).unwrap().with_flush_on_batch(true));
        let mut lkr = Linker::new(db.clone());
        write(&mut lkr, "/persisted", b"yes");
        let head = commit(&mut lkr, "persist");
        db.close().unwrap();
        head
    };

    let db: Arc<dyn Database> = Arc::new(SledDatabase::new(temp_dir.path()).unwrap());
    let lkr = Linker::new(db);
    assert_eq!(lkr.head().unwrap(), head);
    assert_eq!(lkr.lookup_node("/persisted").unwrap().size(), 3);
}
