//! Tests for checkpoint module.

use super::*;
use tempfile::TempDir;

fn manager() -> (TempDir, CheckpointManager) {
    let dir = TempDir::new().unwrap();
    let mgr = CheckpointManager::new(dir.path().join("checkpoints"));
    (dir, mgr)
}

// ==================== State ====================

#[test]
fn test_new_checkpoint_is_pending() {
    let cp = MigrationCheckpoint::new("products", "products", 100);

    assert_eq!(cp.status, CheckpointStatus::Pending);
    assert_eq!(cp.migrated_documents, 0);
    assert_eq!(cp.batch_number, 0);
    assert!(cp.error_message.is_empty());
}

#[test]
fn test_advance_is_additive() {
    // Arrange
    let mut cp = MigrationCheckpoint::new("products", "products", 100);
    cp.mark_in_progress();

    // Act
    cp.advance(25, "k25");
    cp.advance(25, "k50");

    // Assert
    assert_eq!(cp.migrated_documents, 50);
    assert_eq!(cp.batch_number, 2);
    assert_eq!(cp.last_document_key, "k50");
    assert!((cp.progress_pct() - 50.0).abs() < f64::EPSILON);
}

#[test]
fn test_progress_with_unknown_total() {
    let mut cp = MigrationCheckpoint::new("products", "products", 0);
    cp.advance(10, "");
    assert_eq!(cp.progress_pct(), 0.0);
}

#[test]
fn test_status_transitions() {
    let mut cp = MigrationCheckpoint::new("p", "p", 1);
    cp.mark_in_progress();
    assert_eq!(cp.status, CheckpointStatus::InProgress);

    cp.mark_failed("boom");
    assert_eq!(cp.status, CheckpointStatus::Failed);
    assert_eq!(cp.error_message, "boom");
    assert!(cp.updated_at >= cp.created_at);
}

// ==================== Persistence ====================

#[test]
fn test_save_load_round_trip() {
    // Arrange
    let (_dir, mgr) = manager();
    let mut cp = MigrationCheckpoint::new("products", "products_v2", 100);
    cp.mark_in_progress();
    cp.advance(40, "doc-40");
    cp.failed_document_keys.push("doc-13".to_string());

    // Act
    let path = mgr.save(&cp).unwrap();
    let loaded = mgr.load("products").unwrap();

    // Assert
    assert!(path.ends_with("products.checkpoint.json"));
    assert_eq!(loaded, Some(cp));
}

#[test]
fn test_status_serialized_snake_case() {
    let (_dir, mgr) = manager();
    let mut cp = MigrationCheckpoint::new("products", "products", 1);
    cp.mark_in_progress();

    let path = mgr.save(&cp).unwrap();
    let raw = std::fs::read_to_string(path).unwrap();

    assert!(raw.contains("\"in_progress\""));
}

#[test]
fn test_load_missing_returns_none() {
    let (_dir, mgr) = manager();
    assert!(mgr.load("never-saved").unwrap().is_none());
}

#[test]
fn test_delete_then_load() {
    let (_dir, mgr) = manager();
    mgr.save(&MigrationCheckpoint::new("products", "products", 1))
        .unwrap();

    mgr.delete("products").unwrap();

    assert!(mgr.load("products").unwrap().is_none());
    // Deleting again is fine
    mgr.delete("products").unwrap();
}

#[test]
fn test_save_overwrites() {
    let (_dir, mgr) = manager();
    let mut cp = MigrationCheckpoint::new("products", "products", 10);
    mgr.save(&cp).unwrap();

    cp.advance(5, "k5");
    mgr.save(&cp).unwrap();

    assert_eq!(mgr.load("products").unwrap().map(|c| c.migrated_documents), Some(5));
}

#[test]
fn test_corrupt_checkpoint_is_an_error() {
    let (_dir, mgr) = manager();
    std::fs::create_dir_all(mgr.dir()).unwrap();
    std::fs::write(mgr.checkpoint_path("products"), "{not json").unwrap();

    assert!(matches!(mgr.load("products"), Err(Error::Checkpoint(_))));
}

#[test]
fn test_path_separators_sanitized() {
    let (_dir, mgr) = manager();
    let path = mgr.checkpoint_path("team/products\\v1");
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("team_products_v1.checkpoint.json")
    );
}

// ==================== Locking ====================

#[test]
fn test_lock_is_exclusive() {
    // Arrange
    let (_dir, mgr) = manager();
    let first = mgr.acquire_lock("products").unwrap();

    // Act
    let second = mgr.acquire_lock("products");

    // Assert
    assert!(matches!(second, Err(Error::CheckpointLocked { ref index, .. }) if index == "products"));
    // Other indexes are independent
    assert!(mgr.acquire_lock("orders").is_ok());
    assert!(first.path().exists());
}

#[test]
fn test_lock_released_on_drop() {
    let (_dir, mgr) = manager();
    let lock = mgr.acquire_lock("products").unwrap();

    drop(lock);

    assert!(mgr.acquire_lock("products").is_ok());
}

#[test]
fn test_lock_file_left_by_crashed_run_is_reclaimed() {
    // Arrange: a run that died keeps its lock file but no longer holds the OS lock
    let (_dir, mgr) = manager();
    std::fs::create_dir_all(mgr.dir()).unwrap();
    let path = mgr.lock_path("products");
    std::fs::write(&path, "4194304\n").unwrap();

    // Act
    let lock = mgr.acquire_lock("products");

    // Assert
    let lock = lock.unwrap();
    assert_eq!(lock.path(), path);
    let holder = std::fs::read_to_string(&path).unwrap();
    assert_eq!(holder.trim(), std::process::id().to_string());
    assert!(matches!(
        mgr.acquire_lock("products"),
        Err(Error::CheckpointLocked { .. })
    ));
}
