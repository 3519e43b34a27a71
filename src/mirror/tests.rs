//! Tests for mirror stores
//!
//! The contract checks run against every backend.

use super::*;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

// ============================================================================
// Contract Checks
// ============================================================================

async fn check_upsert_and_get(store: &dyn MirrorStore) {
    assert!(store.is_empty().await.unwrap());
    assert!(!store.contains("evt-1").await.unwrap());

    store.upsert("evt-1", r#"{"summary":"Standup"}"#).await.unwrap();
    assert!(store.contains("evt-1").await.unwrap());
    assert_eq!(
        store.get("evt-1").await.unwrap(),
        Some(r#"{"summary":"Standup"}"#.to_string())
    );

    // Replace
    store.upsert("evt-1", r#"{"summary":"Retro"}"#).await.unwrap();
    assert_eq!(
        store.get("evt-1").await.unwrap(),
        Some(r#"{"summary":"Retro"}"#.to_string())
    );
    assert_eq!(store.len().await.unwrap(), 1);
}

async fn check_idempotent_mutations(store: &dyn MirrorStore) {
    store.upsert("evt-1", "payload").await.unwrap();
    store.upsert("evt-1", "payload").await.unwrap();
    assert_eq!(store.len().await.unwrap(), 1);
    assert_eq!(store.get("evt-1").await.unwrap(), Some("payload".to_string()));

    store.delete("evt-1").await.unwrap();
    store.delete("evt-1").await.unwrap();
    store.delete("never-existed").await.unwrap();
    assert!(store.is_empty().await.unwrap());
}

async fn check_ids_sorted_and_clear(store: &dyn MirrorStore) {
    store.upsert("c", "3").await.unwrap();
    store.upsert("a", "1").await.unwrap();
    store.upsert("b", "2").await.unwrap();

    assert_eq!(
        store.ids().await.unwrap(),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );

    store.clear().await.unwrap();
    assert!(store.is_empty().await.unwrap());
    assert!(store.ids().await.unwrap().is_empty());
    assert!(store.get("a").await.unwrap().is_none());
}

async fn check_contract(store: &dyn MirrorStore) {
    check_upsert_and_get(store).await;
    store.clear().await.unwrap();
    check_idempotent_mutations(store).await;
    store.clear().await.unwrap();
    check_ids_sorted_and_clear(store).await;
}

// ============================================================================
// Memory Store Tests
// ============================================================================

#[tokio::test]
async fn test_memory_contract() {
    let store = MemoryMirrorStore::new();
    check_contract(&store).await;
}

#[tokio::test]
async fn test_memory_snapshot() {
    let store = MemoryMirrorStore::new();
    store.upsert("evt-1", "one").await.unwrap();

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot["evt-1"], "one");
}

// ============================================================================
// File Store Tests
// ============================================================================

#[tokio::test]
async fn test_file_contract() {
    let dir = tempdir().unwrap();
    let store = FileMirrorStore::open(dir.path().join("mirror.json")).unwrap();
    check_contract(&store).await;
}

#[tokio::test]
async fn test_file_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mirror.json");

    let store = FileMirrorStore::open(&path).unwrap();
    store.upsert("evt-1", "one").await.unwrap();
    store.upsert("evt-2", "two").await.unwrap();
    store.delete("evt-1").await.unwrap();
    drop(store);

    let reopened = FileMirrorStore::open(&path).unwrap();
    assert_eq!(reopened.ids().await.unwrap(), vec!["evt-2".to_string()]);
    assert_eq!(reopened.get("evt-2").await.unwrap(), Some("two".to_string()));
}

#[tokio::test]
async fn test_file_same_payload_keeps_timestamp() {
    let dir = tempdir().unwrap();
    let store = FileMirrorStore::open(dir.path().join("mirror.json")).unwrap();

    store.upsert("evt-1", "one").await.unwrap();
    let first = store.entry("evt-1").await.unwrap();

    store.upsert("evt-1", "one").await.unwrap();
    let second = store.entry("evt-1").await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_file_noop_does_not_create_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mirror.json");

    let store = FileMirrorStore::open(&path).unwrap();
    store.delete("absent").await.unwrap();
    assert!(!path.exists());
    assert_eq!(store.path(), path.as_path());
}

#[tokio::test]
async fn test_file_open_invalid_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mirror.json");
    tokio::fs::write(&path, "not json").await.unwrap();

    let err = FileMirrorStore::open(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse mirror file"));
}

// ============================================================================
// DuckDB Store Tests
// ============================================================================

#[tokio::test]
async fn test_duckdb_contract() {
    let store = DuckDbMirrorStore::in_memory().unwrap();
    assert!(store.path().is_none());
    check_contract(&store).await;
}

#[tokio::test]
async fn test_duckdb_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mirror.duckdb");

    let store = DuckDbMirrorStore::open(&path).unwrap();
    store.upsert("evt-1", "one").await.unwrap();
    store.upsert("evt-2", "two").await.unwrap();
    store.delete("evt-2").await.unwrap();
    drop(store);

    let reopened = DuckDbMirrorStore::open(&path).unwrap();
    assert_eq!(reopened.ids().await.unwrap(), vec!["evt-1".to_string()]);
    assert_eq!(reopened.get("evt-1").await.unwrap(), Some("one".to_string()));
}
