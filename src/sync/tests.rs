//! Tests for the sync engine
//!
//! The remote is scripted and both stores record every mutation into a
//! shared log, so tests can assert the order of remote calls and writes.

use super::*;
use crate::checkpoint::MemoryCheckpointStore;
use crate::error::FailureClass;
use crate::mirror::MemoryMirrorStore;
use crate::remote::Page;
use crate::types::SyncMode;
use async_trait::async_trait;
use chrono::TimeZone;
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::Mutex;

// ============================================================================
// Test Doubles
// ============================================================================

type Log = Arc<Mutex<Vec<String>>>;

fn push(log: &Log, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

struct ScriptedRemote {
    responses: Mutex<VecDeque<Result<Page>>>,
    requests: Mutex<Vec<ListRequest>>,
    log: Log,
}

impl ScriptedRemote {
    fn script(&self, responses: Vec<Result<Page>>) {
        self.responses.lock().unwrap().extend(responses);
    }

    fn requests(&self) -> Vec<ListRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteSource for ScriptedRemote {
    async fn list(&self, request: &ListRequest) -> Result<Page> {
        self.requests.lock().unwrap().push(request.clone());
        push(&self.log, format!("list {}", request.mode()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Other("remote script exhausted".to_string())))
    }
}

struct RecordingCheckpoints {
    inner: MemoryCheckpointStore,
    log: Log,
}

#[async_trait]
impl CheckpointStore for RecordingCheckpoints {
    async fn get(&self) -> Result<Option<String>> {
        self.inner.get().await
    }

    async fn set(&self, checkpoint: &str) -> Result<()> {
        push(&self.log, format!("checkpoint.set {checkpoint}"));
        self.inner.set(checkpoint).await
    }

    async fn clear(&self) -> Result<()> {
        push(&self.log, "checkpoint.clear");
        self.inner.clear().await
    }
}

struct RecordingMirror {
    inner: MemoryMirrorStore,
    log: Log,
    fail_upserts: bool,
}

#[async_trait]
impl MirrorStore for RecordingMirror {
    async fn upsert(&self, id: &str, payload: &str) -> Result<()> {
        if self.fail_upserts {
            return Err(Error::mirror("disk full"));
        }
        push(&self.log, format!("mirror.upsert {id}"));
        self.inner.upsert(id, payload).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        push(&self.log, format!("mirror.delete {id}"));
        self.inner.delete(id).await
    }

    async fn contains(&self, id: &str) -> Result<bool> {
        self.inner.contains(id).await
    }

    async fn clear(&self) -> Result<()> {
        push(&self.log, "mirror.clear");
        self.inner.clear().await
    }

    async fn get(&self, id: &str) -> Result<Option<String>> {
        self.inner.get(id).await
    }

    async fn len(&self) -> Result<usize> {
        self.inner.len().await
    }

    async fn ids(&self) -> Result<Vec<String>> {
        self.inner.ids().await
    }
}

struct Harness {
    engine: SyncEngine,
    remote: Arc<ScriptedRemote>,
    checkpoints: Arc<RecordingCheckpoints>,
    mirror: Arc<RecordingMirror>,
    log: Log,
}

impl Harness {
    fn new(checkpoint: Option<&str>, responses: Vec<Result<Page>>) -> Self {
        Self::build(checkpoint, responses, false)
    }

    fn build(checkpoint: Option<&str>, responses: Vec<Result<Page>>, fail_upserts: bool) -> Self {
        let log: Log = Arc::default();
        let remote = Arc::new(ScriptedRemote {
            responses: Mutex::new(responses.into()),
            requests: Mutex::default(),
            log: log.clone(),
        });
        let checkpoints = Arc::new(RecordingCheckpoints {
            inner: match checkpoint {
                Some(token) => MemoryCheckpointStore::with_checkpoint(token),
                None => MemoryCheckpointStore::new(),
            },
            log: log.clone(),
        });
        let mirror = Arc::new(RecordingMirror {
            inner: MemoryMirrorStore::new(),
            log: log.clone(),
            fail_upserts,
        });

        let engine = SyncEngine::new(remote.clone(), checkpoints.clone(), mirror.clone());
        Self {
            engine,
            remote,
            checkpoints,
            mirror,
            log,
        }
    }

    fn configure(&mut self, config: SyncConfig) {
        self.engine = SyncEngine::new(
            self.remote.clone(),
            self.checkpoints.clone(),
            self.mirror.clone(),
        )
        .with_config(config);
    }

    async fn checkpoint(&self) -> Option<String> {
        self.checkpoints.get().await.unwrap()
    }

    async fn mirror_ids(&self) -> Vec<String> {
        self.mirror.ids().await.unwrap()
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }
}

fn now() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
}

fn one_year_ago() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 10, 19, 12, 0, 0).unwrap()
}

fn event(id: &str, summary: &str) -> Item {
    Item::active(id, format!(r#"{{"id":"{id}","summary":"{summary}"}}"#))
}

fn cancelled(id: &str) -> Item {
    Item::tombstone(id, format!(r#"{{"id":"{id}","status":"cancelled"}}"#))
}

/// Two pages: three events, then a tombstone for an unknown id and `tok-1`
fn two_page_full_sync() -> Vec<Result<Page>> {
    vec![
        Ok(Page::with_cursor(
            vec![
                event("evt-1", "Standup"),
                event("evt-2", "Planning"),
                event("evt-3", "Retro"),
            ],
            "page-2",
        )),
        Ok(Page::last(vec![cancelled("evt-unknown")], "tok-1")),
    ]
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

// ============================================================================
// Config and Report Types
// ============================================================================

#[test]
fn test_sync_config_defaults() {
    let config = SyncConfig::default();
    assert_eq!(config.retention, chrono::Duration::days(365));
    assert_eq!(config.max_pages, 10_000);

    let config = SyncConfig::new()
        .with_retention(chrono::Duration::days(30))
        .with_max_pages(5);
    assert_eq!(config.retention, chrono::Duration::days(30));
    assert_eq!(config.max_pages, 5);
}

#[test]
fn test_report_serializes_mode() {
    let mut report = SyncReport::new(SyncMode::Incremental);
    report.record(ApplyOutcome::Upserted);
    report.record(ApplyOutcome::Skipped);
    assert_eq!(report.items(), 2);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["mode"], "incremental");
    assert_eq!(json["upserted"], 1);
    assert_eq!(json["checkpoint"], serde_json::Value::Null);
}

// ============================================================================
// Full and Incremental Passes
// ============================================================================

#[tokio::test]
async fn test_first_run_full_sync() {
    let mut h = Harness::new(None, two_page_full_sync());

    let report = h.engine.run_sync_at(now()).await.unwrap();

    let requests = h.remote.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], ListRequest::full(one_year_ago()));
    assert_eq!(
        requests[1],
        ListRequest::full(one_year_ago()).at_cursor(Some("page-2".to_string()))
    );

    assert_eq!(h.mirror_ids().await, ids(&["evt-1", "evt-2", "evt-3"]));
    assert_eq!(h.checkpoint().await.as_deref(), Some("tok-1"));

    assert_eq!(report.mode, SyncMode::Full);
    assert_eq!(report.attempts, 1);
    assert_eq!(report.pages, 2);
    assert_eq!(report.upserted, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.deleted, 0);
    assert_eq!(report.checkpoint.as_deref(), Some("tok-1"));
    assert!(!h.log().iter().any(|entry| entry.starts_with("mirror.delete")));
}

#[tokio::test]
async fn test_incremental_uses_checkpoint_without_lower_bound() {
    let mut h = Harness::new(
        Some("tok-1"),
        vec![Ok(Page::last(vec![event("evt-4", "Demo")], "tok-2"))],
    );

    let report = h.engine.run_sync_at(now()).await.unwrap();

    assert_eq!(h.remote.requests(), vec![ListRequest::incremental("tok-1")]);
    assert_eq!(report.mode, SyncMode::Incremental);
    assert_eq!(h.checkpoint().await.as_deref(), Some("tok-2"));
    assert_eq!(h.mirror_ids().await, ids(&["evt-4"]));
}

#[tokio::test]
async fn test_retention_horizon_is_configurable() {
    let mut h = Harness::new(None, vec![Ok(Page::last(vec![], "tok-1"))]);
    h.configure(SyncConfig::new().with_retention(chrono::Duration::days(30)));

    h.engine.run_sync_at(now()).await.unwrap();

    let expected = Utc.with_ymd_and_hms(2026, 9, 19, 12, 0, 0).unwrap();
    assert_eq!(h.remote.requests()[0].lower_bound, Some(expected));
}

#[tokio::test]
async fn test_run_sync_uses_current_time() {
    let mut h = Harness::new(None, vec![Ok(Page::last(vec![], "tok-1"))]);
    let before = Utc::now();

    h.engine.run_sync().await.unwrap();

    let bound = h.remote.requests()[0].lower_bound.unwrap();
    let expected = before - chrono::Duration::days(365);
    assert!(bound >= expected);
    assert!(bound - expected < chrono::Duration::minutes(1));
}

#[tokio::test]
async fn test_checkpoint_written_after_all_pages() {
    let mut h = Harness::new(None, two_page_full_sync());

    h.engine.run_sync_at(now()).await.unwrap();

    let log = h.log();
    assert_eq!(log.last().map(String::as_str), Some("checkpoint.set tok-1"));
    assert_eq!(
        log.iter().filter(|e| e.starts_with("checkpoint.set")).count(),
        1
    );
}

// ============================================================================
// Item Application
// ============================================================================

#[tokio::test]
async fn test_reapplying_items_is_idempotent() {
    let page = || Ok(Page::last(vec![event("evt-1", "Standup"), event("evt-1", "Standup")], "tok-1"));
    let mut h = Harness::new(None, vec![page()]);

    h.engine.run_sync_at(now()).await.unwrap();
    let first = h.mirror.inner.snapshot().await;

    h.remote.script(vec![page()]);
    h.engine.run_sync_at(now()).await.unwrap();
    let second = h.mirror.inner.snapshot().await;

    assert_eq!(first, second);
    assert_eq!(second.len(), 1);
}

#[tokio::test]
async fn test_tombstone_after_upserts_removes_entry() {
    let mut h = Harness::new(
        None,
        vec![
            Ok(Page::with_cursor(
                vec![event("evt-1", "Draft"), event("evt-1", "Final")],
                "page-2",
            )),
            Ok(Page::last(vec![event("evt-2", "Keep"), cancelled("evt-1")], "tok-1")),
        ],
    );

    let report = h.engine.run_sync_at(now()).await.unwrap();

    assert_eq!(h.mirror_ids().await, ids(&["evt-2"]));
    assert_eq!(report.deleted, 1);
    assert_eq!(report.upserted, 3);
}

#[tokio::test]
async fn test_tombstone_for_existing_entry_deletes() {
    let mut h = Harness::new(Some("tok-1"), vec![Ok(Page::last(vec![cancelled("evt-1")], "tok-2"))]);
    h.mirror.inner.upsert("evt-1", "{}").await.unwrap();

    let report = h.engine.run_sync_at(now()).await.unwrap();

    assert!(h.mirror_ids().await.is_empty());
    assert_eq!(report.deleted, 1);
    assert!(h.log().contains(&"mirror.delete evt-1".to_string()));
}

// ============================================================================
// Interrupted Passes
// ============================================================================

#[tokio::test]
async fn test_transient_failure_keeps_checkpoint() {
    let mut h = Harness::new(
        Some("tok-1"),
        vec![
            Ok(Page::with_cursor(vec![event("evt-1", "Standup")], "page-2")),
            Err(Error::transient("connection reset")),
        ],
    );

    let err = h.engine.run_sync_at(now()).await.unwrap_err();

    assert_eq!(err.class(), FailureClass::Transient);
    assert_eq!(h.checkpoint().await.as_deref(), Some("tok-1"));
    assert_eq!(h.mirror_ids().await, ids(&["evt-1"]));
    assert!(!h.log().iter().any(|e| e.starts_with("checkpoint.")));

    // The next run repeats the same incremental request
    h.remote.script(vec![
        Ok(Page::with_cursor(vec![event("evt-1", "Standup")], "page-2")),
        Ok(Page::last(vec![event("evt-2", "Planning")], "tok-2")),
    ]);
    h.engine.run_sync_at(now()).await.unwrap();

    let requests = h.remote.requests();
    assert_eq!(requests[0], requests[2]);
    assert_eq!(requests[2], ListRequest::incremental("tok-1"));
    assert_eq!(h.checkpoint().await.as_deref(), Some("tok-2"));
    assert_eq!(h.mirror_ids().await, ids(&["evt-1", "evt-2"]));
}

#[tokio::test]
async fn test_fatal_failure_propagates_without_mutation() {
    let mut h = Harness::new(Some("tok-1"), vec![Err(Error::http_status(401, "Invalid Credentials"))]);

    let err = h.engine.run_sync_at(now()).await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
    assert_eq!(h.checkpoint().await.as_deref(), Some("tok-1"));
    assert_eq!(h.remote.requests().len(), 1);
    assert!(h.log().iter().all(|e| e.starts_with("list")));
    assert_eq!(h.engine.stats().failures, 1);
}

#[tokio::test]
async fn test_mirror_failure_is_fatal() {
    let mut h = Harness::build(None, two_page_full_sync(), true);

    let err = h.engine.run_sync_at(now()).await.unwrap_err();

    assert!(matches!(err, Error::Mirror { .. }));
    assert_eq!(err.class(), FailureClass::Fatal);
    assert!(h.checkpoint().await.is_none());
    assert_eq!(h.remote.requests().len(), 1);
}

// ============================================================================
// Invalidation Recovery
// ============================================================================

#[tokio::test]
async fn test_invalidation_resets_then_full_syncs() {
    let mut responses = vec![Err(Error::checkpoint_invalid("HTTP 410: Gone"))];
    responses.extend(two_page_full_sync());
    let mut h = Harness::new(Some("tok-0"), responses);
    h.mirror.inner.upsert("stale", "{}").await.unwrap();

    let report = h.engine.run_sync_at(now()).await.unwrap();

    assert_eq!(
        &h.log()[..4],
        &[
            "list incremental".to_string(),
            "checkpoint.clear".to_string(),
            "mirror.clear".to_string(),
            "list full".to_string(),
        ]
    );

    let requests = h.remote.requests();
    assert_eq!(requests[0], ListRequest::incremental("tok-0"));
    assert_eq!(requests[1], ListRequest::full(one_year_ago()));

    assert_eq!(h.mirror_ids().await, ids(&["evt-1", "evt-2", "evt-3"]));
    assert_eq!(h.checkpoint().await.as_deref(), Some("tok-1"));
    assert_eq!(report.attempts, 2);
    assert_eq!(report.mode, SyncMode::Full);
    assert_eq!(h.engine.stats().invalidations, 1);
}

#[tokio::test]
async fn test_second_invalidation_is_fatal() {
    let mut h = Harness::new(
        Some("tok-0"),
        vec![
            Err(Error::checkpoint_invalid("HTTP 410: Gone")),
            Ok(Page::with_cursor(vec![event("evt-1", "Standup")], "page-2")),
            Err(Error::checkpoint_invalid("HTTP 410: Gone")),
            Ok(Page::last(vec![event("evt-9", "never applied")], "tok-9")),
        ],
    );
    h.mirror.inner.upsert("stale", "{}").await.unwrap();

    let err = h.engine.run_sync_at(now()).await.unwrap_err();

    assert!(matches!(err, Error::InvalidationLoop { attempts: 2 }));
    assert_eq!(err.class(), FailureClass::Fatal);
    assert_eq!(h.remote.requests().len(), 3);
    assert_eq!(h.engine.stats().invalidations, 2);
    assert_eq!(h.engine.stats().failures, 1);

    // The escalation leaves state as the retry pass left it
    assert_eq!(
        h.log(),
        vec![
            "list incremental".to_string(),
            "checkpoint.clear".to_string(),
            "mirror.clear".to_string(),
            "list full".to_string(),
            "mirror.upsert evt-1".to_string(),
            "list full".to_string(),
        ]
    );
    assert!(h.checkpoint().await.is_none());
    assert_eq!(h.mirror_ids().await, ids(&["evt-1"]));
}

#[tokio::test]
async fn test_invalidation_on_full_sync_is_fatal_without_reset() {
    let mut h = Harness::new(
        None,
        vec![
            Err(Error::checkpoint_invalid("HTTP 410: Gone")),
            Err(Error::checkpoint_invalid("HTTP 410: Gone")),
        ],
    );

    let err = h.engine.run_sync_at(now()).await.unwrap_err();

    assert!(matches!(err, Error::InvalidationLoop { attempts: 2 }));
    assert_eq!(
        h.log(),
        vec![
            "list full".to_string(),
            "checkpoint.clear".to_string(),
            "mirror.clear".to_string(),
            "list full".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_invalidation_mid_pass_discards_partial_pages() {
    let mut h = Harness::new(
        Some("tok-0"),
        vec![
            Ok(Page::with_cursor(vec![event("evt-old", "Partial")], "page-2")),
            Err(Error::checkpoint_invalid("HTTP 410: Gone")),
            Ok(Page::last(vec![event("evt-1", "Fresh")], "tok-1")),
        ],
    );

    h.engine.run_sync_at(now()).await.unwrap();

    assert_eq!(h.mirror_ids().await, ids(&["evt-1"]));
    assert_eq!(h.checkpoint().await.as_deref(), Some("tok-1"));
}

#[tokio::test]
async fn test_retention_beyond_calendar_range_is_rejected() {
    let mut h = Harness::new(None, two_page_full_sync());
    h.configure(SyncConfig::new().with_retention(chrono::Duration::days(i64::from(u32::MAX))));

    let err = h.engine.run_sync_at(now()).await.unwrap_err();

    assert!(matches!(
        err,
        Error::InvalidConfigValue { ref field, .. } if field == "sync.retention_days"
    ));
    assert_eq!(err.class(), FailureClass::Fatal);
    assert!(h.remote.requests().is_empty());
    assert!(h.checkpoint().await.is_none());
    assert!(h.mirror_ids().await.is_empty());
}

// ============================================================================
// Defensive Pagination
// ============================================================================

#[tokio::test]
async fn test_page_limit() {
    let mut h = Harness::new(
        Some("tok-1"),
        vec![
            Ok(Page::with_cursor(vec![], "p1")),
            Ok(Page::with_cursor(vec![], "p2")),
            Ok(Page::with_cursor(vec![], "p3")),
        ],
    );
    h.configure(SyncConfig::new().with_max_pages(2));

    let err = h.engine.run_sync_at(now()).await.unwrap_err();

    assert!(matches!(err, Error::PageLimitExceeded { max_pages: 2 }));
    assert_eq!(h.remote.requests().len(), 2);
    assert_eq!(h.checkpoint().await.as_deref(), Some("tok-1"));
}

#[tokio::test]
async fn test_repeated_cursor_is_protocol_error() {
    let mut h = Harness::new(
        Some("tok-1"),
        vec![
            Ok(Page::with_cursor(vec![], "p1")),
            Ok(Page::with_cursor(vec![], "p1")),
        ],
    );

    let err = h.engine.run_sync_at(now()).await.unwrap_err();

    assert!(matches!(err, Error::Protocol { .. }));
    assert_eq!(h.checkpoint().await.as_deref(), Some("tok-1"));
}

#[tokio::test]
async fn test_last_page_without_checkpoint_is_protocol_error() {
    let mut h = Harness::new(
        Some("tok-1"),
        vec![Ok(Page {
            items: vec![event("evt-1", "Standup")],
            next_cursor: None,
            checkpoint: None,
        })],
    );

    let err = h.engine.run_sync_at(now()).await.unwrap_err();

    assert!(err.to_string().contains("no checkpoint"));
    assert_eq!(h.checkpoint().await.as_deref(), Some("tok-1"));
}

// ============================================================================
// Stats and Reset
// ============================================================================

#[tokio::test]
async fn test_stats_accumulate_and_reset() {
    let mut h = Harness::new(None, two_page_full_sync());
    h.engine.run_sync_at(now()).await.unwrap();

    h.remote
        .script(vec![Ok(Page::last(vec![cancelled("evt-2")], "tok-2"))]);
    h.engine.run_sync_at(now()).await.unwrap();

    let stats = h.engine.stats().clone();
    assert_eq!(stats.passes_completed, 2);
    assert_eq!(stats.pages_fetched, 3);
    assert_eq!(stats.items_upserted, 3);
    assert_eq!(stats.items_deleted, 1);
    assert_eq!(stats.items_skipped, 1);

    h.engine.reset_stats();
    assert_eq!(h.engine.stats(), &SyncStats::default());
}

#[tokio::test]
async fn test_reset_state_forces_full_sync() {
    let mut h = Harness::new(Some("tok-1"), vec![Ok(Page::last(vec![], "tok-2"))]);
    h.mirror.inner.upsert("evt-1", "{}").await.unwrap();

    h.engine.reset_state().await.unwrap();
    assert_eq!(h.log(), vec!["checkpoint.clear", "mirror.clear"]);
    h.clear_log();

    let report = h.engine.run_sync_at(now()).await.unwrap();
    assert_eq!(report.mode, SyncMode::Full);
    assert!(h.mirror_ids().await.is_empty());
}
