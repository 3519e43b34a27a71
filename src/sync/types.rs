//! Sync engine configuration, reports and statistics

use crate::types::SyncMode;
use serde::Serialize;

/// Configuration for sync passes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Full syncs fetch only items newer than `now - retention`
    pub retention: chrono::Duration,
    /// Maximum pages fetched in one pass
    pub max_pages: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retention: chrono::Duration::days(365),
            max_pages: 10_000,
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the full sync retention horizon
    #[must_use]
    pub fn with_retention(mut self, retention: chrono::Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Set the page cap per pass
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }
}

/// What applying one item did to the mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Upserted,
    Deleted,
    /// Tombstone for an id the mirror never held
    Skipped,
}

/// Result of one successful `run_sync`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Mode of the pass that completed
    pub mode: SyncMode,
    /// Passes started, including the one restarted after invalidation
    pub attempts: u32,
    pub pages: usize,
    pub upserted: usize,
    pub deleted: usize,
    pub skipped: usize,
    /// Checkpoint stored at the end of the pass
    pub checkpoint: Option<String>,
    pub duration_ms: u64,
}

impl SyncReport {
    pub(crate) fn new(mode: SyncMode) -> Self {
        Self {
            mode,
            attempts: 1,
            pages: 0,
            upserted: 0,
            deleted: 0,
            skipped: 0,
            checkpoint: None,
            duration_ms: 0,
        }
    }

    pub(crate) fn record(&mut self, outcome: ApplyOutcome) {
        match outcome {
            ApplyOutcome::Upserted => self.upserted += 1,
            ApplyOutcome::Deleted => self.deleted += 1,
            ApplyOutcome::Skipped => self.skipped += 1,
        }
    }

    /// Items seen in the pass
    pub fn items(&self) -> usize {
        self.upserted + self.deleted + self.skipped
    }
}

/// Statistics accumulated across `run_sync` calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Passes that stored a new checkpoint
    pub passes_completed: usize,
    /// Runs that ended in an error
    pub failures: usize,
    /// Checkpoints rejected by the remote
    pub invalidations: usize,
    pub pages_fetched: usize,
    pub items_upserted: usize,
    pub items_deleted: usize,
    pub items_skipped: usize,
    /// Duration of the last completed run in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    pub fn add_outcome(&mut self, outcome: ApplyOutcome) {
        match outcome {
            ApplyOutcome::Upserted => self.items_upserted += 1,
            ApplyOutcome::Deleted => self.items_deleted += 1,
            ApplyOutcome::Skipped => self.items_skipped += 1,
        }
    }

    pub fn add_invalidation(&mut self) {
        self.invalidations += 1;
    }

    pub fn add_failure(&mut self) {
        self.failures += 1;
    }

    pub fn complete_pass(&mut self, duration_ms: u64) {
        self.passes_completed += 1;
        self.duration_ms = duration_ms;
    }
}
