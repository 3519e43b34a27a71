//! Sync engine module
//!
//! Keeps the mirror in step with the remote collection.
//!
//! # Overview
//!
//! Each [`SyncEngine::run_sync`] call performs one pass:
//! 1. No stored checkpoint means a full sync bounded by the retention
//!    horizon; otherwise an incremental sync from the checkpoint.
//! 2. Pages are fetched one at a time and applied in order: tombstones
//!    delete mirror entries, everything else is upserted.
//! 3. The last page's checkpoint is stored only after every page has been
//!    applied, so an interrupted pass repeats from the old checkpoint.
//!
//! When the remote rejects the checkpoint, both stores are cleared and the
//! pass restarts as a full sync. A rejection on the last of the
//! [`MAX_SYNC_ATTEMPTS`] attempts is fatal and leaves both stores untouched.

mod types;

pub use types::{ApplyOutcome, SyncConfig, SyncReport, SyncStats};

use crate::checkpoint::CheckpointStore;
use crate::error::{Error, Result};
use crate::mirror::MirrorStore;
use crate::remote::{Item, ListRequest, RemoteSource};
use crate::types::Timestamp;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Passes started per `run_sync`: the original and one full resync
pub const MAX_SYNC_ATTEMPTS: u32 = 2;

/// Sync engine for one collection
pub struct SyncEngine {
    remote: Arc<dyn RemoteSource>,
    checkpoints: Arc<dyn CheckpointStore>,
    mirror: Arc<dyn MirrorStore>,
    config: SyncConfig,
    stats: SyncStats,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(
        remote: Arc<dyn RemoteSource>,
        checkpoints: Arc<dyn CheckpointStore>,
        mirror: Arc<dyn MirrorStore>,
    ) -> Self {
        Self {
            remote,
            checkpoints,
            mirror,
            config: SyncConfig::default(),
            stats: SyncStats::default(),
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn checkpoints(&self) -> &Arc<dyn CheckpointStore> {
        &self.checkpoints
    }

    pub fn mirror(&self) -> &Arc<dyn MirrorStore> {
        &self.mirror
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.stats = SyncStats::default();
    }

    /// Run one pass against the current time
    pub async fn run_sync(&mut self) -> Result<SyncReport> {
        self.run_sync_at(Utc::now()).await
    }

    /// Run one pass; a full sync fetches items newer than `now - retention`
    pub async fn run_sync_at(&mut self, now: Timestamp) -> Result<SyncReport> {
        let start = Instant::now();

        for attempt in 1..=MAX_SYNC_ATTEMPTS {
            let error = match self.run_pass(now).await {
                Ok(mut report) => {
                    report.attempts = attempt;
                    report.duration_ms = start.elapsed().as_millis() as u64;
                    self.stats.complete_pass(report.duration_ms);
                    info!(
                        "Completed {} sync: {} pages, {} upserted, {} deleted, {} skipped",
                        report.mode, report.pages, report.upserted, report.deleted, report.skipped
                    );
                    return Ok(report);
                }
                Err(error) => error,
            };

            if !error.is_checkpoint_invalid() {
                self.stats.add_failure();
                if error.is_retryable() {
                    warn!("Sync pass aborted, checkpoint kept for the next run: {error}");
                } else {
                    warn!("Sync pass failed: {error}");
                }
                return Err(error);
            }

            self.stats.add_invalidation();
            warn!("Checkpoint rejected by remote (attempt {attempt}/{MAX_SYNC_ATTEMPTS}): {error}");
            if attempt == MAX_SYNC_ATTEMPTS {
                break;
            }
            self.reset_state().await?;
        }

        self.stats.add_failure();
        Err(Error::InvalidationLoop {
            attempts: MAX_SYNC_ATTEMPTS,
        })
    }

    /// Forget the checkpoint, then every mirror entry
    pub async fn reset_state(&self) -> Result<()> {
        self.checkpoints.clear().await?;
        self.mirror.clear().await?;
        info!("Cleared checkpoint and mirror");
        Ok(())
    }

    async fn run_pass(&mut self, now: Timestamp) -> Result<SyncReport> {
        let base = match self.checkpoints.get().await? {
            Some(checkpoint) => {
                info!("Performing incremental sync");
                ListRequest::incremental(checkpoint)
            }
            None => {
                let lower_bound = now.checked_sub_signed(self.config.retention).ok_or_else(|| {
                    Error::invalid_value(
                        "sync.retention_days",
                        format!("retention reaches before the earliest representable time ({now})"),
                    )
                })?;
                info!("Performing full sync (items since {})", lower_bound.to_rfc3339());
                ListRequest::full(lower_bound)
            }
        };

        let mut report = SyncReport::new(base.mode());
        let mut cursor: Option<String> = None;

        loop {
            if report.pages >= self.config.max_pages {
                return Err(Error::PageLimitExceeded {
                    max_pages: self.config.max_pages,
                });
            }

            let page = self.remote.list(&base.at_cursor(cursor.clone())).await?;
            report.pages += 1;
            self.stats.add_page();

            for item in &page.items {
                let outcome = self.apply_item(item).await?;
                report.record(outcome);
                self.stats.add_outcome(outcome);
            }

            match page.next_cursor {
                Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                    return Err(Error::protocol(format!(
                        "remote returned page cursor '{next}' for its own request"
                    )));
                }
                Some(next) => {
                    debug!("Page {} applied, continuing", report.pages);
                    cursor = Some(next);
                }
                None => {
                    let checkpoint = page
                        .checkpoint
                        .ok_or_else(|| Error::protocol("last page carried no checkpoint"))?;
                    self.checkpoints.set(&checkpoint).await?;
                    report.checkpoint = Some(checkpoint);
                    return Ok(report);
                }
            }
        }
    }

    async fn apply_item(&self, item: &Item) -> Result<ApplyOutcome> {
        if !item.is_tombstone() {
            self.mirror.upsert(&item.id, &item.payload).await?;
            debug!("Upserted {}", item.id);
            return Ok(ApplyOutcome::Upserted);
        }

        if self.mirror.contains(&item.id).await? {
            self.mirror.delete(&item.id).await?;
            debug!("Deleted {}", item.id);
            Ok(ApplyOutcome::Deleted)
        } else {
            Ok(ApplyOutcome::Skipped)
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
