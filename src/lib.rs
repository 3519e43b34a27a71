// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # event-mirror
//!
//! Keeps a local mirror of a remote, paginated, mutable event collection
//! up to date across runs using an opaque sync token.
//!
//! ## Features
//!
//! - **Incremental Sync**: Fetch only changes since the stored checkpoint
//! - **Invalidation Recovery**: A rejected checkpoint triggers one full resync
//! - **Tombstones**: Cancelled items are removed from the mirror
//! - **Durable Stores**: JSON state file for checkpoints; JSON file or DuckDB mirror
//! - **HTTP Source**: Retry, backoff and rate limiting over a JSON list endpoint
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use event_mirror::config::load_config;
//! use event_mirror::sync::SyncEngine;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> event_mirror::Result<()> {
//!     let config = load_config("event-mirror.yaml")?;
//!     let mut engine = SyncEngine::new(
//!         Arc::new(config.remote_source()?),
//!         config.checkpoint_store()?,
//!         config.mirror_store()?,
//!     )
//!     .with_config(config.sync_config());
//!
//!     let report = engine.run_sync().await?;
//!     println!("{} sync, {} upserted", report.mode, report.upserted);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!  Checkpoint Store ──▶ SyncEngine ──▶ RemoteSource::list
//!         ▲                 │
//!         │                 ▼
//!         └──────────── Mirror Store
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types and failure classification
pub mod error;

/// Common types and type aliases
pub mod types;

/// Template interpolation
pub mod template;

/// Atomic file writes shared by the file-backed stores
mod persist;

/// Checkpoint persistence
pub mod checkpoint;

/// Local mirror of the remote collection
pub mod mirror;

/// Remote source trait and HTTP implementation
pub mod remote;

/// HTTP client with retry and rate limiting
pub mod http;

/// Sync engine
pub mod sync;

/// YAML configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, FailureClass, Result};
pub use types::*;

pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use config::{load_config, load_config_from_str, AppConfig};
pub use mirror::{DuckDbMirrorStore, FileMirrorStore, MemoryMirrorStore, MirrorStore};
pub use remote::{HttpRemoteSource, Item, ItemStatus, ListRequest, Page, RemoteSource};
pub use sync::{SyncConfig, SyncEngine, SyncReport, SyncStats, MAX_SYNC_ATTEMPTS};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
