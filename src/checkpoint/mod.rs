//! Checkpoint store module
//!
//! Persists the opaque sync checkpoint ("sync token") of a collection
//! between runs, so the next run can ask the remote only for changes.
//!
//! # Overview
//!
//! The checkpoint module provides:
//! - `CheckpointStore` - the get/set/clear contract used by the sync engine
//! - `FileCheckpointStore` - JSON state file with atomic, fsynced writes
//! - `MemoryCheckpointStore` - process-local store for tests and dry runs

mod store;
mod types;

pub use store::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use types::{CheckpointState, CollectionState};
