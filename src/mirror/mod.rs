//! Mirror store module
//!
//! Holds the local copy of the remote collection: item id -> last applied
//! serialized payload. This mapping is the durable output of a sync.
//!
//! # Overview
//!
//! The mirror module provides:
//! - `MirrorStore` - upsert/delete/contains/clear contract used by the engine
//! - `FileMirrorStore` - whole-map JSON file, rewritten atomically per change
//! - `DuckDbMirrorStore` - `mirror_entries` table in a DuckDB database file
//! - `MemoryMirrorStore` - process-local store for tests and dry runs
//!
//! Every mutation is idempotent: re-applying a page after a failed pass
//! leaves the store exactly as a single application would.

mod database;
mod store;
mod types;

pub use database::DuckDbMirrorStore;
pub use store::{FileMirrorStore, MemoryMirrorStore, MirrorStore};
pub use types::{MirrorEntry, MirrorFile};

#[cfg(test)]
mod tests;
