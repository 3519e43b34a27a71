//! Remote source module
//!
//! The sync engine only sees [`RemoteSource::list`]. [`HttpRemoteSource`]
//! implements it over a JSON list endpoint shaped like Google Calendar's
//! `events.list` (sync tokens, page tokens, `cancelled` tombstones), with
//! every parameter and field name configurable.

mod http;
mod source;
mod types;

pub use http::HttpRemoteSource;
pub use source::RemoteSource;
pub use types::{Item, ItemStatus, ListRequest, Page};
