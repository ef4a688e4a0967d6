//! SQLite-backed versioned region store.
//!
//! Regions are named key→response namespaces, one set of four roles per
//! cache version. The store uses async SQLite access via tokio-rusqlite
//! with:
//!
//! - Request-keyed storage using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Whole-region deletion for version cleanup

pub mod connection;
pub mod key;
pub mod migrations;
pub mod regions;

pub use connection::CacheDb;
pub use key::RequestKey;
pub use regions::{Region, RegionRole, Registry, StoredResponse};
