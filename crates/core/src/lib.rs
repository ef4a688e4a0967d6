//! Core types and shared functionality for stow.
//!
//! This crate provides:
//! - Versioned region store with SQLite backend
//! - Freshness policy (TTL by file extension)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod ttl;

pub use cache::{CacheDb, Region, RegionRole, Registry, RequestKey, StoredResponse};
pub use config::EngineConfig;
pub use error::Error;
pub use ttl::TtlTable;
