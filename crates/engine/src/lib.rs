//! The stow cache engine.
//!
//! Sits between an application's presentation layer and the network:
//! installs a manifest of critical files, intercepts every request to serve
//! from versioned cache regions by freshness policy, revalidates stale
//! entries, degrades to pre-installed fallback pages, and takes pre-cache
//! commands over an asynchronous channel.

pub mod cleanup;
pub mod commands;
pub mod engine;
pub mod install;
pub mod intercept;

#[cfg(test)]
mod testing;

pub use commands::Command;
pub use engine::{CacheEngine, LifecycleEvent};
pub use intercept::{Intercepted, Request, Served};
