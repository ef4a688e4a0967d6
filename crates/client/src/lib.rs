//! HTTP fetch pipeline for stow.
//!
//! This crate provides:
//! - The `Fetch` trait seam the engine talks to
//! - A reqwest-backed client with bounded timeout, redirects, and body size
//! - URL resolution against the configured origin
//! - The local/dev passthrough predicate

pub mod fetch;

pub use fetch::{Fetch, FetchClient, FetchConfig, FetchResponse, Passthrough};
pub use fetch::url::{UrlError, parse_origin, resolve};

pub use reqwest::{Method, StatusCode, Url};
pub use reqwest::header::{self, HeaderMap};
