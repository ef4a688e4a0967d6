//! Scripted network and engine builders for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};

use crate::engine::CacheEngine;
use stow_client::{Fetch, FetchResponse, HeaderMap, Method, StatusCode, Url};
use stow_core::{CacheDb, EngineConfig, Error, RegionRole, RequestKey, StoredResponse};

enum Script {
    Respond { status: u16, body: Vec<u8> },
    Fail(String),
}

/// A fetcher whose answers are scripted per URL. Unscripted URLs behave as
/// network failures.
#[derive(Default)]
pub struct StubFetch {
    scripted: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
}

impl StubFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) {
        self.scripted
            .lock()
            .unwrap()
            .insert(url.to_string(), Script::Respond { status, body: body.as_bytes().to_vec() });
    }

    pub fn fail(&self, url: &str, reason: &str) {
        self.scripted
            .lock()
            .unwrap()
            .insert(url.to_string(), Script::Fail(reason.to_string()));
    }

    /// Total fetches issued, across both `get` and `forward`.
    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn respond_to(&self, url: &Url) -> Result<FetchResponse, Error> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.scripted.lock().unwrap().get(url.as_str()) {
            Some(Script::Respond { status, body }) => Ok(FetchResponse {
                url: url.clone(),
                final_url: url.clone(),
                status: StatusCode::from_u16(*status).unwrap(),
                content_type: Some("text/html".to_string()),
                bytes: Bytes::from(body.clone()),
                headers: HeaderMap::new(),
                fetch_ms: 1,
            }),
            Some(Script::Fail(reason)) => Err(Error::Network(reason.clone())),
            None => Err(Error::Network(format!("no scripted response for {url}"))),
        }
    }
}

#[async_trait]
impl Fetch for StubFetch {
    async fn get(&self, url: &Url) -> Result<FetchResponse, Error> {
        self.respond_to(url)
    }

    async fn forward(&self, _method: Method, url: &Url, _headers: HeaderMap) -> Result<FetchResponse, Error> {
        self.respond_to(url)
    }
}

/// Engine over an in-memory store and a scripted fetcher.
pub async fn engine_with(config: EngineConfig, fetch: Arc<StubFetch>) -> CacheEngine {
    let db = CacheDb::open_in_memory().await.unwrap();
    CacheEngine::new(config, db, fetch).unwrap()
}

/// Place an entry directly into a region. `age_seconds` of None stores an
/// entry without a capture timestamp.
pub async fn seed_entry(engine: &CacheEngine, role: RegionRole, url: &str, body: &str, age_seconds: Option<i64>) {
    let entry = StoredResponse {
        url: url.to_string(),
        status: 200,
        content_type: Some("text/html".to_string()),
        headers: Vec::new(),
        body: body.as_bytes().to_vec(),
        fetched_at: age_seconds.map(|age| Utc::now() - Duration::seconds(age)),
    };
    engine
        .registry()
        .open(role)
        .put(&RequestKey::get(url), &entry)
        .await
        .unwrap();
}
