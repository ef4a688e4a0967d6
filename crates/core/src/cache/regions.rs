//! Versioned region store.
//!
//! A region is a named key→response namespace. Four roles exist per cache
//! version; bumping the version yields fresh region names, and regions left
//! over from prior versions are deleted wholesale during activation.

use super::connection::CacheDb;
use super::key::RequestKey;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Role of a storage region within one cache version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionRole {
    /// Critical files installed from the manifest.
    Assets,
    /// Responses captured at runtime by the interceptor.
    Content,
    /// The pre-installed offline fallback page.
    Offline,
    /// The pre-installed not-found fallback page.
    NotFound,
}

impl RegionRole {
    pub const ALL: [RegionRole; 4] = [
        RegionRole::Assets,
        RegionRole::Content,
        RegionRole::Offline,
        RegionRole::NotFound,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RegionRole::Assets => "assets",
            RegionRole::Content => "content",
            RegionRole::Offline => "offline",
            RegionRole::NotFound => "not-found",
        }
    }
}

/// A cached response at rest.
///
/// Owned by exactly one region; immutable once stored except via explicit
/// overwrite on refresh. `fetched_at` mirrors the response's `Date` header
/// at capture time; entries without one are treated as permanently fresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Names and opens the regions belonging to one cache version.
#[derive(Clone, Debug)]
pub struct Registry {
    db: CacheDb,
    version: u32,
}

impl Registry {
    pub fn new(db: CacheDb, version: u32) -> Self {
        Self { db, version }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Open the region for a role under the current version.
    ///
    /// Idempotent: every call for the same role yields a handle onto the
    /// same live store. Regions materialize on first write.
    pub fn open(&self, role: RegionRole) -> Region {
        Region {
            db: self.db.clone(),
            name: format!("{}-v{}", role.as_str(), self.version),
        }
    }

    /// Region names belonging to the current version.
    pub fn current_names(&self) -> Vec<String> {
        RegionRole::ALL
            .iter()
            .map(|role| format!("{}-v{}", role.as_str(), self.version))
            .collect()
    }

    /// Every region name present in the store, across all versions.
    pub async fn known_regions(&self) -> Result<Vec<String>, Error> {
        self.db
            .conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT DISTINCT region FROM entries ORDER BY region")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry of a region. Deleting an absent region is a no-op.
    ///
    /// Returns the number of deleted entries.
    pub async fn delete_region(&self, name: &str) -> Result<u64, Error> {
        let name = name.to_string();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE region = ?1", params![name])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

/// One named key→response store.
///
/// Lookups never cross regions: an entry placed under `content` is invisible
/// to a `get` on `assets`.
#[derive(Clone, Debug)]
pub struct Region {
    db: CacheDb,
    name: String,
}

impl Region {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a stored response by request key.
    ///
    /// Returns None on a miss. A row that cannot be decoded surfaces as
    /// `Error::CorruptEntry`.
    pub async fn get(&self, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let name = self.name.clone();
        let key = key.as_str().to_string();
        self.db
            .conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, content_type, headers_json, body, fetched_at
                     FROM entries WHERE region = ?1 AND key_hash = ?2",
                )?;

                type Row = (String, i64, Option<String>, Option<String>, Vec<u8>, Option<String>);
                let result = stmt.query_row(params![name, key], |row| {
                    Ok::<Row, rusqlite::Error>((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                });

                let (url, status, content_type, headers_json, body, fetched_at) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let headers = match headers_json {
                    Some(json) => serde_json::from_str(&json)
                        .map_err(|e| Error::CorruptEntry(format!("headers for {url}: {e}")))?,
                    None => Vec::new(),
                };
                let fetched_at = fetched_at
                    .map(|s| {
                        DateTime::parse_from_rfc3339(&s)
                            .map(|dt| dt.with_timezone(&Utc))
                            .map_err(|e| Error::CorruptEntry(format!("timestamp for {url}: {e}")))
                    })
                    .transpose()?;

                Ok(Some(StoredResponse {
                    url,
                    status: status as u16,
                    content_type,
                    headers,
                    body,
                    fetched_at,
                }))
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response under the key, overwriting any prior entry.
    pub async fn put(&self, key: &RequestKey, response: &StoredResponse) -> Result<(), Error> {
        let name = self.name.clone();
        let key = key.as_str().to_string();
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::CorruptEntry(format!("headers for {}: {e}", response.url)))?;
        let response = response.clone();
        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (region, key_hash, url, status, content_type, headers_json, body, fetched_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(region, key_hash) DO UPDATE SET
                        url = excluded.url,
                        status = excluded.status,
                        content_type = excluded.content_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        fetched_at = excluded.fetched_at",
                    params![
                        name,
                        key,
                        &response.url,
                        response.status as i64,
                        &response.content_type,
                        headers_json,
                        &response.body,
                        response.fetched_at.map(|dt| dt.to_rfc3339()),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Whether the region holds an entry for the key.
    pub async fn contains(&self, key: &RequestKey) -> Result<bool, Error> {
        let name = self.name.clone();
        let key = key.as_str().to_string();
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let present: bool = conn
                    .query_row(
                        "SELECT EXISTS(SELECT 1 FROM entries WHERE region = ?1 AND key_hash = ?2)",
                        params![name, key],
                        |row| row.get(0),
                    )
                    .map_err(Error::from)?;
                Ok(present)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries currently stored in the region.
    pub async fn entry_count(&self) -> Result<u64, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn
                    .query_row("SELECT COUNT(*) FROM entries WHERE region = ?1", params![name], |row| {
                        row.get(0)
                    })
                    .map_err(Error::from)?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_response(url: &str, body: &str) -> StoredResponse {
        StoredResponse {
            url: url.to_string(),
            status: 200,
            content_type: Some("text/html".to_string()),
            headers: vec![("date".to_string(), "Mon, 01 Jan 2024 00:00:00 GMT".to_string())],
            body: body.as_bytes().to_vec(),
            fetched_at: Some(Utc::now()),
        }
    }

    async fn registry() -> Registry {
        Registry::new(CacheDb::open_in_memory().await.unwrap(), 1)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let content = registry().await.open(RegionRole::Content);
        let key = RequestKey::get("https://example.com/a.html");
        let response = make_response("https://example.com/a.html", "<html>a</html>");

        content.put(&key, &response).await.unwrap();

        let retrieved = content.get(&key).await.unwrap().unwrap();
        assert_eq!(retrieved.url, response.url);
        assert_eq!(retrieved.body, response.body);
        assert_eq!(retrieved.headers, response.headers);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let content = registry().await.open(RegionRole::Content);
        let key = RequestKey::get("https://example.com/absent.html");
        assert!(content.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_regions_are_isolated() {
        let registry = registry().await;
        let content = registry.open(RegionRole::Content);
        let assets = registry.open(RegionRole::Assets);
        let key = RequestKey::get("https://example.com/a.html");

        assets
            .put(&key, &make_response("https://example.com/a.html", "installed"))
            .await
            .unwrap();

        assert!(content.get(&key).await.unwrap().is_none());
        assert!(assets.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let content = registry().await.open(RegionRole::Content);
        let key = RequestKey::get("https://example.com/a.html");

        content
            .put(&key, &make_response("https://example.com/a.html", "old"))
            .await
            .unwrap();
        content
            .put(&key, &make_response("https://example.com/a.html", "new"))
            .await
            .unwrap();

        let retrieved = content.get(&key).await.unwrap().unwrap();
        assert_eq!(retrieved.body, b"new");
        assert_eq!(content.entry_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_timestamp_roundtrip() {
        let content = registry().await.open(RegionRole::Content);
        let key = RequestKey::get("https://example.com/a.html");
        let mut response = make_response("https://example.com/a.html", "a");
        response.fetched_at = None;

        content.put(&key, &response).await.unwrap();

        let retrieved = content.get(&key).await.unwrap().unwrap();
        assert!(retrieved.fetched_at.is_none());
    }

    #[tokio::test]
    async fn test_delete_region_scoped() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let v1 = Registry::new(db.clone(), 1);
        let v2 = Registry::new(db, 2);
        let key = RequestKey::get("https://example.com/a.html");
        let response = make_response("https://example.com/a.html", "a");

        v1.open(RegionRole::Content).put(&key, &response).await.unwrap();
        v2.open(RegionRole::Content).put(&key, &response).await.unwrap();

        let deleted = v2.delete_region("content-v1").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(v1.open(RegionRole::Content).get(&key).await.unwrap().is_none());
        assert!(v2.open(RegionRole::Content).get(&key).await.unwrap().is_some());

        // absent region: no-op
        assert_eq!(v2.delete_region("content-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_known_regions() {
        let registry = registry().await;
        let key = RequestKey::get("https://example.com/a.html");
        let response = make_response("https://example.com/a.html", "a");

        registry.open(RegionRole::Content).put(&key, &response).await.unwrap();
        registry.open(RegionRole::Offline).put(&key, &response).await.unwrap();

        let names = registry.known_regions().await.unwrap();
        assert_eq!(names, vec!["content-v1".to_string(), "offline-v1".to_string()]);
    }

    #[test]
    fn test_current_names() {
        let role_names: Vec<String> = RegionRole::ALL.iter().map(|r| r.as_str().to_string()).collect();
        assert_eq!(role_names, vec!["assets", "content", "offline", "not-found"]);
    }
}
