//! Append-only record caches, one lock per record kind.

use std::collections::HashMap;
use std::future::Future;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::trace;
use vod_proto::catalog::{Driver, Episode, Team};

use super::CatalogSource;

/// ID → record map for a single record kind.
///
/// The first record stored under an ID wins; entries are never replaced or
/// evicted. The lock is not held across the fetch, so two tasks missing the
/// same ID may both fetch, but only one result is kept.
pub struct RecordCache<T> {
    kind: &'static str,
    entries: RwLock<HashMap<String, T>>,
}

impl<T: Clone> RecordCache<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, id: &str) -> Option<T> {
        self.entries.read().await.get(id).cloned()
    }

    /// Store `record` unless `id` is already present; returns the stored record.
    pub async fn insert(&self, id: &str, record: T) -> T {
        let mut entries = self.entries.write().await;
        entries.entry(id.to_string()).or_insert(record).clone()
    }

    pub async fn get_or_fetch<F, Fut>(&self, id: &str, fetch: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(hit) = self.get(id).await {
            trace!("{} cache hit: {}", self.kind, id);
            return Ok(hit);
        }
        let fetched = fetch().await?;
        Ok(self.insert(id, fetched).await)
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// The caches shared by every task that touches the catalog.
pub struct CatalogCache {
    pub episodes: RecordCache<Episode>,
    pub drivers: RecordCache<Driver>,
    pub teams: RecordCache<Team>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self {
            episodes: RecordCache::new("episode"),
            drivers: RecordCache::new("driver"),
            teams: RecordCache::new("team"),
        }
    }

    pub async fn episode(&self, catalog: &dyn CatalogSource, id: &str) -> Result<Episode> {
        self.episodes.get_or_fetch(id, || catalog.episode(id)).await
    }

    pub async fn driver(&self, catalog: &dyn CatalogSource, id: &str) -> Result<Driver> {
        self.drivers.get_or_fetch(id, || catalog.driver(id)).await
    }

    pub async fn team(&self, catalog: &dyn CatalogSource, id: &str) -> Result<Team> {
        self.teams.get_or_fetch(id, || catalog.team(id)).await
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}
