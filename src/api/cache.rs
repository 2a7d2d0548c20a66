//! TTL cache for catalog responses.
//!
//! The cache belongs to whoever constructs the [`CachedCatalog`]; there is no
//! process-wide cache. Entries expire after the configured TTL and can be
//! invalidated explicitly (e.g. after an upload).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use super::error::ApiError;
use super::types::{DatasetStats, DatasetSummary, TaskInfo, UploadedFile};
use super::DatasetCatalog;

/// Keyed values that go stale after a fixed TTL
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh value for `key`, if any. Stale entries are evicted on read.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some((stored_at, value)) if stored_at.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: &str, value: V) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (Instant::now(), value));
        }
    }

    pub fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

const LIST_KEY: &str = "";

/// Wraps a [`DatasetCatalog`] and memoizes its responses.
///
/// Errors are never cached.
pub struct CachedCatalog<C: DatasetCatalog> {
    inner: C,
    datasets: TtlCache<Vec<DatasetSummary>>,
    files: TtlCache<Vec<UploadedFile>>,
    stats: TtlCache<DatasetStats>,
    tasks: TtlCache<Vec<TaskInfo>>,
}

impl<C: DatasetCatalog> CachedCatalog<C> {
    pub fn new(inner: C, ttl: Duration) -> Self {
        Self {
            inner,
            datasets: TtlCache::new(ttl),
            files: TtlCache::new(ttl),
            stats: TtlCache::new(ttl),
            tasks: TtlCache::new(ttl),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Drop cached stats and tasks for one dataset, plus the listings
    pub fn invalidate_dataset(&self, key: &str) {
        self.stats.invalidate(key);
        self.tasks.invalidate(key);
        self.datasets.invalidate(LIST_KEY);
        self.files.invalidate(LIST_KEY);
    }

    pub fn invalidate_all(&self) {
        self.datasets.clear();
        self.files.clear();
        self.stats.clear();
        self.tasks.clear();
    }
}

#[async_trait]
impl<C: DatasetCatalog> DatasetCatalog for CachedCatalog<C> {
    async fn list_datasets(&self) -> Result<Vec<DatasetSummary>, ApiError> {
        if let Some(hit) = self.datasets.get(LIST_KEY) {
            debug!("dataset list served from cache");
            return Ok(hit);
        }
        let fresh = self.inner.list_datasets().await?;
        self.datasets.insert(LIST_KEY, fresh.clone());
        Ok(fresh)
    }

    async fn dataset_stats(&self, filename: &str) -> Result<DatasetStats, ApiError> {
        if let Some(hit) = self.stats.get(filename) {
            debug!(filename, "dataset stats served from cache");
            return Ok(hit);
        }
        let fresh = self.inner.dataset_stats(filename).await?;
        self.stats.insert(filename, fresh.clone());
        Ok(fresh)
    }

    async fn list_tasks(&self, dataset_id: &str) -> Result<Vec<TaskInfo>, ApiError> {
        if let Some(hit) = self.tasks.get(dataset_id) {
            return Ok(hit);
        }
        let fresh = self.inner.list_tasks(dataset_id).await?;
        self.tasks.insert(dataset_id, fresh.clone());
        Ok(fresh)
    }

    async fn list_uploaded_files(&self) -> Result<Vec<UploadedFile>, ApiError> {
        if let Some(hit) = self.files.get(LIST_KEY) {
            return Ok(hit);
        }
        let fresh = self.inner.list_uploaded_files().await?;
        self.files.insert(LIST_KEY, fresh.clone());
        Ok(fresh)
    }
}
