//! Caching layer in front of a timetable backend.
//!
//! Every round of a search asks for the stop times and transfers of each
//! frontier stop, and concurrent searches over the same network ask for the
//! same popular stops. Caching the per-stop answers avoids hitting the
//! backing store for each of them.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::domain::{StopId, Transfer};

use super::{StopTimeEvent, TimetableError, TimetablePort};

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries per lookup kind.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_capacity: 10_000,
        }
    }
}

/// Timetable port with caching.
///
/// Wraps any [`TimetablePort`] and caches per-stop answers. Errors are not
/// cached.
pub struct CachedTimetable<P> {
    inner: P,
    exists: MokaCache<StopId, bool>,
    stop_times: MokaCache<StopId, Arc<Vec<StopTimeEvent>>>,
    transfers: MokaCache<StopId, Arc<Vec<Transfer>>>,
}

impl<P: TimetablePort> CachedTimetable<P> {
    /// Create a new cached port.
    pub fn new(inner: P, config: &CacheConfig) -> Self {
        Self {
            inner,
            exists: build_cache(config),
            stop_times: build_cache(config),
            transfers: build_cache(config),
        }
    }

    /// Access the wrapped port.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.exists.invalidate_all();
        self.stop_times.invalidate_all();
        self.transfers.invalidate_all();
    }
}

fn build_cache<V: Clone + Send + Sync + 'static>(config: &CacheConfig) -> MokaCache<StopId, V> {
    MokaCache::builder()
        .time_to_live(config.ttl)
        .max_capacity(config.max_capacity)
        .build()
}

impl<P: TimetablePort> TimetablePort for CachedTimetable<P> {
    async fn stop_exists(&self, stop: &StopId) -> Result<bool, TimetableError> {
        if let Some(cached) = self.exists.get(stop).await {
            return Ok(cached);
        }
        let exists = self.inner.stop_exists(stop).await?;
        self.exists.insert(stop.clone(), exists).await;
        Ok(exists)
    }

    async fn stop_times_at(&self, stop: &StopId) -> Result<Vec<StopTimeEvent>, TimetableError> {
        if let Some(cached) = self.stop_times.get(stop).await {
            return Ok(cached.as_ref().clone());
        }
        let events = self.inner.stop_times_at(stop).await?;
        self.stop_times
            .insert(stop.clone(), Arc::new(events.clone()))
            .await;
        Ok(events)
    }

    async fn transfers_from(&self, stop: &StopId) -> Result<Vec<Transfer>, TimetableError> {
        if let Some(cached) = self.transfers.get(stop).await {
            return Ok(cached.as_ref().clone());
        }
        let transfers = self.inner.transfers_from(stop).await?;
        self.transfers
            .insert(stop.clone(), Arc::new(transfers.clone()))
            .await;
        Ok(transfers)
    }
}
