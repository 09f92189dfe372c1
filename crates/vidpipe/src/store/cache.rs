//! Fast mutable status store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;

use crate::config::CacheConfig;
use crate::error::StoreError;

use super::record::StatusRecord;

/// Cache store holding the live status of in-flight jobs.
///
/// While a job is in flight the cache is its only up-to-date record, so an
/// implementation must keep non-terminal records until they are overwritten
/// or explicitly evicted. Terminal records may be dropped at any time; the
/// durable store holds them.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, job_id: &str) -> Result<Option<StatusRecord>, StoreError>;

    async fn put(&self, record: StatusRecord) -> Result<(), StoreError>;

    async fn evict(&self, job_id: &str) -> Result<(), StoreError>;
}

/// In-process cache store.
///
/// In-flight records sit in a pinned table that is never evicted. Terminal
/// records move to a moka cache bounded by capacity and idle time.
#[derive(Clone)]
pub struct MemoryCache {
    in_flight: Arc<Mutex<HashMap<String, StatusRecord>>>,
    settled: Cache<String, StatusRecord>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64, time_to_idle: Duration) -> Self {
        let settled = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(time_to_idle)
            .build();
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            settled,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.max_capacity,
            Duration::from_secs(config.time_to_idle_secs),
        )
    }

    /// Number of pinned in-flight records.
    pub fn in_flight_count(&self) -> usize {
        self.pinned().len()
    }

    fn pinned(&self) -> MutexGuard<'_, HashMap<String, StatusRecord>> {
        match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("In-flight cache table was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, job_id: &str) -> Result<Option<StatusRecord>, StoreError> {
        if let Some(record) = self.pinned().get(job_id).cloned() {
            return Ok(Some(record));
        }
        Ok(self.settled.get(job_id))
    }

    async fn put(&self, record: StatusRecord) -> Result<(), StoreError> {
        if record.status.is_terminal() {
            self.pinned().remove(&record.id);
            self.settled.insert(record.id.clone(), record);
        } else {
            self.settled.invalidate(&record.id);
            self.pinned().insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn evict(&self, job_id: &str) -> Result<(), StoreError> {
        self.pinned().remove(job_id);
        self.settled.invalidate(job_id);
        Ok(())
    }
}
