//! Status repository over the cache and durable stores.
//!
//! Reads go to the cache first and fall back to the durable store.
//! In-flight transitions are written to the cache only; creation and
//! terminal transitions are written to the cache first and then to the
//! durable store, so every finished, failed or stopped job has a durable
//! record. The cache must keep in-flight records, since it is their only
//! current copy (see [`CacheStore`]). There is no cross-store transaction: a crash between the two
//! terminal writes leaves the stores disagreeing until the next write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::broadcast::{StatusBroadcaster, StatusEvent};
use crate::error::StoreError;
use crate::status::{JobStatus, Transition};

use super::cache::CacheStore;
use super::durable::DurableStore;
use super::record::{StatusRecord, StatusUpdate};

/// Result of a status write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The write was applied; holds the updated record.
    Applied(StatusRecord),
    /// The job already had the requested status.
    Unchanged(JobStatus),
    /// The transition rule refused the write.
    Rejected { current: JobStatus },
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied(_))
    }

    /// Status of the job after the write attempt.
    pub fn status(&self) -> JobStatus {
        match self {
            WriteOutcome::Applied(record) => record.status,
            WriteOutcome::Unchanged(status) => *status,
            WriteOutcome::Rejected { current } => *current,
        }
    }
}

/// Per-job async locks so read-check-write sequences of one job never
/// interleave inside this process.
///
/// An entry lives only while some task holds or waits for its lock.
#[derive(Default)]
struct JobLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl JobLocks {
    fn table(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job lock table was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    async fn acquire(&self, job_id: &str) -> JobLockGuard<'_> {
        // Created before the wait so a cancelled wait still cleans up.
        let mut held = JobLockGuard {
            locks: self,
            job_id: job_id.to_string(),
            guard: None,
        };
        let lock = Arc::clone(self.table().entry(job_id.to_string()).or_default());
        held.guard = Some(lock.lock_owned().await);
        held
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table().len()
    }
}

/// Holds one job's write lock. On drop the table entry is removed unless
/// another task still holds or waits for it.
struct JobLockGuard<'a> {
    locks: &'a JobLocks,
    job_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for JobLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut table = self.locks.table();
        let idle = table
            .get(&self.job_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            table.remove(&self.job_id);
        }
    }
}

/// Reads and writes job statuses across both stores.
pub struct StatusRepository {
    cache: Arc<dyn CacheStore>,
    durable: Arc<dyn DurableStore>,
    events: StatusBroadcaster,
    locks: JobLocks,
}

impl StatusRepository {
    pub fn new(cache: Arc<dyn CacheStore>, durable: Arc<dyn DurableStore>) -> Self {
        Self::with_broadcaster(cache, durable, StatusBroadcaster::default())
    }

    pub fn with_broadcaster(
        cache: Arc<dyn CacheStore>,
        durable: Arc<dyn DurableStore>,
        events: StatusBroadcaster,
    ) -> Self {
        Self {
            cache,
            durable,
            events,
            locks: JobLocks::default(),
        }
    }

    pub fn events(&self) -> &StatusBroadcaster {
        &self.events
    }

    /// Creates a new job record in both stores.
    ///
    /// If the durable insert fails the cache entry is dropped again so the
    /// job does not appear to exist.
    pub async fn create(&self, record: StatusRecord) -> Result<StatusRecord, StoreError> {
        let _lock = self.locks.acquire(&record.id).await;

        if self.get(&record.id).await?.is_some() {
            return Err(StoreError::AlreadyExists(record.id));
        }

        self.cache.put(record.clone()).await?;
        if let Err(e) = self.durable.insert(&record).await {
            if let Err(evict_err) = self.cache.evict(&record.id).await {
                log::warn!(
                    "Failed to evict job {} after durable insert failure: {}",
                    record.id,
                    evict_err
                );
            }
            return Err(e);
        }

        log::debug!("Job {} created with status {}", record.id, record.status);
        self.events.send(StatusEvent::new(&record.id, record.status));
        Ok(record)
    }

    /// Returns the job's current record, cache first, durable fallback.
    pub async fn get(&self, job_id: &str) -> Result<Option<StatusRecord>, StoreError> {
        if let Some(record) = self.cache.get(job_id).await? {
            return Ok(Some(record));
        }
        self.durable.find(job_id).await
    }

    /// Returns just the job's current status.
    pub async fn read_status(&self, job_id: &str) -> Result<Option<JobStatus>, StoreError> {
        Ok(self.get(job_id).await?.map(|record| record.status))
    }

    /// Applies `update` if the transition rule allows it.
    ///
    /// Fails with `NotFound` for an unknown job. Store failures are
    /// returned as errors; a refused transition is `Ok(Rejected)`.
    pub async fn write_status(
        &self,
        job_id: &str,
        update: StatusUpdate,
    ) -> Result<WriteOutcome, StoreError> {
        let _lock = self.locks.acquire(job_id).await;

        let record = self
            .get(job_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        self.apply(record, update).await
    }

    /// Like `write_status`, but a job missing from both stores is recreated
    /// from `source_path` and then updated.
    ///
    /// Used to settle a job whose record was lost while it was running.
    pub async fn write_status_or_restore(
        &self,
        job_id: &str,
        source_path: &str,
        update: StatusUpdate,
    ) -> Result<WriteOutcome, StoreError> {
        let _lock = self.locks.acquire(job_id).await;

        let record = match self.get(job_id).await? {
            Some(record) => record,
            None => {
                log::warn!(
                    "Job {} has no record in either store, restoring it as {}",
                    job_id,
                    update.status
                );
                StatusRecord::received(job_id, source_path)
            }
        };
        self.apply(record, update).await
    }

    /// Checks the transition rule and writes the result. The caller holds
    /// the job's lock.
    async fn apply(
        &self,
        mut record: StatusRecord,
        update: StatusUpdate,
    ) -> Result<WriteOutcome, StoreError> {
        match record.status.transition_to(update.status) {
            Transition::Rejected => {
                log::warn!(
                    "Rejected status write for job {}: {} -> {}",
                    record.id,
                    record.status,
                    update.status
                );
                return Ok(WriteOutcome::Rejected {
                    current: record.status,
                });
            }
            Transition::Unchanged => return Ok(WriteOutcome::Unchanged(record.status)),
            Transition::Allowed => {}
        }

        let previous = record.status;
        record.apply(&update);

        self.cache.put(record.clone()).await?;
        if record.status.is_terminal() {
            self.durable.save(&record).await?;
        }

        log::debug!("Job {}: {} -> {}", record.id, previous, record.status);
        self.events.send(
            StatusEvent::new(&record.id, record.status).with_error(record.error.clone()),
        );
        Ok(WriteOutcome::Applied(record))
    }

    /// Most recently created jobs from the durable store.
    pub async fn recent(&self, limit: u64) -> Result<Vec<StatusRecord>, StoreError> {
        self.durable.recent(limit).await
    }
}
