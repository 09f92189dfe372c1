//! Test doubles shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::chain::{Endpoint, StageResponse, Transport};
use crate::db::Database;
use crate::error::{StoreError, TransportError};
use crate::store::{CacheStore, MemoryCache, SqliteStore, StatusRecord, StatusRepository};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub route: String,
    pub payload: Value,
}

#[derive(Clone)]
enum Scripted {
    Respond(StageResponse),
    Fail,
}

/// Transport that answers from per-route scripts and records every call.
///
/// One-shot answers are consumed first; after that the route's standing
/// answer is used, and unscripted routes answer `200` with an empty body.
#[derive(Default)]
pub struct ScriptedTransport {
    once: Mutex<HashMap<String, VecDeque<Scripted>>>,
    standing: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, route: &str, response: StageResponse) {
        self.standing
            .lock()
            .unwrap()
            .insert(route.to_string(), Scripted::Respond(response));
    }

    pub fn respond_once(&self, route: &str, response: StageResponse) {
        self.once
            .lock()
            .unwrap()
            .entry(route.to_string())
            .or_default()
            .push_back(Scripted::Respond(response));
    }

    pub fn fail(&self, route: &str) {
        self.standing
            .lock()
            .unwrap()
            .insert(route.to_string(), Scripted::Fail);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, route: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.route == route)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(
        &self,
        destination: &Endpoint,
        payload: &Value,
    ) -> Result<StageResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            route: destination.route.clone(),
            payload: payload.clone(),
        });

        let next_once = self
            .once
            .lock()
            .unwrap()
            .get_mut(&destination.route)
            .and_then(VecDeque::pop_front);
        let scripted = next_once.or_else(|| {
            self.standing
                .lock()
                .unwrap()
                .get(&destination.route)
                .cloned()
        });

        match scripted {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail) => Err(TransportError::Request {
                destination: destination.to_string(),
                reason: "connection refused".to_string(),
            }),
            None => Ok(StageResponse::ok("")),
        }
    }
}

/// Cache store whose reads or writes can be switched to fail.
#[derive(Default)]
pub struct FlakyCache {
    inner: MemoryCache,
    failing_reads: AtomicUsize,
    fail_writes: AtomicBool,
}

impl FlakyCache {
    pub fn fail_reads(&self, fail: bool) {
        let count = if fail { usize::MAX } else { 0 };
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Fails only the next `n` reads.
    pub fn fail_next_reads(&self, n: usize) {
        self.failing_reads.store(n, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStore for FlakyCache {
    async fn get(&self, job_id: &str) -> Result<Option<StatusRecord>, StoreError> {
        let remaining = self.failing_reads.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != usize::MAX {
                self.failing_reads.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(StoreError::Cache("cache unreachable".to_string()));
        }
        self.inner.get(job_id).await
    }

    async fn put(&self, record: StatusRecord) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Cache("cache unreachable".to_string()));
        }
        self.inner.put(record).await
    }

    async fn evict(&self, job_id: &str) -> Result<(), StoreError> {
        self.inner.evict(job_id).await
    }
}

/// Repository over a default `MemoryCache` and an in-memory SQLite database.
pub fn memory_repository() -> Arc<StatusRepository> {
    repository_with_cache(Arc::new(MemoryCache::default()))
}

/// Repository over the given cache and an in-memory SQLite database.
pub fn repository_with_cache(cache: Arc<dyn CacheStore>) -> Arc<StatusRepository> {
    let durable = SqliteStore::new(Database::open_in_memory().unwrap());
    Arc::new(StatusRepository::new(cache, Arc::new(durable)))
}

/// Repository whose cache can be made to fail.
pub fn flaky_repository() -> (Arc<FlakyCache>, Arc<StatusRepository>) {
    let cache = Arc::new(FlakyCache::default());
    let durable = SqliteStore::new(Database::open_in_memory().unwrap());
    let repo = Arc::new(StatusRepository::new(cache.clone(), Arc::new(durable)));
    (cache, repo)
}
