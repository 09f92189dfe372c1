//! Durable system of record for job statuses.

use async_trait::async_trait;

use crate::db::job_repo;
use crate::db::{Database, DatabaseError};
use crate::error::StoreError;

use super::record::StatusRecord;

/// Durable store. Holds every job from creation and is the sole
/// authority once a job is terminal.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn find(&self, job_id: &str) -> Result<Option<StatusRecord>, StoreError>;

    /// Creates the record. Fails with `AlreadyExists` for a known id.
    async fn insert(&self, record: &StatusRecord) -> Result<(), StoreError>;

    /// Writes the record, creating it if needed. A stored terminal status
    /// is never replaced by a different one.
    async fn save(&self, record: &StatusRecord) -> Result<(), StoreError>;

    async fn recent(&self, limit: u64) -> Result<Vec<StatusRecord>, StoreError>;
}

/// SQLite-backed durable store.
///
/// rusqlite is blocking, so every call runs on the blocking thread pool.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }
}

fn is_unique_violation(err: &DatabaseError) -> bool {
    matches!(
        err,
        DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl DurableStore for SqliteStore {
    async fn find(&self, job_id: &str) -> Result<Option<StatusRecord>, StoreError> {
        let job_id = job_id.to_string();
        self.blocking(move |db| {
            job_repo::find_by_id(db, &job_id)?
                .as_ref()
                .map(StatusRecord::from_job_row)
                .transpose()
        })
        .await
    }

    async fn insert(&self, record: &StatusRecord) -> Result<(), StoreError> {
        let row = record.to_job_row();
        self.blocking(move |db| match job_repo::insert(db, &row) {
            Ok(()) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::AlreadyExists(row.id)),
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn save(&self, record: &StatusRecord) -> Result<(), StoreError> {
        let row = record.to_job_row();
        self.blocking(move |db| Ok(job_repo::upsert(db, &row)?))
            .await
    }

    async fn recent(&self, limit: u64) -> Result<Vec<StatusRecord>, StoreError> {
        self.blocking(move |db| {
            job_repo::list_recent(db, limit)?
                .iter()
                .map(StatusRecord::from_job_row)
                .collect()
        })
        .await
    }
}
