//! Entry point tying intake, status queries and stop requests to the
//! job runner and the status repository.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::broadcast::StatusEvent;
use crate::cancel::{CancellationSurface, StopOutcome};
use crate::chain::{HttpTransport, Transport};
use crate::config::Config;
use crate::db::{default_database_path, Database};
use crate::error::{ConfigError, Result, StoreError, VidpipeError};
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::status::JobStatus;
use crate::store::{MemoryCache, SqliteStore, StatusRecord, StatusRepository, StatusUpdate};
use crate::worker::{Job, JobReport, JobRunner};

/// Prefix some clients put in front of job ids.
const LEGACY_ID_PREFIX: &str = "request:";

/// A job accepted at intake.
pub struct JobTicket {
    pub job_id: String,
    /// Resolves when the job's run ends.
    pub handle: JoinHandle<JobReport>,
}

/// What a status query returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatusView {
    pub id: String,
    pub status: JobStatus,
    pub source_path: String,
    /// Detection result, only once the job has finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StatusRecord> for JobStatusView {
    fn from(record: StatusRecord) -> Self {
        let result = match record.status {
            JobStatus::Finished => record.result,
            _ => None,
        };
        Self {
            id: record.id,
            status: record.status,
            source_path: record.source_path,
            result,
            error: record.error,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

pub struct Orchestrator {
    repo: Arc<StatusRepository>,
    runner: JobRunner,
    cancel: CancellationSurface,
}

impl Orchestrator {
    pub fn new(config: &Config, transport: Arc<dyn Transport>, repo: Arc<StatusRepository>) -> Self {
        let pipeline_config = Arc::new(PipelineConfig::from_config(config));
        let pipeline = Arc::new(Pipeline::new(pipeline_config, transport, Arc::clone(&repo)));
        Self {
            runner: JobRunner::new(pipeline, config.max_concurrent_jobs),
            cancel: CancellationSurface::new(Arc::clone(&repo)),
            repo,
        }
    }

    /// Production constructor: opens the SQLite store, builds the cache
    /// and the HTTP transport from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let db_path = match &config.database.path {
            Some(path) => PathBuf::from(path),
            None => default_database_path().ok_or_else(|| ConfigError::Validation {
                message: "could not determine a home directory for the database".to_string(),
            })?,
        };
        info!(path = %db_path.display(), "Opening status database");
        let db = Database::open(&db_path)?;

        let repo = Arc::new(StatusRepository::new(
            Arc::new(MemoryCache::from_config(&config.cache)),
            Arc::new(SqliteStore::new(db)),
        ));
        let transport = Arc::new(HttpTransport::new(&config.http)?);
        Ok(Self::new(config, transport, repo))
    }

    /// Records a new `Received` job and hands it to the runner.
    pub async fn submit(&self, source_path: &str) -> Result<JobTicket> {
        let source_path = source_path.trim();
        if source_path.is_empty() {
            return Err(VidpipeError::InvalidRequest(
                "source path must not be empty".to_string(),
            ));
        }
        if self.runner.is_shutdown() {
            return Err(VidpipeError::ShuttingDown);
        }

        let job = Job::new(source_path);
        self.repo
            .create(StatusRecord::received(&job.id, &job.source_path))
            .await?;
        info!(job_id = %job.id, source_path, "Job received");

        let job_id = job.id.clone();
        match self.runner.submit(job) {
            Ok(handle) => Ok(JobTicket { job_id, handle }),
            Err(e) => {
                // Shutdown began between the check above and now.
                if let Err(write_err) = self
                    .repo
                    .write_status(&job_id, StatusUpdate::failed(e.to_string()))
                    .await
                {
                    warn!(job_id = %job_id, error = %write_err, "Could not fail unscheduled job");
                }
                Err(e)
            }
        }
    }

    pub async fn status(&self, job_id: &str) -> Result<JobStatusView> {
        let job_id = normalize_job_id(job_id);
        self.repo
            .get(job_id)
            .await?
            .map(JobStatusView::from)
            .ok_or_else(|| VidpipeError::JobNotFound(job_id.to_string()))
    }

    pub async fn stop(&self, job_id: &str) -> Result<StopOutcome> {
        let job_id = normalize_job_id(job_id);
        self.cancel.stop(job_id).await.map_err(|e| match e {
            StoreError::NotFound(id) => VidpipeError::JobNotFound(id),
            other => VidpipeError::Store(other),
        })
    }

    /// Most recently created jobs, newest first.
    pub async fn recent(&self, limit: u64) -> Result<Vec<JobStatusView>> {
        Ok(self
            .repo
            .recent(limit)
            .await?
            .into_iter()
            .map(JobStatusView::from)
            .collect())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.repo.events().subscribe()
    }

    pub async fn wait_idle(&self) {
        self.runner.wait_idle().await
    }

    pub fn shutdown(&self) {
        self.runner.shutdown()
    }
}

fn normalize_job_id(job_id: &str) -> &str {
    let job_id = job_id.trim();
    job_id.strip_prefix(LEGACY_ID_PREFIX).unwrap_or(job_id)
}
