//! Cooperative cancellation checkpoints.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ReadFailurePolicy;
use crate::status::JobStatus;
use crate::store::StatusRepository;

/// Why a checkpoint told the caller to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// The live status is not the one the caller expects.
    Status(JobStatus),
    /// The job no longer exists in either store.
    Missing,
    /// The status could not be read and the policy says stop.
    ReadFailed(String),
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::Status(status) => write!(f, "job is {}", status),
            HaltReason::Missing => write!(f, "job record disappeared"),
            HaltReason::ReadFailed(e) => write!(f, "status read failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checkpoint {
    Proceed,
    Halt(HaltReason),
}

impl Checkpoint {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Checkpoint::Proceed)
    }
}

/// Consulted by a running job before each unit of remote work.
#[async_trait]
pub trait CancellationCheck: Send + Sync {
    /// Proceeds only while the job's live status equals `expected`.
    async fn check(&self, expected: JobStatus) -> Checkpoint;
}

/// Checkpoint backed by the job's live status in the repository.
#[derive(Clone)]
pub struct StatusCheckpoint {
    repo: Arc<StatusRepository>,
    job_id: String,
    on_read_failure: ReadFailurePolicy,
}

impl StatusCheckpoint {
    pub fn new(
        repo: Arc<StatusRepository>,
        job_id: impl Into<String>,
        on_read_failure: ReadFailurePolicy,
    ) -> Self {
        Self {
            repo,
            job_id: job_id.into(),
            on_read_failure,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }
}

#[async_trait]
impl CancellationCheck for StatusCheckpoint {
    async fn check(&self, expected: JobStatus) -> Checkpoint {
        match self.repo.read_status(&self.job_id).await {
            Ok(Some(status)) if status == expected => Checkpoint::Proceed,
            Ok(Some(status)) => Checkpoint::Halt(HaltReason::Status(status)),
            Ok(None) => Checkpoint::Halt(HaltReason::Missing),
            Err(e) => match self.on_read_failure {
                ReadFailurePolicy::Stop => {
                    tracing::warn!(job_id = %self.job_id, error = %e, "Status read failed at checkpoint, stopping");
                    Checkpoint::Halt(HaltReason::ReadFailed(e.to_string()))
                }
                ReadFailurePolicy::Continue => {
                    tracing::warn!(job_id = %self.job_id, error = %e, "Status read failed at checkpoint, continuing");
                    Checkpoint::Proceed
                }
            },
        }
    }
}
