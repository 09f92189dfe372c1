//! The `stop` operation.

use std::sync::Arc;

use serde::Serialize;

use crate::error::StoreError;
use crate::status::JobStatus;
use crate::store::{StatusRepository, StatusUpdate, WriteOutcome};

/// Acknowledgement of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "status", rename_all = "snake_case")]
pub enum StopOutcome {
    /// The job was moved to `Stopped`.
    Stopped,
    /// The job had already ended with the given status.
    AlreadyTerminal(JobStatus),
}

/// Writes `Stopped` directly to the repository, bypassing the pipeline.
///
/// In-flight remote calls are not interrupted; the running pipeline
/// observes the status at its next checkpoint.
#[derive(Clone)]
pub struct CancellationSurface {
    repo: Arc<StatusRepository>,
}

impl CancellationSurface {
    pub fn new(repo: Arc<StatusRepository>) -> Self {
        Self { repo }
    }

    /// Fails with `StoreError::NotFound` for an unknown job.
    pub async fn stop(&self, job_id: &str) -> Result<StopOutcome, StoreError> {
        let outcome = self
            .repo
            .write_status(job_id, StatusUpdate::stopped())
            .await?;

        match outcome {
            WriteOutcome::Applied(_) => {
                tracing::info!(job_id, "Job stopped");
                Ok(StopOutcome::Stopped)
            }
            WriteOutcome::Unchanged(status) | WriteOutcome::Rejected { current: status } => {
                tracing::info!(job_id, status = %status, "Stop requested for job that already ended");
                Ok(StopOutcome::AlreadyTerminal(status))
            }
        }
    }
}
