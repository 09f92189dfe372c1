use serde::Serialize;

use crate::chain::ChainOutcome;

#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    /// Source media reference as supplied at intake.
    pub source_path: String,
}

impl Job {
    /// Creates a job with a fresh v4 UUID.
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_path: source_path.into(),
        }
    }
}

/// How a job run ended, from the runner's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Finished,
    Failed { reason: String },
    /// Cancellation was observed; the job's status was left as found.
    Aborted { reason: String },
}

#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: String,
    pub source_path: String,
    pub outcome: JobOutcome,
}

impl JobReport {
    pub fn finished(job: &Job) -> Self {
        Self::new(job, JobOutcome::Finished)
    }

    pub fn failure(job: &Job, reason: impl Into<String>) -> Self {
        Self::new(
            job,
            JobOutcome::Failed {
                reason: reason.into(),
            },
        )
    }

    pub fn aborted(job: &Job, reason: impl Into<String>) -> Self {
        Self::new(
            job,
            JobOutcome::Aborted {
                reason: reason.into(),
            },
        )
    }

    pub fn from_chain(job: &Job, outcome: ChainOutcome) -> Self {
        match outcome {
            ChainOutcome::Completed { .. } => Self::finished(job),
            ChainOutcome::Failed { step, reason } => {
                Self::failure(job, format!("{} step: {}", step, reason))
            }
            ChainOutcome::Aborted { step, reason } => {
                Self::aborted(job, format!("after {} step: {}", step, reason))
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.outcome, JobOutcome::Finished)
    }

    fn new(job: &Job, outcome: JobOutcome) -> Self {
        Self {
            job_id: job.id.clone(),
            source_path: job.source_path.clone(),
            outcome,
        }
    }
}
