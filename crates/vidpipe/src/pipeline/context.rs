use crate::cancel::StatusCheckpoint;
use crate::worker::job::Job;

/// Per-job state carried from one continuation to the next.
#[derive(Clone)]
pub struct PipelineContext {
    pub job: Job,

    // Observes the job's live status between stages
    pub checkpoint: StatusCheckpoint,
}

impl PipelineContext {
    pub fn new(job: Job, checkpoint: StatusCheckpoint) -> Self {
        Self { job, checkpoint }
    }

    pub fn job_id(&self) -> &str {
        &self.job.id
    }
}
