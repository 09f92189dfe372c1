//! Detection stage: one detection call per frame batch.
//!
//! Batches are sent strictly one at a time. Before each batch the job's
//! live status is checked; if the job is no longer `DetectionStarted` the
//! run ends with [`BatchOutcome::Aborted`] and no further batch is sent.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::cancel::{CancellationCheck, Checkpoint, HaltReason};
use crate::chain::{Endpoint, Transport};
use crate::status::JobStatus;

use super::detections::parse_detections;
use super::error::{PipelineError, Stage};
use super::frames::FrameSet;

/// Result of a detection run that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Every batch was processed; detections concatenated in batch order.
    Completed(Vec<Value>),
    /// A checkpoint halted the run before batch `next_batch` was sent.
    Aborted {
        next_batch: usize,
        total_batches: usize,
        reason: HaltReason,
    },
}

pub struct BatchSubPipeline {
    transport: Arc<dyn Transport>,
    destination: Endpoint,
    batch_size: usize,
}

impl BatchSubPipeline {
    pub fn new(transport: Arc<dyn Transport>, destination: Endpoint, batch_size: usize) -> Self {
        Self {
            transport,
            destination,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn run(
        &self,
        job_id: &str,
        frames: &FrameSet,
        checkpoint: &dyn CancellationCheck,
    ) -> Result<BatchOutcome, PipelineError> {
        let batches = frames.batches(self.batch_size);
        let total_batches = batches.len();
        let mut detections = Vec::new();

        for batch in batches {
            if let Checkpoint::Halt(reason) = checkpoint.check(JobStatus::DetectionStarted).await {
                info!(
                    job_id,
                    batch = batch.index,
                    total_batches,
                    reason = %reason,
                    "Detection halted before batch"
                );
                return Ok(BatchOutcome::Aborted {
                    next_batch: batch.index,
                    total_batches,
                    reason,
                });
            }

            let payload = json!({
                "job_id": job_id,
                "frames_path": frames.location,
                "batch": batch.index,
                "batch_count": total_batches,
                "frames": batch.frames,
            });

            debug!(job_id, batch = batch.index, total_batches, "Dispatching detection batch");
            let response = self
                .transport
                .post_json(&self.destination, &payload)
                .await
                .map_err(|source| PipelineError::Transport {
                    stage: Stage::Detection,
                    source,
                })?;

            if !response.is_success() {
                return Err(PipelineError::StageRejected {
                    stage: Stage::Detection,
                    status: response.status,
                    body: super::detections::truncate(&response.body).to_string(),
                });
            }

            detections.extend(parse_detections(&response.body)?);
        }

        Ok(BatchOutcome::Completed(detections))
    }
}
