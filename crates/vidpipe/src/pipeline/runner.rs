use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::cancel::{CancellationCheck, Checkpoint, HaltReason, StatusCheckpoint};
use crate::chain::{Next, StageChain, StageResponse, Step, StepOutcome, Transport};
use crate::status::JobStatus;
use crate::store::{StatusRepository, StatusUpdate, WriteOutcome};
use crate::worker::job::{Job, JobReport};

use super::batch::{BatchOutcome, BatchSubPipeline};
use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::detections;
use super::error::{PipelineError, Stage};
use super::frames::FrameSet;

/// Drives one job through extraction, detection and persistence.
///
/// Every status write goes through the repository's transition rule. A
/// refused write means someone else (a stop request) has already moved the
/// job, so the chain is aborted rather than failed.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    transport: Arc<dyn Transport>,
    repo: Arc<StatusRepository>,
    batches: BatchSubPipeline,
}

impl Pipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        transport: Arc<dyn Transport>,
        repo: Arc<StatusRepository>,
    ) -> Self {
        let batches = BatchSubPipeline::new(
            Arc::clone(&transport),
            config.detection.clone(),
            config.batch_size,
        );
        Self {
            config,
            transport,
            repo,
            batches,
        }
    }

    /// Runs a job whose `Received` record already exists.
    pub async fn run(self: &Arc<Self>, job: Job) -> JobReport {
        let span = info_span!("pipeline",
            job_id = %job.id,
            source_path = %job.source_path,
        );
        Arc::clone(self).run_chain(job).instrument(span).await
    }

    async fn run_chain(self: Arc<Self>, job: Job) -> JobReport {
        let checkpoint =
            StatusCheckpoint::new(Arc::clone(&self.repo), &job.id, self.config.on_read_failure);
        let ctx = PipelineContext::new(job, checkpoint);

        // Step 1: claim the job. A stop that arrived while queued wins here.
        match self
            .repo
            .write_status(ctx.job_id(), StatusUpdate::to(JobStatus::PreProcessingStarted))
            .await
        {
            Ok(WriteOutcome::Applied(_)) => {}
            Ok(outcome) => {
                info!(status = %outcome.status(), "Job no longer runnable, skipping");
                return JobReport::aborted(&ctx.job, format!("job is {}", outcome.status()));
            }
            Err(e) => {
                error!(error = %e, "Could not mark job as started");
                let reason = self.fail(&ctx, PipelineError::Store(e)).await;
                return match reason {
                    Next::Abort(reason) => JobReport::aborted(&ctx.job, reason),
                    Next::Fail(reason) => JobReport::failure(&ctx.job, reason),
                    _ => JobReport::failure(&ctx.job, "status store unavailable"),
                };
            }
        }

        // Step 2..: extraction, then whatever the continuations append.
        let mut chain = StageChain::new(Arc::clone(&self.transport));
        chain.push(self.extraction_step(ctx.clone()));
        let outcome = chain.execute().await;

        let report = JobReport::from_chain(&ctx.job, outcome);
        info!(outcome = ?report.outcome, "Job run ended");
        report
    }

    fn extraction_step(self: &Arc<Self>, ctx: PipelineContext) -> Step {
        let payload = json!({
            "job_id": ctx.job.id,
            "source_path": ctx.job.source_path,
        });
        let pipeline = Arc::clone(self);
        Step::new(
            "extraction",
            self.config.extraction.clone(),
            payload,
            move |outcome| {
                pipeline
                    .after_extraction(ctx, outcome)
                    .instrument(info_span!("extraction"))
            },
        )
    }

    fn persistence_step(self: &Arc<Self>, ctx: PipelineContext, detections: Vec<Value>) -> Step {
        let payload = json!({
            "job_id": ctx.job.id,
            "result": detections,
        });
        let pipeline = Arc::clone(self);
        Step::new(
            "persistence",
            self.config.persistence.clone(),
            payload,
            move |outcome| {
                pipeline
                    .after_persistence(ctx, detections, outcome)
                    .instrument(info_span!("persistence"))
            },
        )
    }

    async fn after_extraction(self: Arc<Self>, ctx: PipelineContext, outcome: StepOutcome) -> Next {
        if let Checkpoint::Halt(reason) = ctx.checkpoint.check(JobStatus::PreProcessingStarted).await
        {
            return self.halt(&ctx, reason).await;
        }

        let response = match accept(Stage::Extraction, outcome) {
            Ok(response) => response,
            Err(e) => return self.fail(&ctx, e).await,
        };
        let frames = match FrameSet::from_response(&response.body) {
            Ok(frames) => frames,
            Err(e) => return self.fail(&ctx, e).await,
        };
        info!(
            frames_path = %frames.location,
            frame_count = frames.frames.len(),
            "Frames extracted"
        );

        if let Err(next) = self.advance(&ctx, JobStatus::PreProcessingFinished).await {
            return next;
        }
        if let Err(next) = self.advance(&ctx, JobStatus::DetectionStarted).await {
            return next;
        }

        let detection = self
            .batches
            .run(ctx.job_id(), &frames, &ctx.checkpoint)
            .instrument(info_span!("detection", batch_size = self.config.batch_size))
            .await;
        let detections = match detection {
            Ok(BatchOutcome::Completed(detections)) => detections,
            Ok(BatchOutcome::Aborted { reason, .. }) => return self.halt(&ctx, reason).await,
            Err(e) => return self.fail(&ctx, e).await,
        };
        info!(detections = detections.len(), "Detection finished");

        if let Err(next) = self.advance(&ctx, JobStatus::DetectionFinished).await {
            return next;
        }
        if let Err(next) = self.advance(&ctx, JobStatus::PostProcessing).await {
            return next;
        }

        Next::then(self.persistence_step(ctx, detections))
    }

    async fn after_persistence(
        self: Arc<Self>,
        ctx: PipelineContext,
        detections: Vec<Value>,
        outcome: StepOutcome,
    ) -> Next {
        if let Checkpoint::Halt(reason) = ctx.checkpoint.check(JobStatus::PostProcessing).await {
            return self.halt(&ctx, reason).await;
        }

        if let Err(e) = accept(Stage::Persistence, outcome) {
            return self.fail(&ctx, e).await;
        }

        match self
            .repo
            .write_status(ctx.job_id(), StatusUpdate::finished(Value::Array(detections)))
            .await
        {
            Ok(WriteOutcome::Rejected { current }) => Next::Abort(format!("job is {}", current)),
            Ok(_) => Next::Complete,
            Err(e) => self.fail(&ctx, PipelineError::Store(e)).await,
        }
    }

    /// Moves the job forward one status. `Err` carries the decision to
    /// hand back to the chain when the write did not go through.
    async fn advance(&self, ctx: &PipelineContext, status: JobStatus) -> Result<(), Next> {
        match self
            .repo
            .write_status(ctx.job_id(), StatusUpdate::to(status))
            .await
        {
            Ok(WriteOutcome::Applied(_)) | Ok(WriteOutcome::Unchanged(_)) => {
                debug!(status = %status, "Status advanced");
                Ok(())
            }
            Ok(WriteOutcome::Rejected { current }) => {
                info!(status = %current, "Job moved on elsewhere, aborting");
                Err(Next::Abort(format!("job is {}", current)))
            }
            Err(e) => Err(self.fail(ctx, PipelineError::Store(e)).await),
        }
    }

    /// Records the failure on the job and ends the chain.
    async fn fail(&self, ctx: &PipelineContext, err: PipelineError) -> Next {
        let reason = err.to_string();
        warn!(error = %reason, "Job failed");

        match self.settle(ctx, StatusUpdate::failed(&reason)).await {
            Some(WriteOutcome::Rejected { current }) => Next::Abort(format!("job is {}", current)),
            _ => Next::Fail(reason),
        }
    }

    /// Ends the chain after a checkpoint halt.
    ///
    /// A halt on a terminal status needs no write. Any other halt leaves
    /// the job terminal: `Stopped` when the status could not be read,
    /// `Failed` when the record went missing or showed an unexpected
    /// in-flight status.
    async fn halt(&self, ctx: &PipelineContext, reason: HaltReason) -> Next {
        info!(reason = %reason, "Checkpoint halted job");
        let update = match &reason {
            HaltReason::Status(status) if status.is_terminal() => None,
            HaltReason::Status(_) | HaltReason::Missing => Some(StatusUpdate::failed(format!(
                "halted at checkpoint: {}",
                reason
            ))),
            HaltReason::ReadFailed(_) => Some(StatusUpdate::stopped()),
        };
        if let Some(update) = update {
            self.settle(ctx, update).await;
        }
        Next::Abort(reason.to_string())
    }

    /// Writes a terminal status, recreating the record if it was lost.
    async fn settle(&self, ctx: &PipelineContext, update: StatusUpdate) -> Option<WriteOutcome> {
        let status = update.status;
        match self
            .repo
            .write_status_or_restore(ctx.job_id(), &ctx.job.source_path, update)
            .await
        {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(status = %status, error = %e, "Could not record terminal status");
                None
            }
        }
    }
}

/// Turns a step outcome into a usable response or a stage failure.
fn accept(stage: Stage, outcome: StepOutcome) -> Result<StageResponse, PipelineError> {
    let response = outcome.map_err(|source| PipelineError::Transport { stage, source })?;
    if !response.is_success() {
        return Err(PipelineError::StageRejected {
            stage,
            status: response.status,
            body: detections::truncate(&response.body).to_string(),
        });
    }
    Ok(response)
}
