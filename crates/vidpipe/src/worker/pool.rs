use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, info};
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;

use crate::error::VidpipeError;
use crate::pipeline::Pipeline;
use crate::worker::job::{Job, JobReport};

#[derive(Default)]
struct ActiveJobs {
    count: AtomicUsize,
    idle: Notify,
}

/// Decrements the active count when a job task ends, even by panic.
struct ActiveGuard(Arc<ActiveJobs>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Spawns one task per job, with at most `max_concurrent` running the
/// pipeline at once. Jobs past the limit wait for a permit.
pub struct JobRunner {
    pipeline: Arc<Pipeline>,
    permits: Arc<Semaphore>,
    active: Arc<ActiveJobs>,
    shutdown: AtomicBool,
}

impl JobRunner {
    pub fn new(pipeline: Arc<Pipeline>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        info!("Job runner accepting up to {} concurrent jobs", max_concurrent);
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            active: Arc::new(ActiveJobs::default()),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn submit(&self, job: Job) -> Result<JoinHandle<JobReport>, VidpipeError> {
        if self.is_shutdown() {
            return Err(VidpipeError::ShuttingDown);
        }

        self.active.count.fetch_add(1, Ordering::SeqCst);
        let guard = ActiveGuard(Arc::clone(&self.active));
        let permits = Arc::clone(&self.permits);
        let pipeline = Arc::clone(&self.pipeline);

        debug!("Queued job {} ({})", job.id, job.source_path);
        Ok(tokio::spawn(async move {
            let _guard = guard;
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return JobReport::aborted(&job, "job runner closed"),
            };
            pipeline.run(job).await
        }))
    }

    /// Number of submitted jobs that have not ended yet.
    pub fn active(&self) -> usize {
        self.active.count.load(Ordering::SeqCst)
    }

    /// Resolves once no submitted job is queued or running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.active.idle.notified();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Refuses further submissions. Jobs already submitted keep running.
    pub fn shutdown(&self) {
        info!("Shutting down job runner...");
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}
