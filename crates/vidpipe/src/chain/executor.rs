//! Sequential stage chain executor.
//!
//! A chain is a queue of steps. Each step is sent to its destination, the
//! outcome is handed to the step's continuation, and the continuation's
//! [`Next`] decides whether more steps follow. Only one step of a chain is
//! ever in flight.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::TransportError;

use super::transport::{Endpoint, StageResponse, Transport};

/// What a step produced: a response, or the reason no response arrived.
pub type StepOutcome = Result<StageResponse, TransportError>;

type Continuation = Box<dyn FnOnce(StepOutcome) -> BoxFuture<'static, Next> + Send>;

/// Decision returned by a continuation.
pub enum Next {
    /// Append these steps to the chain. An empty list completes the chain.
    Continue(Vec<Step>),
    /// The chain is done.
    Complete,
    /// The chain failed; pending steps are dropped.
    Fail(String),
    /// Cancellation was observed; pending steps are dropped.
    Abort(String),
}

impl Next {
    pub fn then(step: Step) -> Self {
        Next::Continue(vec![step])
    }
}

/// One remote call plus the continuation that interprets its outcome.
pub struct Step {
    name: String,
    destination: Endpoint,
    payload: Value,
    continuation: Continuation,
}

impl Step {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        destination: Endpoint,
        payload: Value,
        continuation: F,
    ) -> Self
    where
        F: FnOnce(StepOutcome) -> Fut + Send + 'static,
        Fut: Future<Output = Next> + Send + 'static,
    {
        Self {
            name: name.into(),
            destination,
            payload,
            continuation: Box::new(move |outcome| continuation(outcome).boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn destination(&self) -> &Endpoint {
        &self.destination
    }
}

/// How a chain ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    Completed { steps_run: usize },
    Failed { step: String, reason: String },
    Aborted { step: String, reason: String },
}

/// Owns the pending steps of one job and runs them one at a time.
pub struct StageChain {
    transport: Arc<dyn Transport>,
    pending: VecDeque<Step>,
}

impl StageChain {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            pending: VecDeque::new(),
        }
    }

    /// Appends a step built from its parts.
    pub fn add_step<F, Fut>(
        &mut self,
        name: impl Into<String>,
        destination: Endpoint,
        payload: Value,
        continuation: F,
    ) where
        F: FnOnce(StepOutcome) -> Fut + Send + 'static,
        Fut: Future<Output = Next> + Send + 'static,
    {
        self.push(Step::new(name, destination, payload, continuation));
    }

    pub fn push(&mut self, step: Step) {
        self.pending.push_back(step);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Runs steps until the queue is empty or a continuation ends the chain.
    pub async fn execute(mut self) -> ChainOutcome {
        let mut steps_run = 0;

        while let Some(step) = self.pending.pop_front() {
            let Step {
                name,
                destination,
                payload,
                continuation,
            } = step;

            debug!(step = %name, destination = %destination, "Dispatching step");
            let outcome = self.transport.post_json(&destination, &payload).await;
            if let Err(ref e) = outcome {
                warn!(step = %name, error = %e, "Step transport failure");
            }
            steps_run += 1;

            match continuation(outcome).await {
                Next::Continue(steps) => self.pending.extend(steps),
                Next::Complete => {
                    self.pending.clear();
                    break;
                }
                Next::Fail(reason) => {
                    return ChainOutcome::Failed { step: name, reason };
                }
                Next::Abort(reason) => {
                    return ChainOutcome::Aborted { step: name, reason };
                }
            }
        }

        ChainOutcome::Completed { steps_run }
    }
}
