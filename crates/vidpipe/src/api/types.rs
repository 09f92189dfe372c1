//! API request and response types

use serde::{Deserialize, Serialize};

use crate::cancel::StopOutcome;
use crate::status::JobStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    pub id: String,
    /// False when the job had already ended.
    pub stopped: bool,
    /// Status of the job after the request.
    pub status: JobStatus,
}

impl StopResponse {
    pub fn new(id: impl Into<String>, outcome: StopOutcome) -> Self {
        let (stopped, status) = match outcome {
            StopOutcome::Stopped => (true, JobStatus::Stopped),
            StopOutcome::AlreadyTerminal(status) => (false, status),
        };
        Self {
            id: id.into(),
            stopped,
            status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<u64>,
}
