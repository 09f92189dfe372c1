//! Job status state machine.
//!
//! Happy-path statuses advance strictly in stage order. `Failed` and
//! `Stopped` can be entered from any non-terminal status. `Finished`,
//! `Failed` and `Stopped` are absorbing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Status of a video analysis job.
///
/// Serialized with the variant name (`"Received"`, `"DetectionStarted"`, ...),
/// which is also the form stored in both status stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Received,
    PreProcessingStarted,
    PreProcessingFinished,
    DetectionStarted,
    DetectionFinished,
    PostProcessing,
    Finished,
    Failed,
    Stopped,
}

/// Verdict of the transition rule for a proposed status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The write moves the job forward (or into `Failed`/`Stopped`).
    Allowed,
    /// The job already has this status; writing it again is a no-op.
    Unchanged,
    /// The write would leave an absorbing status or move backwards.
    Rejected,
}

impl JobStatus {
    pub const ALL: [JobStatus; 9] = [
        JobStatus::Received,
        JobStatus::PreProcessingStarted,
        JobStatus::PreProcessingFinished,
        JobStatus::DetectionStarted,
        JobStatus::DetectionFinished,
        JobStatus::PostProcessing,
        JobStatus::Finished,
        JobStatus::Failed,
        JobStatus::Stopped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Received => "Received",
            JobStatus::PreProcessingStarted => "PreProcessingStarted",
            JobStatus::PreProcessingFinished => "PreProcessingFinished",
            JobStatus::DetectionStarted => "DetectionStarted",
            JobStatus::DetectionFinished => "DetectionFinished",
            JobStatus::PostProcessing => "PostProcessing",
            JobStatus::Finished => "Finished",
            JobStatus::Failed => "Failed",
            JobStatus::Stopped => "Stopped",
        }
    }

    /// Position along the happy path. `None` for `Failed` and `Stopped`.
    fn stage_rank(&self) -> Option<u8> {
        match self {
            JobStatus::Received => Some(0),
            JobStatus::PreProcessingStarted => Some(1),
            JobStatus::PreProcessingFinished => Some(2),
            JobStatus::DetectionStarted => Some(3),
            JobStatus::DetectionFinished => Some(4),
            JobStatus::PostProcessing => Some(5),
            JobStatus::Finished => Some(6),
            JobStatus::Failed | JobStatus::Stopped => None,
        }
    }

    /// True for the absorbing statuses.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Finished | JobStatus::Failed | JobStatus::Stopped
        )
    }

    /// True for `Failed` and `Stopped`, the statuses that end a run early.
    pub fn is_abort(&self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Stopped)
    }

    /// Applies the transition rule to a proposed write of `next`.
    pub fn transition_to(&self, next: JobStatus) -> Transition {
        if *self == next {
            return Transition::Unchanged;
        }
        if self.is_terminal() {
            return Transition::Rejected;
        }
        match (self.stage_rank(), next.stage_rank()) {
            (_, None) => Transition::Allowed,
            (Some(current), Some(target)) if target > current => Transition::Allowed,
            _ => Transition::Rejected,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown job status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
