use std::fmt;

use thiserror::Error;

use crate::error::{StoreError, TransportError};

/// Remote stage a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Detection,
    Persistence,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Extraction => write!(f, "extraction"),
            Stage::Detection => write!(f, "detection"),
            Stage::Persistence => write!(f, "persistence"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage} stage unreachable: {source}")]
    Transport {
        stage: Stage,
        #[source]
        source: TransportError,
    },

    #[error("{stage} stage returned HTTP {status}: {body}")]
    StageRejected {
        stage: Stage,
        status: u16,
        body: String,
    },

    #[error("Malformed extraction response: {0}")]
    MalformedExtraction(String),

    #[error("Detection service reported an error: {0}")]
    DetectionReported(String),

    #[error("Malformed detection output: {0}")]
    MalformedDetections(String),

    #[error("Status store failure: {0}")]
    Store(#[from] StoreError),
}
