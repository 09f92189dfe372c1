pub mod batch;
pub mod config;
pub mod context;
pub mod detections;
pub mod error;
pub mod frames;
pub mod runner;

pub use batch::{BatchOutcome, BatchSubPipeline};
pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use error::{PipelineError, Stage};
pub use frames::{FrameBatch, FrameSet};
pub use runner::Pipeline;
