pub mod api;
pub mod broadcast;
pub mod cancel;
pub mod chain;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod status;
pub mod store;
pub mod worker;

#[cfg(test)]
mod testing;

pub use broadcast::{StatusBroadcaster, StatusEvent};
pub use cancel::{CancellationSurface, StopOutcome};
pub use chain::{HttpTransport, StageChain, Transport};
pub use config::{load_config, load_config_from_str, Config};
pub use error::{ConfigError, Result, StoreError, TransportError, VidpipeError};
pub use orchestrator::{JobStatusView, JobTicket, Orchestrator};
pub use pipeline::{Pipeline, PipelineConfig};
pub use status::JobStatus;
pub use store::{StatusRecord, StatusRepository};
pub use worker::{Job, JobOutcome, JobReport, JobRunner};
