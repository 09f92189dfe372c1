use crate::config::{Config, ReadFailurePolicy, ServiceEndpoint};

pub struct PipelineConfig {
    pub extraction: ServiceEndpoint,
    pub detection: ServiceEndpoint,
    pub persistence: ServiceEndpoint,
    pub batch_size: usize,
    pub on_read_failure: ReadFailurePolicy,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            extraction: config.services.extraction.clone(),
            detection: config.services.detection.clone(),
            persistence: config.services.persistence.clone(),
            batch_size: config.detection.batch_size,
            on_read_failure: config.cancellation.on_read_failure,
        }
    }
}
