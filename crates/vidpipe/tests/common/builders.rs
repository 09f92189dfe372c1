//! Builder patterns for creating test configurations programmatically.

#![allow(dead_code)]

use serde_json::{json, Value};

use vidpipe::config::{load_config_from_str, Config};

/// Builder for `Config` values. `build` runs the same validation as a
/// config file.
pub struct ConfigBuilder {
    extraction: (String, u16, String),
    detection: (String, u16, String),
    persistence: (String, u16, String),
    database_path: Option<String>,
    batch_size: usize,
    max_concurrent_jobs: usize,
    on_read_failure: String,
    request_timeout_secs: u64,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            extraction: ("127.0.0.1".to_string(), 8081, "/process_video".to_string()),
            detection: ("127.0.0.1".to_string(), 8082, "/yolo_analyze_frames".to_string()),
            persistence: ("127.0.0.1".to_string(), 8083, "/save_video".to_string()),
            database_path: None,
            batch_size: 60,
            max_concurrent_jobs: 4,
            on_read_failure: "stop".to_string(),
            request_timeout_secs: 30,
        }
    }

    pub fn extraction(mut self, host: &str, port: u16, route: &str) -> Self {
        self.extraction = (host.to_string(), port, route.to_string());
        self
    }

    pub fn detection(mut self, host: &str, port: u16, route: &str) -> Self {
        self.detection = (host.to_string(), port, route.to_string());
        self
    }

    pub fn persistence(mut self, host: &str, port: u16, route: &str) -> Self {
        self.persistence = (host.to_string(), port, route.to_string());
        self
    }

    pub fn database_path(mut self, path: &str) -> Self {
        self.database_path = Some(path.to_string());
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    pub fn on_read_failure(mut self, policy: &str) -> Self {
        self.on_read_failure = policy.to_string();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// The configuration as it would appear in a config file.
    pub fn to_json(&self) -> Value {
        let endpoint = |(host, port, route): &(String, u16, String)| {
            json!({ "host": host, "port": port, "route": route })
        };
        json!({
            "version": "1.0",
            "orchestrator": { "host": "127.0.0.1", "port": 8080 },
            "services": {
                "extraction": endpoint(&self.extraction),
                "detection": endpoint(&self.detection),
                "persistence": endpoint(&self.persistence),
            },
            "database": { "path": self.database_path },
            "detection": { "batch_size": self.batch_size },
            "cancellation": { "on_read_failure": self.on_read_failure },
            "http": {
                "connect_timeout_secs": 2,
                "request_timeout_secs": self.request_timeout_secs,
            },
            "max_concurrent_jobs": self.max_concurrent_jobs,
        })
    }

    pub fn build(self) -> Config {
        load_config_from_str(&self.to_json().to_string()).expect("test config should be valid")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Extraction response listing `count` frames.
pub fn extraction_body(frames_path: &str, count: usize) -> String {
    let frames: Vec<String> = (1..=count).map(|i| format!("frame_{:04}.png", i)).collect();
    json!({ "frames_path": frames_path, "frames": frames }).to_string()
}
