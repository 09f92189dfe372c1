//! Status change broadcaster for real-time job status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::status::JobStatus;

/// Emitted after a status write has been applied.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub job_id: String,
    pub status: JobStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusEvent {
    pub fn new(job_id: &str, status: JobStatus) -> Self {
        Self {
            job_id: job_id.to_string(),
            status,
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }
}

/// Broadcasts applied status changes to any number of subscribers.
#[derive(Clone)]
pub struct StatusBroadcaster {
    sender: Arc<broadcast::Sender<StatusEvent>>,
}

impl StatusBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: StatusEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }
}

impl Default for StatusBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_without_subscribers() {
        let broadcaster = StatusBroadcaster::new(4);
        broadcaster.send(StatusEvent::new("job-1", JobStatus::Received));
    }

    #[test]
    fn test_send_receive() {
        let broadcaster = StatusBroadcaster::new(4);
        let mut rx = broadcaster.subscribe();

        broadcaster.send(
            StatusEvent::new("job-1", JobStatus::Failed).with_error(Some("boom".to_string())),
        );

        let received = rx.try_recv().unwrap();
        assert_eq!(received.job_id, "job-1");
        assert_eq!(received.status, JobStatus::Failed);
        assert_eq!(received.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let value = serde_json::to_value(StatusEvent::new("job-1", JobStatus::Stopped)).unwrap();
        assert_eq!(value["jobId"], "job-1");
        assert_eq!(value["status"], "Stopped");
        assert!(value.get("error").is_none());
    }
}
