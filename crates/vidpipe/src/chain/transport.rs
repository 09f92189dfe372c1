//! Transport used by the stage chain to reach collaborators.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{HttpConfig, ServiceEndpoint};
use crate::error::TransportError;

/// Where a chain step is sent.
pub type Endpoint = ServiceEndpoint;

/// Response returned by a stage collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResponse {
    pub status: u16,
    pub body: String,
}

impl StageResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Sends a JSON payload to a destination and returns the raw response.
///
/// Only failures to obtain a response are errors. A non-success status
/// code is returned as a normal `StageResponse`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        destination: &Endpoint,
        payload: &Value,
    ) -> Result<StageResponse, TransportError>;
}

/// reqwest-backed transport with per-hop connect and request timeouts.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        destination: &Endpoint,
        payload: &Value,
    ) -> Result<StageResponse, TransportError> {
        let response = self
            .client
            .post(destination.url())
            .json(payload)
            .send()
            .await
            .map_err(|e| request_error(destination, e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TransportError::Body {
            destination: destination.to_string(),
            reason: e.to_string(),
        })?;

        Ok(StageResponse { status, body })
    }
}

fn request_error(destination: &Endpoint, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            destination: destination.to_string(),
        }
    } else {
        TransportError::Request {
            destination: destination.to_string(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(StageResponse::ok("").is_success());
        assert!(StageResponse::new(204, "").is_success());
        assert!(!StageResponse::new(404, "").is_success());
        assert!(!StageResponse::new(500, "").is_success());
    }

    #[test]
    fn test_json_body() {
        let response = StageResponse::ok(r#"{"frames_path":"/tmp/frames-1"}"#);
        let value: Value = response.json().unwrap();
        assert_eq!(value["frames_path"], "/tmp/frames-1");
        assert!(StageResponse::ok("not json").json::<Value>().is_err());
    }

    #[test]
    fn test_http_transport_builds() {
        assert!(HttpTransport::new(&HttpConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = HttpTransport::new(&HttpConfig {
            connect_timeout_secs: 1,
            request_timeout_secs: 2,
        })
        .unwrap();
        let endpoint = Endpoint::new("127.0.0.1", port, "/process_video");
        let result = transport.post_json(&endpoint, &Value::Null).await;
        assert!(matches!(
            result,
            Err(TransportError::Request { .. }) | Err(TransportError::Timeout { .. })
        ));
    }
}
