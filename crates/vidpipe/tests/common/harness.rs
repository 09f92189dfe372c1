//! Test harness for end-to-end orchestrator runs.
//!
//! Stage collaborators are replaced by small axum servers bound to
//! ephemeral ports. Each one answers from a script and records every
//! payload it receives, so tests can drive the real `HttpTransport`.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use vidpipe::api::{serve, AppState};
use vidpipe::{JobStatus, Orchestrator};

use super::builders::ConfigBuilder;

#[derive(Clone)]
struct ServiceState {
    once: Arc<Mutex<VecDeque<(u16, String)>>>,
    standing: Arc<Mutex<(u16, String)>>,
    calls: Arc<Mutex<Vec<Value>>>,
    hold_on_call: Arc<Mutex<Option<usize>>>,
    release: Arc<Notify>,
}

async fn handle(State(state): State<ServiceState>, Json(payload): Json<Value>) -> (StatusCode, String) {
    let index = {
        let mut calls = state.calls.lock().unwrap();
        calls.push(payload);
        calls.len() - 1
    };

    let hold = *state.hold_on_call.lock().unwrap() == Some(index);
    if hold {
        state.release.notified().await;
    }

    let scripted = state.once.lock().unwrap().pop_front();
    let (code, body) = scripted.unwrap_or_else(|| state.standing.lock().unwrap().clone());
    (StatusCode::from_u16(code).unwrap(), body)
}

/// A fake stage collaborator serving one POST route.
pub struct FakeService {
    pub route: String,
    pub port: u16,
    state: ServiceState,
    server: JoinHandle<()>,
}

impl FakeService {
    /// Starts serving `route`; answers `200` with an empty body until scripted.
    pub async fn start(route: &str) -> Self {
        let state = ServiceState {
            once: Arc::new(Mutex::new(VecDeque::new())),
            standing: Arc::new(Mutex::new((200, String::new()))),
            calls: Arc::new(Mutex::new(Vec::new())),
            hold_on_call: Arc::new(Mutex::new(None)),
            release: Arc::new(Notify::new()),
        };

        let app = Router::new()
            .route(route, post(handle))
            .with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            route: route.to_string(),
            port,
            state,
            server,
        }
    }

    /// Answer used once the one-shot answers are used up.
    pub fn respond(&self, status: u16, body: impl Into<String>) {
        *self.state.standing.lock().unwrap() = (status, body.into());
    }

    pub fn respond_once(&self, status: u16, body: impl Into<String>) {
        self.state
            .once
            .lock()
            .unwrap()
            .push_back((status, body.into()));
    }

    /// Makes the call with zero-based `index` wait for `release`.
    pub fn hold_call(&self, index: usize) {
        *self.state.hold_on_call.lock().unwrap() = Some(index);
    }

    pub fn release(&self) {
        self.state.release.notify_one();
    }

    pub fn calls(&self) -> Vec<Value> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.calls.lock().unwrap().len()
    }

    /// Waits until at least `n` calls have arrived.
    pub async fn wait_for_calls(&self, n: usize) {
        wait_until(move || async move { self.call_count() >= n }).await;
    }
}

impl Drop for FakeService {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Polls `condition` every 10ms for up to five seconds.
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..500 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within five seconds");
}

/// Returns a local port nothing is listening on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// An orchestrator wired to three fake services and a temp SQLite file.
pub struct TestHarness {
    temp_dir: TempDir,
    pub extraction: FakeService,
    pub detection: FakeService,
    pub persistence: FakeService,
    pub orchestrator: Arc<Orchestrator>,
}

impl TestHarness {
    pub async fn start() -> Self {
        Self::with_config(|builder| builder).await
    }

    /// Starts the harness, letting the caller adjust the configuration
    /// after the fake service endpoints are filled in.
    pub async fn with_config<F>(customize: F) -> Self
    where
        F: FnOnce(ConfigBuilder) -> ConfigBuilder,
    {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let extraction = FakeService::start("/process_video").await;
        let detection = FakeService::start("/yolo_analyze_frames").await;
        let persistence = FakeService::start("/save_video").await;

        let db_path = temp_dir.path().join("data").join("vidpipe.db");
        let builder = ConfigBuilder::new()
            .extraction("127.0.0.1", extraction.port, &extraction.route)
            .detection("127.0.0.1", detection.port, &detection.route)
            .persistence("127.0.0.1", persistence.port, &persistence.route)
            .database_path(db_path.to_str().unwrap());
        let config = customize(builder).build();

        let orchestrator =
            Arc::new(Orchestrator::from_config(&config).expect("orchestrator should start"));

        Self {
            temp_dir,
            extraction,
            detection,
            persistence,
            orchestrator,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("data").join("vidpipe.db")
    }

    /// Serves the HTTP API on an ephemeral port; returns its base URL.
    pub async fn serve_api(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = AppState::new(Arc::clone(&self.orchestrator));
        tokio::spawn(async move {
            serve(listener, state, std::future::pending()).await.unwrap();
        });
        format!("http://{}", addr)
    }

    pub async fn wait_for_status(&self, job_id: &str, status: JobStatus) {
        let orchestrator = Arc::clone(&self.orchestrator);
        wait_until(move || {
            let orchestrator = Arc::clone(&orchestrator);
            async move {
                matches!(orchestrator.status(job_id).await, Ok(view) if view.status == status)
            }
        })
        .await;
    }
}
