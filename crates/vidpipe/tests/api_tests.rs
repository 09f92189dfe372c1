//! HTTP API tests: a real server on an ephemeral port, driven with reqwest.

mod common;

use serde_json::{json, Value};

use common::{extraction_body, TestHarness};
use vidpipe::JobStatus;

async fn submit(client: &reqwest::Client, base: &str, body: &str) -> reqwest::Response {
    client
        .post(format!("{}/submit_video", base))
        .body(body.to_string())
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let harness = TestHarness::start().await;
    let base = harness.serve_api().await;

    let response = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_submit_and_query_finished_job() {
    let harness = TestHarness::start().await;
    harness
        .extraction
        .respond(200, extraction_body("/data/frames-v1", 4));
    harness.detection.respond(200, r#"[{"label":"car"}]"#);
    let base = harness.serve_api().await;
    let client = reqwest::Client::new();

    let response = submit(&client, &base, "/media/v1.mp4").await;
    assert_eq!(response.status(), 200);
    let id = response.json::<Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    harness.wait_for_status(&id, JobStatus::Finished).await;

    let body: Value = client
        .get(format!("{}/status/{}", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["status"], "Finished");
    assert_eq!(body["result"], json!([{"label": "car"}]));
}

#[tokio::test]
async fn test_submit_accepts_json_bodies() {
    let harness = TestHarness::start().await;
    harness.extraction.respond(500, "no");
    let base = harness.serve_api().await;
    let client = reqwest::Client::new();

    for body in [r#""/media/a.mp4""#, r#"{"path": "/media/b.mp4"}"#] {
        let response = submit(&client, &base, body).await;
        assert_eq!(response.status(), 200, "body {}", body);
    }
    harness.orchestrator.wait_idle().await;

    let paths: Vec<String> = harness
        .extraction
        .calls()
        .iter()
        .map(|call| call["source_path"].as_str().unwrap().to_string())
        .collect();
    assert!(paths.contains(&"/media/a.mp4".to_string()));
    assert!(paths.contains(&"/media/b.mp4".to_string()));
}

#[tokio::test]
async fn test_submit_rejects_empty_body() {
    let harness = TestHarness::start().await;
    let base = harness.serve_api().await;

    let response = submit(&reqwest::Client::new(), &base, "   ").await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let harness = TestHarness::start().await;
    let base = harness.serve_api().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/status/does-not-exist", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let response = client
        .post(format!("{}/stop", base))
        .body(r#"{"id": "does-not-exist"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_stop_running_job() {
    let harness = TestHarness::start().await;
    harness
        .extraction
        .respond(200, extraction_body("/data/frames", 10));
    harness.extraction.hold_call(0);
    let base = harness.serve_api().await;
    let client = reqwest::Client::new();

    let id = submit(&client, &base, "/media/v1.mp4")
        .await
        .json::<Value>()
        .await
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    harness.extraction.wait_for_calls(1).await;

    let body: Value = client
        .post(format!("{}/stop", base))
        .body(id.clone())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["stopped"], true);
    assert_eq!(body["status"], "Stopped");

    harness.extraction.release();
    harness.orchestrator.wait_idle().await;
    assert_eq!(harness.detection.call_count(), 0);

    let body: Value = client
        .get(format!("{}/status/request:{}", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "Stopped");

    // A second stop acknowledges without changing anything.
    let body: Value = client
        .post(format!("{}/stop", base))
        .body(id.clone())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["stopped"], false);
    assert_eq!(body["status"], "Stopped");
}

#[tokio::test]
async fn test_list_jobs() {
    let harness = TestHarness::start().await;
    harness.extraction.respond(500, "no");
    let base = harness.serve_api().await;
    let client = reqwest::Client::new();

    for path in ["/media/a.mp4", "/media/b.mp4", "/media/c.mp4"] {
        submit(&client, &base, path).await;
    }
    harness.orchestrator.wait_idle().await;

    let jobs: Vec<Value> = client
        .get(format!("{}/jobs?limit=2", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|job| job["status"] == "Failed"));
}
