//! End-to-end tests: the `volley` binary against a local axum server.

use axum::{
    Json, Router,
    extract::Path,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::process::Output;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::process::Command;

async fn get_user(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    match id.as_str() {
        "1" => (
            StatusCode::OK,
            Json(json!({"id": 1, "name": "Alice", "tags": ["admin", "ops"], "manager": null})),
        ),
        _ => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))),
    }
}

async fn create_user(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({"id": 3, "name": body["name"]})),
    )
}

async fn health() -> &'static str {
    "ok"
}

/// Serves the test API on an ephemeral port and returns its base URL.
async fn start_server() -> String {
    let app = Router::new()
        .route("/users/{id}", get(get_user))
        .route("/users", post(create_user))
        .route("/health", get(health));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

const SCENARIOS: &str = r#"
env:
  NEW_NAME: Carol
scenarios:
  get-alice:
    params: { id: "1" }
    response:
      status: 200
      body:
        json:
          name: { value: Alice }
          tags: { type: array, min: 2 }
  missing-user:
    params: { id: "2" }
    response:
      status: 404
      body:
        json:
          error: { value: not found }
  create-user:
    request:
      json:
        name: $NEW_NAME
    response:
      status: 201
      body:
        json:
          name: { value: Carol }
          id: { type: integer }
  health:
    response:
      status: 200
      body:
        text: ok
"#;

const OPENAPI: &str = r#"
openapi: 3.0.0
paths:
  /users/{id}:
    get:
      v-functional-test:
        scenarios: [get-alice, missing-user]
  /users:
    post:
      v-functional-test:
        scenarios: [create-user]
  /health:
    get:
      v-functional-test:
        scenarios: [health]
"#;

/// Writes both documents into a temp dir and returns it with their paths.
fn write_documents(host: &str, extra_scenarios: &str) -> (TempDir, String, String) {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("volley.yml");
    let openapi = dir.path().join("openapi.yml");

    std::fs::write(
        &config,
        format!("host: {host}\n{SCENARIOS}{extra_scenarios}"),
    )
    .unwrap();
    std::fs::write(&openapi, OPENAPI).unwrap();

    (
        dir,
        config.display().to_string(),
        openapi.display().to_string(),
    )
}

async fn volley(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_volley"))
        .args(args)
        .arg("--color")
        .arg("never")
        .output()
        .await
        .expect("failed to run volley")
}

fn json_report(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not a JSON report ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

#[tokio::test]
async fn test_run_all_scenarios_pass() {
    let host = start_server().await;
    let (_dir, config, openapi) = write_documents(&host, "");

    let output = volley(&["run", &config, "-o", &openapi, "--format", "json"]).await;

    let report = json_report(&output);
    assert!(output.status.success(), "report: {report:#}");
    assert_eq!(report["passed"], true);
    assert_eq!(
        report["summary"],
        json!({"total": 4, "passed": 4, "failed": 0, "skipped": 0})
    );
}

#[tokio::test]
async fn test_failing_scenario_sets_exit_code() {
    let host = start_server().await;
    let extra = r#"
  wrong-name:
    params: { id: "1" }
    response:
      status: 200
      body:
        json:
          name: { value: Bob }
  manager-required:
    params: { id: "1" }
    response:
      body:
        contains: [manager]
"#;
    let (_dir, config, openapi) = write_documents(&host, extra);
    let openapi_text = std::fs::read_to_string(&openapi).unwrap().replace(
        "[get-alice, missing-user]",
        "[get-alice, missing-user, wrong-name, manager-required]",
    );
    std::fs::write(&openapi, openapi_text).unwrap();

    let output = volley(&["run", &config, "-o", &openapi, "--format", "json"]).await;

    assert_eq!(output.status.code(), Some(1));
    let report = json_report(&output);
    assert_eq!(report["summary"]["failed"], 2);

    let results = report["results"].as_array().unwrap();
    let by_name = |name: &str| {
        results
            .iter()
            .find(|r| r["scenario"] == name)
            .unwrap_or_else(|| panic!("no result for {name}"))
            .clone()
    };

    let wrong = by_name("wrong-name");
    assert_eq!(wrong["outcome"], "failed");
    assert_eq!(wrong["message"], "expected name to be 'Bob', got 'Alice'");

    let manager = by_name("manager-required");
    assert_eq!(manager["kind"], "null_field");
}

#[tokio::test]
async fn test_filter_selects_scenarios() {
    let host = start_server().await;
    let (_dir, config, openapi) = write_documents(&host, "");

    let output = volley(&[
        "run", &config, "-o", &openapi, "--format", "json", "--filter", "health",
    ])
    .await;

    assert!(output.status.success());
    let report = json_report(&output);
    assert_eq!(report["summary"]["total"], 1);
    assert_eq!(report["results"][0]["endpoint"], "/health");
}

#[tokio::test]
async fn test_unreachable_server_is_reported_not_fatal() {
    // nothing listens on port 9 of the loopback interface
    let (_dir, config, openapi) = write_documents("http://127.0.0.1:9", "");

    let output = volley(&["run", &config, "-o", &openapi, "--format", "json"]).await;

    assert_eq!(output.status.code(), Some(1));
    let report = json_report(&output);
    assert_eq!(report["summary"]["total"], 4);
    assert_eq!(report["results"][0]["outcome"], "errored");
}

#[tokio::test]
async fn test_human_output() {
    let host = start_server().await;
    let (_dir, config, openapi) = write_documents(&host, "");

    let output = volley(&["run", &config, "-o", &openapi]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Running 4 scenarios"));
    assert!(stdout.contains("[get-alice]"));
    assert!(stdout.contains("PASSED"));
}

#[tokio::test]
async fn test_list_routes() {
    let (_dir, config, openapi) = write_documents("http://localhost", "");

    let output = volley(&["list", &config, "-o", &openapi]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("GET /users/{id}"));
    assert!(stdout.contains("POST /users"));
    assert!(stdout.contains("missing-user"));
}

#[tokio::test]
async fn test_check_prints_implied_paths() {
    let (_dir, config, openapi) = write_documents("http://localhost", "");

    let output = volley(&["check", &config, "-o", &openapi]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("get-alice"));
    assert!(stdout.contains("tags"));
    assert!(stdout.contains("4 scenarios, 3 routes, 0 warnings"));
}

#[tokio::test]
async fn test_check_rejects_unknown_type() {
    let extra = r#"
  bad:
    response:
      body:
        json:
          when: { type: date }
"#;
    let (_dir, config, openapi) = write_documents("http://localhost", extra);

    let output = volley(&["check", &config, "-o", &openapi]).await;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown type"), "stderr: {stderr}");
}
