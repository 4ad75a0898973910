//! Integration tests for the dashboard API.
//!
//! GitHub and Cypress Cloud are replaced by local mockito servers; the router
//! is driven in-process with `tower::ServiceExt::oneshot`.

use std::io::{Cursor, Write};

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use chrono::{SecondsFormat, Utc};
use mockito::{Matcher, Server, ServerGuard};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use qa_dashboard_api::api::{create_router, AppState};
use qa_dashboard_api::config::Config;

const REPO: &str = "acme/qa-automation";
const RUNS_PATH: &str = "/repos/acme/qa-automation/actions/runs";
const CLOUD_RUNS_PATH: &str = "/projects/proj1/runs";

/// Config pointing at the mock servers, with instant trigger polling.
fn test_config(github: &ServerGuard, cloud: Option<&ServerGuard>) -> Config {
    let mut config = Config::with_credentials("gh-token", REPO);
    config.github_api_url = github.url();
    if let Some(cloud) = cloud {
        config.cypress_api_url = cloud.url();
        config.cypress_project_id = Some("proj1".to_string());
        config.cypress_record_key = Some("record-key".to_string());
    }
    config.trigger_initial_delay_ms = 1;
    config.trigger_poll_interval_ms = 1;
    config.trigger_poll_timeout_ms = 0;
    config
}

fn app(config: Config) -> Router {
    create_router(AppState::from_config(config).expect("valid test config"))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn log_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn workflow_run(id: u64, name: &str, sha: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "status": "completed",
        "conclusion": "success",
        "head_sha": sha,
        "html_url": format!("https://github.com/{REPO}/actions/runs/{id}"),
        "created_at": created_at,
        "head_commit": { "message": format!("commit {sha}") }
    })
}

/// RFC 3339 timestamp `offset_secs` away from now.
fn from_now(offset_secs: i64) -> String {
    let at = Utc::now() + chrono::Duration::seconds(offset_secs);
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn cloud_run(n: u64, sha: &str) -> Value {
    json!({
        "id": n,
        "url": format!("https://cloud.cypress.io/projects/ab12cd/runs/{n}"),
        "commit": { "sha": sha }
    })
}

#[tokio::test]
async fn status_correlates_via_cloud_api_without_scanning_logs() {
    let mut github = Server::new_async().await;
    let mut cloud = Server::new_async().await;

    let runs = github
        .mock("GET", RUNS_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("branch".into(), "main".into()),
            Matcher::UrlEncoded("per_page".into(), "1".into()),
        ]))
        .match_header("authorization", "Bearer gh-token")
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "workflow_runs": [workflow_run(42, "QA Regression", "abc", "2024-05-01T10:00:00Z")] })
                .to_string(),
        )
        .create_async()
        .await;
    let logs = github
        .mock("GET", format!("{RUNS_PATH}/42/logs").as_str())
        .expect(0)
        .create_async()
        .await;
    let cloud_runs = cloud
        .mock("GET", CLOUD_RUNS_PATH)
        .match_query(Matcher::UrlEncoded("limit".into(), "20".into()))
        .match_header("authorization", "Bearer record-key")
        .with_body(json!({ "runs": [cloud_run(7, "zzz"), cloud_run(6, "abc")] }).to_string())
        .create_async()
        .await;

    let app = app(test_config(&github, Some(&cloud)));
    let (status, _, body) = send(&app, get("/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "id": 42,
            "name": "QA Regression",
            "status": "completed",
            "conclusion": "success",
            "url": "https://github.com/acme/qa-automation/actions/runs/42",
            "cypressUrl": "https://cloud.cypress.io/projects/ab12cd/runs/6",
            "env": "qa",
            "message": "commit abc",
            "createdAt": "2024-05-01T10:00:00Z"
        })
    );

    runs.assert_async().await;
    cloud_runs.assert_async().await;
    logs.assert_async().await;
}

#[tokio::test]
async fn run_lookup_falls_back_to_log_archive() {
    let mut github = Server::new_async().await;
    let mut cloud = Server::new_async().await;

    github
        .mock("GET", format!("{RUNS_PATH}/77").as_str())
        .with_body(workflow_run(77, "Dev Smoke", "def", "2024-05-02T09:00:00Z").to_string())
        .create_async()
        .await;
    let logs = github
        .mock("GET", format!("{RUNS_PATH}/77/logs").as_str())
        .with_header("content-type", "application/zip")
        .with_body(log_archive(&[
            ("0_setup.txt", "Installing dependencies"),
            ("1_e2e.txt", "Recorded Run: https://cloud.cypress.io/projects/ab12cd/runs/512"),
            ("2_e2e.txt", "Recorded Run: https://cloud.cypress.io/projects/ab12cd/runs/513"),
        ]))
        .create_async()
        .await;
    cloud
        .mock("GET", CLOUD_RUNS_PATH)
        .match_query(Matcher::Any)
        .with_body(json!({ "runs": [cloud_run(9, "other")] }).to_string())
        .create_async()
        .await;

    let app = app(test_config(&github, Some(&cloud)));
    let (status, _, body) = send(&app, get("/run/77")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cypressUrl"], "https://cloud.cypress.io/projects/ab12cd/runs/512");
    assert_eq!(body["env"], "dev");
    logs.assert_async().await;

    // The served run is remembered.
    let (status, _, recent) = send(&app, get("/recent")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recent["runs"][0]["id"], 77);
}

#[tokio::test]
async fn cloud_failure_degrades_to_log_scan() {
    let mut github = Server::new_async().await;
    let mut cloud = Server::new_async().await;

    github
        .mock("GET", format!("{RUNS_PATH}/5").as_str())
        .with_body(workflow_run(5, "QA", "abc", "2024-05-02T09:00:00Z").to_string())
        .create_async()
        .await;
    github
        .mock("GET", format!("{RUNS_PATH}/5/logs").as_str())
        .with_body(log_archive(&[(
            "1_e2e.txt",
            "https://cloud.cypress.io/projects/ab12cd/runs/99",
        )]))
        .create_async()
        .await;
    cloud
        .mock("GET", CLOUD_RUNS_PATH)
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let app = app(test_config(&github, Some(&cloud)));
    let (status, _, body) = send(&app, get("/run/5")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cypressUrl"], "https://cloud.cypress.io/projects/ab12cd/runs/99");
}

#[tokio::test]
async fn unresolved_run_has_null_cloud_url() {
    let mut github = Server::new_async().await;

    github
        .mock("GET", format!("{RUNS_PATH}/8").as_str())
        .with_body(json!({ "id": 8, "name": "Dev" }).to_string())
        .create_async()
        .await;
    github
        .mock("GET", format!("{RUNS_PATH}/8/logs").as_str())
        .with_status(410)
        .with_body(r#"{"message":"Gone"}"#)
        .create_async()
        .await;

    let app = app(test_config(&github, None));
    let (status, _, body) = send(&app, get("/run/8")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cypressUrl"], Value::Null);
    assert_eq!(body["status"], "unknown");
    assert_eq!(body["conclusion"], "pending");
}

#[tokio::test]
async fn invalid_run_id_is_rejected_before_any_upstream_call() {
    let mut github = Server::new_async().await;
    let any = github
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let app = app(test_config(&github, None));
    for uri in ["/run/abc", "/run/0", "/run/-3"] {
        let (status, _, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string());
    }

    any.assert_async().await;
}

#[tokio::test]
async fn history_is_capped_and_keeps_provider_order() {
    let mut github = Server::new_async().await;
    let mut cloud = Server::new_async().await;

    let listed: Vec<Value> = (1..=5u64)
        .rev()
        .map(|id| {
            let name = if id % 2 == 0 { "QA Regression" } else { "Dev Smoke" };
            workflow_run(id, name, &format!("sha{id}"), "2024-05-01T10:00:00Z")
        })
        .collect();

    github
        .mock("GET", RUNS_PATH)
        .match_query(Matcher::UrlEncoded("per_page".into(), "3".into()))
        .with_body(json!({ "workflow_runs": listed }).to_string())
        .create_async()
        .await;
    let cloud_runs = cloud
        .mock("GET", CLOUD_RUNS_PATH)
        .match_query(Matcher::Any)
        .with_body(
            json!({ "runs": [cloud_run(105, "sha5"), cloud_run(104, "sha4"), cloud_run(103, "sha3")] })
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let logs = github
        .mock("GET", Matcher::Regex(r"/logs$".to_string()))
        .expect(0)
        .create_async()
        .await;

    let mut config = test_config(&github, Some(&cloud));
    config.history_limit = 3;
    let app = app(config);

    let (status, _, body) = send(&app, get("/history")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let runs = body["runs"].as_array().unwrap();
    let ids: Vec<u64> = runs.iter().map(|r| r["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![5, 4, 3]);

    let envs: Vec<&str> = runs.iter().map(|r| r["env"].as_str().unwrap()).collect();
    assert_eq!(envs, vec!["dev", "qa", "dev"]);
    assert_eq!(runs[1]["cypressUrl"], "https://cloud.cypress.io/projects/ab12cd/runs/104");

    cloud_runs.assert_async().await;
    logs.assert_async().await;
}

#[tokio::test]
async fn history_scans_logs_concurrently_in_provider_order() {
    let mut github = Server::new_async().await;

    let listed: Vec<Value> = (1..=4u64)
        .rev()
        .map(|id| workflow_run(id, "Dev Smoke", &format!("sha{id}"), "2024-05-01T10:00:00Z"))
        .collect();
    github
        .mock("GET", RUNS_PATH)
        .match_query(Matcher::Any)
        .with_body(json!({ "workflow_runs": listed }).to_string())
        .create_async()
        .await;

    let mut scans = Vec::new();
    for id in 1..=4u64 {
        let archive = log_archive(&[
            ("0_setup.txt", "Installing dependencies"),
            (
                "1_cypress.txt",
                &format!("Recorded Run: https://cloud.cypress.io/projects/ab12cd/runs/{}", id * 10),
            ),
        ]);
        scans.push(
            github
                .mock("GET", format!("{RUNS_PATH}/{id}/logs").as_str())
                .with_body(archive)
                .expect(1)
                .create_async()
                .await,
        );
    }

    let mut config = test_config(&github, None);
    config.log_scan_concurrency = 3;
    let app = app(config);

    let (status, _, body) = send(&app, get("/history")).await;

    assert_eq!(status, StatusCode::OK);
    let pairs: Vec<(u64, &str)> = body["runs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| (r["id"].as_u64().unwrap(), r["cypressUrl"].as_str().unwrap()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            (4, "https://cloud.cypress.io/projects/ab12cd/runs/40"),
            (3, "https://cloud.cypress.io/projects/ab12cd/runs/30"),
            (2, "https://cloud.cypress.io/projects/ab12cd/runs/20"),
            (1, "https://cloud.cypress.io/projects/ab12cd/runs/10"),
        ]
    );

    for scan in scans {
        scan.assert_async().await;
    }
}

#[tokio::test]
async fn trigger_qa_dispatches_qa_workflow_and_selects_qa_run() {
    let mut github = Server::new_async().await;

    let dispatch = github
        .mock("POST", "/repos/acme/qa-automation/actions/workflows/qa.yml/dispatches")
        .match_header("authorization", "Bearer gh-token")
        .match_body(Matcher::Json(json!({ "ref": "main" })))
        .with_status(204)
        .create_async()
        .await;
    let dev_dispatch = github
        .mock("POST", "/repos/acme/qa-automation/actions/workflows/dev.yml/dispatches")
        .expect(0)
        .create_async()
        .await;
    github
        .mock("GET", RUNS_PATH)
        .match_query(Matcher::Any)
        .with_body(
            json!({ "workflow_runs": [
                workflow_run(30, "Dev Smoke", "s30", &from_now(2)),
                workflow_run(29, "QA Regression", "s29", &from_now(1)),
                workflow_run(28, "QA Regression", "s28", &from_now(-3600))
            ]})
            .to_string(),
        )
        .create_async()
        .await;
    github
        .mock("GET", format!("{RUNS_PATH}/29/logs").as_str())
        .with_body(log_archive(&[("1_e2e.txt", "no cloud run recorded")]))
        .create_async()
        .await;

    let app = app(test_config(&github, None));
    let (status, _, body) = send(
        &app,
        post_json("/trigger", json!({ "env": "qa", "message": "nightly rerun" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["id"], 29);
    assert_eq!(body["env"], "qa");
    assert_eq!(body["cypressUrl"], Value::Null);

    dispatch.assert_async().await;
    dev_dispatch.assert_async().await;

    let (_, _, recent) = send(&app, get("/recent")).await;
    assert_eq!(recent["runs"][0]["id"], 29);
}

#[tokio::test]
async fn trigger_defaults_to_dev() {
    let mut github = Server::new_async().await;

    let dispatch = github
        .mock("POST", "/repos/acme/qa-automation/actions/workflows/dev.yml/dispatches")
        .with_status(204)
        .create_async()
        .await;
    github
        .mock("GET", RUNS_PATH)
        .match_query(Matcher::Any)
        .with_body(
            json!({ "workflow_runs": [workflow_run(31, "Dev Smoke", "s31", &from_now(1))] })
                .to_string(),
        )
        .create_async()
        .await;
    github
        .mock("GET", format!("{RUNS_PATH}/31/logs").as_str())
        .with_status(404)
        .create_async()
        .await;

    let app = app(test_config(&github, None));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/trigger")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 31);
    assert_eq!(body["env"], "dev");
    dispatch.assert_async().await;
}

#[tokio::test]
async fn trigger_reports_404_when_no_run_appears() {
    let mut github = Server::new_async().await;

    github
        .mock("POST", "/repos/acme/qa-automation/actions/workflows/qa.yml/dispatches")
        .with_status(204)
        .create_async()
        .await;
    github
        .mock("GET", RUNS_PATH)
        .match_query(Matcher::Any)
        .with_body(
            json!({ "workflow_runs": [workflow_run(30, "Dev Smoke", "s30", &from_now(1))] })
                .to_string(),
        )
        .create_async()
        .await;

    let app = app(test_config(&github, None));
    let (status, _, body) = send(&app, post_json("/trigger", json!({ "env": "qa" }))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "No qa run found" }));
}

#[tokio::test]
async fn trigger_keeps_polling_past_runs_that_predate_the_dispatch() {
    let mut github = Server::new_async().await;

    github
        .mock("POST", "/repos/acme/qa-automation/actions/workflows/qa.yml/dispatches")
        .with_status(204)
        .create_async()
        .await;
    let listing = github
        .mock("GET", RUNS_PATH)
        .match_query(Matcher::Any)
        .with_body(
            json!({ "workflow_runs": [workflow_run(28, "QA Regression", "s28", "2020-01-01T00:00:00Z")] })
                .to_string(),
        )
        .expect_at_least(2)
        .create_async()
        .await;
    let logs = github
        .mock("GET", Matcher::Regex(r"/logs$".to_string()))
        .expect(0)
        .create_async()
        .await;

    let mut config = test_config(&github, None);
    config.trigger_poll_interval_ms = 5;
    config.trigger_poll_timeout_ms = 100;
    let app = app(config);

    let (status, _, body) = send(&app, post_json("/trigger", json!({ "env": "qa" }))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "No qa run found" }));
    listing.assert_async().await;
    logs.assert_async().await;

    let (_, _, recent) = send(&app, get("/recent")).await;
    assert_eq!(recent["runs"], json!([]));
}

#[tokio::test]
async fn trigger_propagates_dispatch_failure() {
    let mut github = Server::new_async().await;

    github
        .mock("POST", "/repos/acme/qa-automation/actions/workflows/dev.yml/dispatches")
        .with_status(422)
        .with_body(r#"{"message":"Workflow does not have 'workflow_dispatch' trigger"}"#)
        .create_async()
        .await;
    let listing = github
        .mock("GET", RUNS_PATH)
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let app = app(test_config(&github, None));
    let (status, _, body) = send(&app, post_json("/trigger", json!({ "env": "dev" }))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body,
        json!({ "error": { "message": "Workflow does not have 'workflow_dispatch' trigger" } })
    );
    listing.assert_async().await;
}

#[tokio::test]
async fn trigger_rejects_unknown_env() {
    let github = Server::new_async().await;
    let app = app(test_config(&github, None));

    let (status, _, body) = send(&app, post_json("/trigger", json!({ "env": "prod" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "unknown env 'prod'" }));
}

#[tokio::test]
async fn upstream_failure_propagates_status_and_body() {
    let mut github = Server::new_async().await;

    github
        .mock("GET", RUNS_PATH)
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"message":"Bad credentials"}"#)
        .create_async()
        .await;

    let app = app(test_config(&github, None));
    let (status, _, body) = send(&app, get("/status")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": { "message": "Bad credentials" } }));
}

#[tokio::test]
async fn malformed_listing_is_bad_gateway() {
    let mut github = Server::new_async().await;

    github
        .mock("GET", RUNS_PATH)
        .match_query(Matcher::Any)
        .with_body(r#"{"workflow_runs":"nope"}"#)
        .create_async()
        .await;

    let app = app(test_config(&github, None));
    let (status, _, body) = send(&app, get("/history")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn empty_listing_is_not_found() {
    let mut github = Server::new_async().await;

    github
        .mock("GET", RUNS_PATH)
        .match_query(Matcher::Any)
        .with_body(r#"{"total_count":0,"workflow_runs":[]}"#)
        .create_async()
        .await;

    let app = app(test_config(&github, None));
    let (status, _, body) = send(&app, get("/status")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "No workflow runs found" }));
}

#[tokio::test]
async fn disallowed_origin_is_served_without_allow_origin_header() {
    let mut github = Server::new_async().await;

    github
        .mock("GET", RUNS_PATH)
        .match_query(Matcher::Any)
        .with_body(json!({ "workflow_runs": [{ "id": 1, "name": "Dev" }] }).to_string())
        .create_async()
        .await;
    github
        .mock("GET", format!("{RUNS_PATH}/1/logs").as_str())
        .with_status(404)
        .create_async()
        .await;

    let app = app(test_config(&github, None));

    let request = Request::builder()
        .uri("/status")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert_eq!(body["id"], 1);

    let request = Request::builder()
        .uri("/status")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn preflight_never_reaches_upstream() {
    let mut github = Server::new_async().await;
    let any_get = github
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let any_post = github
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let app = app(test_config(&github, None));
    for uri in ["/status", "/history", "/run/12", "/trigger"] {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(uri)
            .header(header::ORIGIN, "https://evil.example")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, Value::Null);
    }

    any_get.assert_async().await;
    any_post.assert_async().await;
}
