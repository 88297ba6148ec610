// ABOUTME: Integration tests for the API smoke suite.
// ABOUTME: A closure stands in for the deployed service's full route surface.

mod support;

use skiff::commands::smoke_with;
use skiff::config::Config;
use skiff::error::Error;
use skiff::output::{Output, OutputMode};
use skiff::types::Sensitive;
use skiff::verify::smoke::{self, SmokeConfig};
use skiff::verify::{ProbeError, ProbeMethod, ProbeRequest};
use support::{FnProbe, ScriptedRunner, ok, response};

const BASE: &str = "https://abc123.execute-api.us-east-1.amazonaws.com/prod";
const KEY: &str = "test-key-123";

fn smoke_config() -> SmokeConfig {
    SmokeConfig {
        base_url: BASE.to_string(),
        api_key: Sensitive::new(KEY.to_string()),
        burst_requests: 5,
    }
}

fn has_valid_key(req: &ProbeRequest) -> bool {
    req.headers
        .iter()
        .any(|(name, value)| name == "x-api-key" && value == KEY)
}

/// A well-behaved rendition of the demo user service.
fn fake_api(req: &ProbeRequest) -> Result<skiff::verify::ProbeResponse, ProbeError> {
    let path = req.url.strip_prefix(BASE).unwrap_or(&req.url);

    let resp = match (req.method, path) {
        (ProbeMethod::Get, "/health") => response(200, r#"{"status":"UP"}"#),
        (ProbeMethod::Get, "/") => response(200, r#"{"service":"webapp","version":"1.0.0"}"#),
        (_, p) if p.starts_with("/v1/") && !has_valid_key(req) => {
            response(401, r#"{"error":"missing or invalid api key"}"#)
        }
        (ProbeMethod::Get, "/v1/users") => response(200, r#"{"users":[],"count":0}"#),
        (ProbeMethod::Post, "/v1/users") => {
            let body = req.body.as_deref().unwrap_or("");
            if body.contains("email") {
                response(201, r#"{"id":"u-1001","status":"active"}"#)
            } else {
                response(400, r#"{"error":"email is required"}"#)
            }
        }
        (ProbeMethod::Get, "/v1/users/u-1001") => {
            response(200, r#"{"id":"u-1001","name":"John Doe","status":"active"}"#)
        }
        (ProbeMethod::Get, p) if p.starts_with("/v1/users/") => {
            response(404, r#"{"error":"user not found"}"#)
        }
        _ => response(404, r#"{"error":"no such route"}"#),
    };
    Ok(resp)
}

#[tokio::test]
async fn full_route_sweep_passes_against_a_conforming_service() {
    let probe = FnProbe(fake_api);

    let report = smoke::run(&probe, &smoke_config()).await;

    assert!(
        report.all_passed(),
        "failed checks: {:?}",
        report
            .checks
            .iter()
            .filter(|c| !c.passed)
            .collect::<Vec<_>>()
    );
    // Nine counted checks plus the informational burst.
    assert_eq!(report.total_counted(), 9);
    assert_eq!(report.checks.len(), 10);
    assert!(report.checks.last().unwrap().informational);
}

#[tokio::test]
async fn missing_email_validation_is_checked_against_the_body() {
    // Same service, but the validation error does not name the field.
    let probe = FnProbe(|req: &ProbeRequest| {
        if req.method == ProbeMethod::Post
            && !req.body.as_deref().unwrap_or("").contains("email")
        {
            return Ok(response(400, r#"{"error":"bad request"}"#));
        }
        fake_api(req)
    });

    let report = smoke::run(&probe, &smoke_config()).await;

    let check = report
        .checks
        .iter()
        .find(|c| c.name == "POST /v1/users (missing email)")
        .unwrap();
    assert!(!check.passed);
}

#[tokio::test]
async fn downed_health_endpoint_fails_the_suite() {
    let probe = FnProbe(|req: &ProbeRequest| {
        if req.url.ends_with("/health") {
            Ok(response(503, r#"{"status":"DOWN"}"#))
        } else {
            fake_api(req)
        }
    });

    let report = smoke::run(&probe, &smoke_config()).await;

    assert!(!report.all_passed());
    assert_eq!(report.failed_count(), 1);
}

#[tokio::test]
async fn unauthenticated_requests_must_be_rejected() {
    // A service that forgot auth: every /v1 route answers 200.
    let probe = FnProbe(|req: &ProbeRequest| {
        let path = req.url.strip_prefix(BASE).unwrap_or(&req.url);
        match (req.method, path) {
            (ProbeMethod::Post, "/v1/users") => fake_api_authless(req),
            _ => {
                if path.starts_with("/v1/") {
                    Ok(response(200, r#"{"users":[]}"#))
                } else {
                    fake_api(req)
                }
            }
        }
    });

    let report = smoke::run(&probe, &smoke_config()).await;

    let no_key = report
        .checks
        .iter()
        .find(|c| c.name == "GET /v1/users (no key)")
        .unwrap();
    let bad_key = report
        .checks
        .iter()
        .find(|c| c.name == "GET /v1/users (bad key)")
        .unwrap();
    assert!(!no_key.passed);
    assert!(!bad_key.passed);
}

fn fake_api_authless(req: &ProbeRequest) -> Result<skiff::verify::ProbeResponse, ProbeError> {
    let body = req.body.as_deref().unwrap_or("");
    if body.contains("email") {
        Ok(response(201, r#"{"id":"u-1001","status":"active"}"#))
    } else {
        Ok(response(400, r#"{"error":"email is required"}"#))
    }
}

const SMOKE_OUTPUTS: &str = r#"{
  "api_base_url": {"sensitive": false, "type": "string", "value": "https://abc123.execute-api.us-east-1.amazonaws.com/prod"},
  "api_key": {"sensitive": true, "type": "string", "value": "test-key-123"}
}"#;

#[tokio::test]
async fn smoke_command_derives_urls_and_key_from_outputs() {
    support::ensure_stub_tools();
    let config = Config::template();
    let runner = ScriptedRunner::new(vec![ok(SMOKE_OUTPUTS)]);
    let probe = FnProbe(fake_api);

    smoke_with(&config, &runner, &probe, Output::new(OutputMode::Quiet))
        .await
        .unwrap();

    assert_eq!(runner.calls(), vec!["terraform output -json"]);
}

#[tokio::test]
async fn smoke_command_exits_nonzero_on_a_failing_route() {
    support::ensure_stub_tools();
    let config = Config::template();
    let runner = ScriptedRunner::new(vec![ok(SMOKE_OUTPUTS)]);
    let probe = FnProbe(|req: &ProbeRequest| {
        if req.url.ends_with("/health") {
            Ok(response(503, r#"{"status":"DOWN"}"#))
        } else {
            fake_api(req)
        }
    });

    let err = smoke_with(&config, &runner, &probe, Output::new(OutputMode::Quiet))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SmokeFailed { failed: 1, total: 9 }));
}

#[tokio::test]
async fn burst_reports_throttling_without_failing() {
    // Rate limiter trips after the second authenticated list call.
    let counter = std::sync::atomic::AtomicU32::new(0);
    let probe = FnProbe(move |req: &ProbeRequest| {
        let path = req.url.strip_prefix(BASE).unwrap_or(&req.url);
        if req.method == ProbeMethod::Get && path == "/v1/users" && has_valid_key(req) {
            let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n >= 2 {
                return Ok(response(429, r#"{"error":"rate limit exceeded"}"#));
            }
        }
        fake_api(req)
    });

    let report = smoke::run(&probe, &smoke_config()).await;

    let burst = report.checks.last().unwrap();
    assert!(burst.informational);
    assert!(burst.detail.contains("throttled"));
    // Informational outcome never fails the suite.
    assert!(report.all_passed());
}
