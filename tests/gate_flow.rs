//! End-to-end gate behavior against a live server and echo upstream.

use reqwest::StatusCode;
use serde_json::Value;

use domofix_gate::security::AuditEventType;

mod common;

use common::{client, start_echo_upstream, test_config, TestGate};

async fn gate() -> TestGate {
    let upstream = start_echo_upstream().await;
    TestGate::start(test_config(upstream)).await
}

#[tokio::test]
async fn test_public_path_forwards_without_token() {
    let gate = gate().await;

    let res = client().get(gate.url("/get-started")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/get-started");
    assert_eq!(body["user_id"], Value::Null);
    assert!(gate.audit.is_empty());
}

#[tokio::test]
async fn test_protected_path_without_token_redirects_to_login() {
    let gate = gate().await;

    let res = client().get(gate.url("/dashboard")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(res.headers()["location"], "/login?redirect=%2Fdashboard");
    assert!(gate.audit.is_empty());
}

#[tokio::test]
async fn test_expired_token_redirects_and_audits_once() {
    let gate = gate().await;
    let token = gate.token("user-1", -30);

    let res = client()
        .get(gate.url("/dashboard"))
        .header("cookie", format!("token={}", token))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(res.headers()["location"], "/login?redirect=%2Fdashboard");
    let cookie = res.headers()["set-cookie"].to_str().unwrap();
    assert!(cookie.starts_with("token=;"));
    assert!(cookie.contains("Max-Age=0"));
    assert_eq!(gate.audit_count(AuditEventType::TokenExpired), 1);
    assert_eq!(gate.audit.len(), 1);
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let gate = gate().await;

    let res = client()
        .get(gate.url("/notifications"))
        .bearer_auth("definitely.not.valid")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(gate.audit_count(AuditEventType::AuthFailure), 1);
}

#[tokio::test]
async fn test_valid_token_forwards_identity_and_strips_spoofing() {
    let gate = gate().await;
    let token = gate.token("user-1", 600);

    let res = client()
        .get(gate.url("/history?page=2"))
        .bearer_auth(&token)
        .header("x-user-id", "admin")
        .header("x-user-role", "admin")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/history");
    assert_eq!(body["query"], "page=2");
    assert_eq!(body["user_id"], "user-1");
    assert_eq!(body["user_role"], Value::Null);
    assert_eq!(body["forwarded_for"], "127.0.0.1");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn test_rate_limit_precedes_token_check() {
    let upstream = start_echo_upstream().await;
    let mut config = test_config(upstream);
    config.rate_limit.max_requests = 3;
    let gate = TestGate::start(config).await;
    let token = gate.token("user-1", 600);
    let client = client();

    for _ in 0..3 {
        let res = client.get(gate.url("/dashboard")).bearer_auth(&token).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = client
        .get(gate.url("/dashboard"))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = res.text().await.unwrap();
    assert!(!body.contains("remaining"));

    assert_eq!(gate.audit_count(AuditEventType::RateLimited), 1);
    assert_eq!(gate.audit_count(AuditEventType::AuthFailure), 0);

    // Public paths are never limited
    let res = client.get(gate.url("/login")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reload_updates_allow_list() {
    let upstream = start_echo_upstream().await;
    let config = test_config(upstream);
    let gate = TestGate::start(config.clone()).await;

    let res = client().get(gate.url("/pricing")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);

    let mut updated = config;
    updated.gate.public_paths.push("/pricing".into());
    gate.reload(updated).await;

    let res = client().get(gate.url("/pricing")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_check_is_local() {
    let gate = gate().await;

    let res = client().get(gate.url("/healthz")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let gate = TestGate::start(test_config(dead)).await;

    let res = client().get(gate.url("/get-started")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}
