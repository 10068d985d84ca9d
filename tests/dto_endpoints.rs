//! Validated API endpoints behind the gate.

use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

use common::{client, start_echo_upstream, test_config, TestGate};

async fn gate() -> TestGate {
    let upstream = start_echo_upstream().await;
    TestGate::start(test_config(upstream)).await
}

fn violations(body: &Value) -> Vec<(String, String)> {
    body["violations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| (v["field"].as_str().unwrap().to_string(), v["rule"].as_str().unwrap().to_string()))
        .collect()
}

#[tokio::test]
async fn test_login_forwards_only_declared_fields() {
    let gate = gate().await;

    let res = client()
        .post(gate.url("/api/auth/login"))
        .json(&json!({ "email": "ada@domofix.io", "password": "pw", "isAdmin": true }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/api/auth/login");
    assert_eq!(body["body"], json!({ "email": "ada@domofix.io", "password": "pw" }));
}

#[tokio::test]
async fn test_login_reports_every_field() {
    let gate = gate().await;

    let res = client()
        .post(gate.url("/api/auth/login"))
        .json(&json!({ "email": "not-an-email" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["error"], "Bad Request");
    assert_eq!(
        violations(&body),
        vec![
            ("email".to_string(), "isEmail".to_string()),
            ("password".to_string(), "isString".to_string()),
            ("password".to_string(), "isNotEmpty".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_reset_password_strength() {
    let gate = gate().await;
    let client = client();

    let weak = client
        .post(gate.url("/api/auth/reset-password"))
        .json(&json!({ "resetToken": "r-1", "newPassword": "abcdefg1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(weak.status(), StatusCode::BAD_REQUEST);
    let body: Value = weak.json().await.unwrap();
    assert_eq!(violations(&body), vec![("newPassword".to_string(), "matches".to_string())]);

    let short = client
        .post(gate.url("/api/auth/reset-password"))
        .json(&json!({ "resetToken": "r-1", "newPassword": "abcdef1" }))
        .send()
        .await
        .unwrap();
    let body: Value = short.json().await.unwrap();
    assert_eq!(
        violations(&body),
        vec![
            ("newPassword".to_string(), "minLength".to_string()),
            ("newPassword".to_string(), "matches".to_string()),
        ]
    );

    let strong = client
        .post(gate.url("/api/auth/reset-password"))
        .json(&json!({ "resetToken": "r-1", "newPassword": "Abcdef12" }))
        .send()
        .await
        .unwrap();
    assert_eq!(strong.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forgot_password_rejects_non_json() {
    let gate = gate().await;

    let res = client()
        .post(gate.url("/api/auth/forgot-password"))
        .header("content-type", "application/json")
        .body("email=ada@domofix.io")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(violations(&body), vec![("body".to_string(), "isObject".to_string())]);
}

#[tokio::test]
async fn test_reviews_query_requires_session_then_validates() {
    let gate = gate().await;
    let token = gate.token("user-3", 600);
    let client = client();

    let anonymous = client.get(gate.url("/api/reviews")).send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::TEMPORARY_REDIRECT);

    let bad = client
        .get(gate.url("/api/reviews?providerId=not-an-id"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    let body: Value = bad.json().await.unwrap();
    assert_eq!(body["message"][0], "providerId must be a mongodb id");

    let all = client.get(gate.url("/api/reviews")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(all.status(), StatusCode::OK);

    let one = client
        .get(gate.url("/api/reviews?providerId=507f1f77bcf86cd799439011"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(one.status(), StatusCode::OK);
    let body: Value = one.json().await.unwrap();
    assert_eq!(body["query"], "providerId=507f1f77bcf86cd799439011");
    assert_eq!(body["user_id"], "user-3");
}

#[tokio::test]
async fn test_mark_read() {
    let gate = gate().await;
    let token = gate.token("user-4", 600);
    let client = client();

    let ok = client
        .post(gate.url("/api/messages/c-42/read"))
        .bearer_auth(&token)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body: Value = ok.json().await.unwrap();
    assert_eq!(body["path"], "/api/messages/c-42/read");

    let bad = client
        .post(gate.url("/api/messages/c-42/read"))
        .bearer_auth(&token)
        .json(&json!({ "upToMessageId": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}
