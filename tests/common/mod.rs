//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, Uri},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use domofix_gate::auth::{JwtCodec, TokenCodec, TokenPayload};
use domofix_gate::config::GateConfig;
use domofix_gate::security::{AuditEventType, MemoryAuditSink};
use domofix_gate::{HttpServer, Shutdown};

/// Start an upstream that answers every request with a JSON description of it.
pub async fn start_echo_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(echo);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    let body = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "user_id": header("x-user-id"),
        "user_role": header("x-user-role"),
        "request_id": header("x-request-id"),
        "forwarded_for": header("x-forwarded-for"),
        "body": body,
    }))
}

/// Default config pointed at `upstream`, with a test secret.
pub fn test_config(upstream: SocketAddr) -> GateConfig {
    let mut config = GateConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.address = upstream.to_string();
    config.token.secret = "integration-test-secret-0123456789abcdef".into();
    config.observability.metrics_enabled = false;
    config
}

/// A running gate wired to an in-memory audit sink.
pub struct TestGate {
    pub addr: SocketAddr,
    pub audit: Arc<MemoryAuditSink>,
    pub codec: JwtCodec,
    pub config_tx: mpsc::UnboundedSender<GateConfig>,
    pub shutdown: Shutdown,
}

impl TestGate {
    pub async fn start(config: GateConfig) -> Self {
        let audit = Arc::new(MemoryAuditSink::new(100));
        let codec = JwtCodec::from_config(&config.token);
        let shutdown = Shutdown::new();
        let (config_tx, config_rx) = mpsc::unbounded_channel();

        let server = HttpServer::with_audit(config.clone(), audit.clone()).unwrap();
        let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server_shutdown = shutdown.subscribe();

        tokio::spawn(async move {
            let _ = server.run(listener, config_rx, server_shutdown).await;
        });

        Self {
            addr,
            audit,
            codec,
            config_tx,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn token(&self, sub: &str, ttl_secs: i64) -> String {
        self.codec.issue(&TokenPayload::new(sub, None, None, ttl_secs)).unwrap()
    }

    pub fn audit_count(&self, event_type: AuditEventType) -> usize {
        self.audit
            .snapshot()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    /// Push a config reload and give the reload loop time to apply it.
    pub async fn reload(&self, config: GateConfig) {
        self.config_tx.send(config).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

impl Drop for TestGate {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Client that never follows redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
