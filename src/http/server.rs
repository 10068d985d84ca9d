//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: health check, validated API, upstream fallback
//! - Wire up middleware (tracing, request ID, timeout, body limit, gate)
//! - Apply config reloads to the gate
//! - Sweep idle rate-limit keys in the background
//! - Serve with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware,
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::api;
use crate::config::GateConfig;
use crate::gate::{gate_middleware, RequestGate};
use crate::http::request::RequestIdLayer;
use crate::http::upstream::{UpstreamClient, UpstreamError};
use crate::security::{AuditSink, FanOutAuditSink, MemoryAuditSink, TracingAuditSink};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<RequestGate>,
    pub upstream: UpstreamClient,
}

/// HTTP server for the gate.
pub struct HttpServer {
    router: Router,
    config: GateConfig,
    gate: Arc<RequestGate>,
}

impl HttpServer {
    /// Server auditing to the `audit` log target and an in-memory buffer.
    pub fn new(config: GateConfig) -> Result<Self, UpstreamError> {
        let audit = FanOutAuditSink::new(vec![
            Arc::new(TracingAuditSink),
            Arc::new(MemoryAuditSink::new(config.audit.memory_capacity)),
        ]);
        Self::with_audit(config, Arc::new(audit))
    }

    /// Server auditing to the given sink.
    pub fn with_audit(config: GateConfig, audit: Arc<dyn AuditSink>) -> Result<Self, UpstreamError> {
        let gate = Arc::new(RequestGate::from_config(&config, audit));
        let upstream = UpstreamClient::new(&config.upstream)?;

        let state = AppState {
            gate: gate.clone(),
            upstream,
        };
        let router = Self::build_router(&config, state);

        Ok(Self { router, config, gate })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GateConfig, state: AppState) -> Router {
        let gate = state.gate.clone();
        Router::new()
            .route("/healthz", get(healthz))
            .merge(api::router())
            .fallback(proxy_handler)
            .with_state(state)
            .layer(middleware::from_fn_with_state(gate, gate_middleware))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    pub fn gate(&self) -> Arc<RequestGate> {
        self.gate.clone()
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GateConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            "HTTP server starting"
        );

        tokio::spawn(apply_reloads(
            self.gate.clone(),
            self.config.clone(),
            config_updates,
            shutdown.resubscribe(),
        ));

        if self.config.rate_limit.enabled {
            let period = Duration::from_secs(self.config.rate_limit.sweep_interval_secs.max(1));
            tokio::spawn(sweep_limiter(self.gate.clone(), period, shutdown.resubscribe()));
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Apply reloaded configs to the gate until shutdown.
async fn apply_reloads(
    gate: Arc<RequestGate>,
    mut current: GateConfig,
    mut updates: mpsc::UnboundedReceiver<GateConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            Some(config) = updates.recv() => {
                if config.listener != current.listener
                    || config.upstream != current.upstream
                    || config.timeouts != current.timeouts
                {
                    tracing::warn!("Listener, upstream and timeout changes take effect on restart");
                }
                gate.reload(&config);
                current = config;
            }
            _ = shutdown.recv() => break,
        }
    }
}

async fn sweep_limiter(gate: Arc<RequestGate>, period: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(period);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = gate.sweep_limiter();
                if removed > 0 {
                    tracing::debug!(removed, "Evicted idle rate limit keys");
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Forward everything without a local handler to the upstream.
async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    state.upstream.forward(request).await
}
