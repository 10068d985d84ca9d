//! Admin API on its own listener.
//!
//! Read-only views of gate state: service status, recent audit events and
//! rate limiter occupancy.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::gate::RequestGate;

#[derive(Clone)]
pub struct AdminState {
    pub gate: Arc<RequestGate>,
    pub api_key: Arc<str>,
    pub started_at: Instant,
}

impl AdminState {
    pub fn new(gate: Arc<RequestGate>, api_key: &str) -> Self {
        Self {
            gate,
            api_key: Arc::from(api_key),
            started_at: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/audit", get(get_audit))
        .route("/admin/limiter", get(get_limiter))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
