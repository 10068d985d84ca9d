use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::AdminState;
use crate::security::AuditEvent;

const DEFAULT_AUDIT_LIMIT: usize = 50;
const MAX_AUDIT_LIMIT: usize = 1000;

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LimiterStatus {
    pub enabled: bool,
    pub tracked_keys: usize,
    pub max_requests: u32,
    pub window_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// Most recent audit events, newest first.
pub async fn get_audit(State(state): State<AdminState>, Query(query): Query<AuditQuery>) -> Json<Vec<AuditEvent>> {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).min(MAX_AUDIT_LIMIT);
    Json(state.gate.audit().recent(limit))
}

pub async fn get_limiter(State(state): State<AdminState>) -> Json<LimiterStatus> {
    let config = state.gate.rate_limit_config();
    Json(LimiterStatus {
        enabled: config.enabled,
        tracked_keys: state.gate.limiter().tracked_keys(),
        max_requests: config.max_requests,
        window_secs: config.window_secs,
    })
}
