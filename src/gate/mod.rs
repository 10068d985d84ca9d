//! Request gate: the interception stage in front of every route handler.
//!
//! # Data Flow
//! ```text
//! Inbound request (path, headers, peer)
//!     → matcher.rs (public allow-list)        → FORWARD, no identity
//!     → security::rate_limit (per-client key) → REJECT 429 + RATE_LIMITED
//!     → auth::extract (cookie / bearer)       → REDIRECT login
//!     → auth::token (decode)                  → REJECT 401 + AUTH_FAILURE
//!     → expiry check (exp <= now)             → REDIRECT login + TOKEN_EXPIRED
//!     → FORWARD with identity
//! ```
//!
//! # Design Decisions
//! - Rate check precedes token work, so limited clients cost no crypto
//! - Every outcome is terminal; the gate never retries and never errors
//! - Policy is swapped atomically on config reload

pub mod matcher;
pub mod middleware;
pub mod outcome;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    extract::ConnectInfo,
    http::{request::Parts, HeaderMap, Method},
};
use chrono::Utc;
use url::form_urlencoded;

use crate::auth::{clear_cookie, extract_token, JwtCodec, TokenCodec};
use crate::config::{AuditMode, GateConfig, RateLimitConfig};
use crate::http::request::RequestIdExt;
use crate::observability::metrics;
use crate::resilience::with_deadline;
use crate::security::{AuditEvent, AuditSink, RateLimiter, SlidingWindowLimiter, Verdict};

use self::matcher::AllowList;
pub use self::middleware::gate_middleware;
pub use self::outcome::{
    redirect_response, Classification, GateError, GateOutcome, Identity, RedirectReason, Rejection,
};

/// Compiled, immutable gate settings.
#[derive(Debug)]
pub struct GatePolicy {
    pub allow_list: AllowList,
    pub login_path: String,
    pub redirect_param: String,
    pub cookie_name: String,
    pub trust_forwarded_for: bool,
    pub rate_limit: RateLimitConfig,
    pub audit_mode: AuditMode,
    pub audit_timeout: Duration,
}

impl GatePolicy {
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            allow_list: AllowList::from_patterns(&config.gate.public_paths),
            login_path: config.gate.login_path.clone(),
            redirect_param: config.gate.redirect_param.clone(),
            cookie_name: config.gate.cookie_name.clone(),
            trust_forwarded_for: config.gate.trust_forwarded_for,
            rate_limit: config.rate_limit.clone(),
            audit_mode: config.audit.mode,
            audit_timeout: Duration::from_millis(config.audit.timeout_ms),
        }
    }

    fn limiter_timeout(&self) -> Duration {
        Duration::from_millis(self.rate_limit.timeout_ms)
    }

    /// `<login_path>?<param>=<original location>`
    fn login_location(&self, path: &str, query: Option<&str>) -> String {
        let original = match query {
            Some(q) if !q.is_empty() => format!("{}?{}", path, q),
            _ => path.to_string(),
        };
        let encoded = form_urlencoded::Serializer::new(String::new())
            .append_pair(&self.redirect_param, &original)
            .finish();
        format!("{}?{}", self.login_path, encoded)
    }
}

/// The parts of a request the gate looks at.
#[derive(Debug, Clone)]
pub struct GateRequest<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub headers: &'a HeaderMap,
    pub peer: Option<SocketAddr>,
    pub request_id: Option<&'a str>,
}

impl<'a> GateRequest<'a> {
    pub fn from_parts(parts: &'a Parts) -> Self {
        Self {
            method: &parts.method,
            path: parts.uri.path(),
            query: parts.uri.query(),
            headers: &parts.headers,
            peer: parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
            request_id: parts.request_id(),
        }
    }

    /// Rate limiter key for this client.
    pub fn client_key(&self, trust_forwarded_for: bool) -> String {
        let forwarded = trust_forwarded_for
            .then(|| {
                self.headers
                    .get("x-forwarded-for")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.split(',').next())
                    .and_then(|first| first.trim().parse::<IpAddr>().ok())
            })
            .flatten();

        match forwarded.or_else(|| self.peer.map(|p| p.ip())) {
            Some(ip) => format!("ip:{}", ip),
            None => "ip:unknown".to_string(),
        }
    }
}

struct GateRuntime {
    policy: GatePolicy,
    codec: Arc<dyn TokenCodec>,
    limiter: Arc<dyn RateLimiter>,
}

/// Decides FORWARD, REDIRECT or REJECT for each request.
pub struct RequestGate {
    runtime: ArcSwap<GateRuntime>,
    audit: Arc<dyn AuditSink>,
}

impl RequestGate {
    pub fn new(
        policy: GatePolicy,
        codec: Arc<dyn TokenCodec>,
        limiter: Arc<dyn RateLimiter>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            runtime: ArcSwap::from_pointee(GateRuntime { policy, codec, limiter }),
            audit,
        }
    }

    /// Gate with the JWT codec and in-process limiter described by `config`.
    pub fn from_config(config: &GateConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self::new(
            GatePolicy::from_config(config),
            Arc::new(JwtCodec::from_config(&config.token)),
            Arc::new(SlidingWindowLimiter::from_config(&config.rate_limit)),
            audit,
        )
    }

    /// Swap in a new policy and codec. The limiter (and its counters) is kept
    /// unless its parameters changed.
    pub fn reload(&self, config: &GateConfig) {
        let current = self.runtime.load_full();
        let limiter: Arc<dyn RateLimiter> = if current.policy.rate_limit == config.rate_limit {
            current.limiter.clone()
        } else {
            tracing::info!(
                max_requests = config.rate_limit.max_requests,
                window_secs = config.rate_limit.window_secs,
                "Rate limit parameters changed, resetting limiter"
            );
            Arc::new(SlidingWindowLimiter::from_config(&config.rate_limit))
        };

        self.runtime.store(Arc::new(GateRuntime {
            policy: GatePolicy::from_config(config),
            codec: Arc::new(JwtCodec::from_config(&config.token)),
            limiter,
        }));
        tracing::info!(public_paths = config.gate.public_paths.len(), "Gate policy reloaded");
    }

    pub fn limiter(&self) -> Arc<dyn RateLimiter> {
        self.runtime.load().limiter.clone()
    }

    pub fn audit(&self) -> Arc<dyn AuditSink> {
        self.audit.clone()
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        self.runtime.load().policy.rate_limit.clone()
    }

    /// Evict idle limiter keys and report the tracked count.
    pub fn sweep_limiter(&self) -> usize {
        let limiter = self.limiter();
        let removed = limiter.sweep();
        metrics::record_tracked_keys(limiter.tracked_keys());
        removed
    }

    /// Produce exactly one outcome for the request.
    pub async fn evaluate(&self, request: &GateRequest<'_>) -> GateOutcome {
        let runtime = self.runtime.load_full();
        let policy = &runtime.policy;
        let path = request.path;

        if policy.allow_list.is_public(path) {
            return GateOutcome::Forward { identity: None };
        }

        if policy.rate_limit.enabled {
            let key = request.client_key(policy.trust_forwarded_for);
            match with_deadline(policy.limiter_timeout(), runtime.limiter.check(&key)).await {
                Ok(Verdict::Limited) => {
                    tracing::warn!(client = %key, path = %path, "Rate limit exceeded");
                    metrics::record_rate_limited();
                    self.emit(policy, AuditEvent::rate_limited(key, path).with_request_id(request.request_id))
                        .await;
                    return GateOutcome::Reject(Rejection::RateLimited);
                }
                Ok(Verdict::Allowed { .. }) => {}
                Err(e) => {
                    tracing::warn!(client = %key, error = %e, "Rate limiter unavailable, admitting request");
                    metrics::record_limiter_failure();
                }
            }
        }

        let Some(token) = extract_token(request.headers, &policy.cookie_name) else {
            return GateOutcome::Redirect {
                location: policy.login_location(path, request.query),
                reason: RedirectReason::Missing,
                clear_cookie: None,
            };
        };

        let payload = match runtime.codec.decode(token) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Session token rejected");
                self.emit(policy, AuditEvent::auth_failure(e.to_string(), path).with_request_id(request.request_id))
                    .await;
                return GateOutcome::Reject(Rejection::InvalidToken);
            }
        };

        if payload.is_expired_at(Utc::now().timestamp()) {
            tracing::debug!(subject = %payload.sub, path = %path, "Session token expired");
            self.emit(
                policy,
                AuditEvent::token_expired(payload.sub.clone(), path).with_request_id(request.request_id),
            )
            .await;
            return GateOutcome::Redirect {
                location: policy.login_location(path, request.query),
                reason: RedirectReason::Expired,
                clear_cookie: Some(clear_cookie(&policy.cookie_name)),
            };
        }

        GateOutcome::Forward {
            identity: Some(Identity::from(payload)),
        }
    }

    async fn emit(&self, policy: &GatePolicy, event: AuditEvent) {
        metrics::record_audit_event(event.event_type.as_str());
        let sink = self.audit.clone();
        let limit = policy.audit_timeout;

        match policy.audit_mode {
            AuditMode::Await => record_bounded(sink, event, limit).await,
            AuditMode::Detached => {
                tokio::spawn(record_bounded(sink, event, limit));
            }
        }
    }
}

async fn record_bounded(sink: Arc<dyn AuditSink>, event: AuditEvent, limit: Duration) {
    let event_type = event.event_type.as_str();
    if let Err(e) = with_deadline(limit, sink.record(event)).await {
        tracing::warn!(event_type, error = %e, "Failed to record audit event");
        metrics::record_audit_failure();
    }
}
