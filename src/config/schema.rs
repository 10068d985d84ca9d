//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Shared secret used when no secret is configured. Only suitable for local development.
pub const DEV_TOKEN_SECRET: &str = "domofix-dev-secret-change-in-production";

/// Root configuration for the request gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream application that admitted requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request classification policy.
    pub gate: GatePolicyConfig,

    /// Session token settings.
    pub token: TokenConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Audit emission policy.
    pub audit: AuditConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
            connect_timeout_secs: 5,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Which requests are public and where unauthenticated visitors are sent.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GatePolicyConfig {
    /// Public allow-list. `/foo` matches `/foo` and everything below it,
    /// `/foo*` is a raw prefix match.
    pub public_paths: Vec<String>,

    /// Path unauthenticated visitors are redirected to.
    pub login_path: String,

    /// Query parameter carrying the originally requested location.
    pub redirect_param: String,

    /// Cookie holding the session token.
    pub cookie_name: String,

    /// Derive the client key from the first `X-Forwarded-For` entry.
    /// Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for GatePolicyConfig {
    fn default() -> Self {
        Self {
            public_paths: [
                "/get-started",
                "/login",
                "/register",
                "/forgot-password",
                "/reset-password",
                "/api/auth",
                "/_next/*",
                "/static/*",
                "/favicon.ico",
                "/healthz",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            login_path: "/login".to_string(),
            redirect_param: "redirect".to_string(),
            cookie_name: "token".to_string(),
            trust_forwarded_for: false,
        }
    }
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TokenConfig {
    /// HS256 shared secret. Overridden by `GATE_JWT_SECRET`.
    pub secret: String,

    /// Expected `iss` claim.
    pub issuer: String,

    /// Lifetime of issued tokens in seconds.
    pub ttl_secs: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: DEV_TOKEN_SECRET.to_string(),
            issuer: "domofix".to_string(),
            ttl_secs: 24 * 60 * 60,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per client key within one window.
    pub max_requests: u32,

    /// Sliding window length in seconds.
    pub window_secs: u64,

    /// How often idle client keys are evicted.
    pub sweep_interval_secs: u64,

    /// Deadline for a single limiter check in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 60,
            sweep_interval_secs: 30,
            timeout_ms: 100,
        }
    }
}

/// Whether the gate waits for the audit sink.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditMode {
    /// Wait for the sink, bounded by `timeout_ms`.
    #[default]
    Await,
    /// Spawn the write and continue; records in flight are lost on crash.
    Detached,
}

/// Audit configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    pub mode: AuditMode,

    /// Deadline for a single audit write in milliseconds.
    pub timeout_ms: u64,

    /// Number of recent events kept in memory for the admin API.
    pub memory_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            mode: AuditMode::Await,
            timeout_ms: 250,
            memory_capacity: 1000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

/// Placeholder admin key; refused by validation when the admin API is enabled.
pub const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_ADMIN_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Request hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
