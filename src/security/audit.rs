//! Audit events for security-relevant gate decisions.
//!
//! Events are append-only records. The gate hands them to an [`AuditSink`];
//! the default deployment fans out to the `audit` log target and a bounded
//! in-memory buffer served by the admin API.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Audit event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    /// Client exceeded its request window.
    RateLimited,
    /// Token was present but could not be verified.
    AuthFailure,
    /// Token verified but past its expiry.
    TokenExpired,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::RateLimited => "RATE_LIMITED",
            AuditEventType::AuthFailure => "AUTH_FAILURE",
            AuditEventType::TokenExpired => "TOKEN_EXPIRED",
        }
    }
}

/// An immutable record of a gate decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event timestamp (RFC 3339).
    pub timestamp: String,

    pub event_type: AuditEventType,

    /// Rate limiter client key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Token subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Why verification failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AuditEvent {
    fn new(event_type: AuditEventType, path: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event_type,
            key: None,
            subject: None,
            reason: None,
            path: path.to_string(),
            request_id: None,
        }
    }

    pub fn rate_limited(key: impl Into<String>, path: &str) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::new(AuditEventType::RateLimited, path)
        }
    }

    pub fn auth_failure(reason: impl Into<String>, path: &str) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::new(AuditEventType::AuthFailure, path)
        }
    }

    pub fn token_expired(subject: impl Into<String>, path: &str) -> Self {
        Self {
            subject: Some(subject.into()),
            ..Self::new(AuditEventType::TokenExpired, path)
        }
    }

    pub fn with_request_id(mut self, request_id: Option<&str>) -> Self {
        self.request_id = request_id.map(str::to_string);
        self
    }

    /// Serializes the event to JSON for logging.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError>;

    /// Most recent events, newest first. Sinks that do not retain events return nothing.
    fn recent(&self, _limit: usize) -> Vec<AuditEvent> {
        Vec::new()
    }
}

/// Writes events as JSON on the `audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        tracing::info!(
            target: "audit",
            event_type = event.event_type.as_str(),
            event = %event.to_json(),
            "Security audit event"
        );
        Ok(())
    }
}

/// Keeps the last `capacity` events in memory.
pub struct MemoryAuditSink {
    events: Mutex<VecDeque<AuditEvent>>,
    capacity: usize,
}

impl MemoryAuditSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All retained events, oldest first.
    pub fn snapshot(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        if self.capacity == 0 {
            return Ok(());
        }
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
        Ok(())
    }

    fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }
}

/// Records every event to each inner sink.
pub struct FanOutAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl FanOutAuditSink {
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl AuditSink for FanOutAuditSink {
    /// Every sink is attempted; the first failure is reported.
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.record(event.clone()).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        self.sinks
            .iter()
            .map(|s| s.recent(limit))
            .find(|events| !events.is_empty())
            .unwrap_or_default()
    }
}
