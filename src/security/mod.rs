//! Security subsystem: the gate's external collaborators.
//!
//! # Data Flow
//! ```text
//! Protected request:
//!     → rate_limit.rs (per-client sliding window)
//!     → [token verification in auth/]
//!     → audit.rs (record RATE_LIMITED / AUTH_FAILURE / TOKEN_EXPIRED)
//! ```
//!
//! # Design Decisions
//! - Both collaborators sit behind async traits so storage can move out of process
//! - Every call is bounded by a deadline in the gate
//! - Limiter failures fail open; audit failures never block a decision

pub mod audit;
pub mod rate_limit;

pub use audit::{AuditError, AuditEvent, AuditEventType, AuditSink, FanOutAuditSink, MemoryAuditSink, TracingAuditSink};
pub use rate_limit::{LimiterError, RateLimiter, SlidingWindowLimiter, Verdict};
