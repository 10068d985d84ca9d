//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Gate call to a collaborator (limiter, audit sink):
//!     → timeouts.rs (enforce deadline)
//!     → on elapse or failure: gate logs and applies its fallback policy
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries inside the gate; every decision is terminal

pub mod timeouts;

pub use timeouts::{with_deadline, DeadlineError};
