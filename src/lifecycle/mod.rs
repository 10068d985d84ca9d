//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → server stops accepting, drains
//!               → config reload loop and limiter sweeper exit
//!               → admin listener exits
//! ```
//!
//! # Design Decisions
//! - One broadcast channel reaches every long-running task
//! - In-flight requests finish; nothing partial is persisted

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
