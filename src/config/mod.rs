//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, env overrides)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → shared with the gate, server and admin API
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → gate policy swapped atomically (ArcSwap)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Secrets may come from the environment instead of the file
//! - Listener and upstream addresses are only read at startup

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::{
    AdminConfig, AuditConfig, AuditMode, GateConfig, GatePolicyConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, RateLimitConfig, SecurityConfig, TimeoutConfig, TokenConfig, UpstreamConfig,
};
