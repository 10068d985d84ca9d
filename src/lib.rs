//! Domofix request gate.
//!
//! Sits in front of the marketplace backend: every request is classified as
//! public, authenticated or rejected before any handler runs, and the
//! marketplace API bodies are validated against declarative DTO contracts.

// Core subsystems
pub mod api;
pub mod auth;
pub mod config;
pub mod dto;
pub mod gate;
pub mod http;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::GateConfig;
pub use gate::{GateOutcome, RequestGate};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
