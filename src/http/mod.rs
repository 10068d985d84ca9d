//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → gate (public / rate limit / token)
//!     → api handlers (DTO validation) or fallback
//!     → upstream.rs (forward to the marketplace backend)
//!     → Send to client
//! ```

pub mod request;
pub mod server;
pub mod upstream;

pub use request::{RequestIdExt, RequestIdLayer, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
pub use upstream::{UpstreamClient, UpstreamError};
