//! Session token handling.
//!
//! # Data Flow
//! ```text
//! Inbound request headers
//!     → extract.rs (cookie first, then `Authorization: Bearer`)
//!     → token.rs (TokenCodec::decode → TokenPayload)
//!     → gate decides on expiry
//! ```
//!
//! The signing scheme sits behind [`TokenCodec`] so it can be swapped
//! without touching the gate.

pub mod extract;
pub mod token;

pub use extract::{clear_cookie, extract_token};
pub use token::{JwtCodec, Role, TokenCodec, TokenError, TokenPayload};
