//! Declarative request DTOs.
//!
//! # Data Flow
//! ```text
//! Raw body / query (serde_json::Value)
//!     → schema.rs (every field, every rule, in declaration order)
//!     → ValidationErrors (400) | typed DTO
//!     → extract.rs hands the DTO to the handler
//! ```
//!
//! # Design Decisions
//! - Rules are data, not code: a DTO is a static list of fields and rules
//! - All failing fields are reported together
//! - Validation never mutates its input

pub mod auth;
pub mod extract;
pub mod messaging;
pub mod reviews;
pub mod rules;
pub mod schema;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

pub use auth::{ForgotPasswordDto, LoginDto, ResetPasswordDto};
pub use extract::{ValidatedJson, ValidatedQuery};
pub use messaging::MarkReadDto;
pub use reviews::ReviewQueryDto;
pub use rules::{PatternRule, Rule, PASSWORD_STRENGTH};
pub use schema::{FieldSpec, FieldViolation, Schema, ValidationErrors};

/// A request shape with a validation schema.
pub trait Dto: DeserializeOwned + Serialize + Send {
    /// Short name used in logs and metric labels.
    const NAME: &'static str;

    fn schema() -> &'static Schema;
}

/// Validate `input` against `T`'s schema, then build `T`.
pub fn validate_dto<T: Dto>(input: &Value) -> Result<T, ValidationErrors> {
    T::schema().validate(input)?;
    serde_json::from_value(input.clone())
        .map_err(|e| ValidationErrors::single(FieldViolation::body(e.to_string())))
}
