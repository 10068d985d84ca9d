//! Axum extractors that only hand validated DTOs to handlers.

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use url::form_urlencoded;

use super::{validate_dto, Dto, FieldViolation, ValidationErrors};
use crate::observability::metrics;

/// JSON body validated against `T`'s schema.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

/// Query string validated against `T`'s schema.
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: Dto,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        // Buffering failures (e.g. 413 over the body limit) keep their own status
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            tracing::debug!(dto = T::NAME, status = %e.status(), "Failed to read request body");
            e.into_response()
        })?;

        let value = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(&bytes).map_err(|_| {
                reject::<T>(ValidationErrors::single(FieldViolation::body("request body must be valid JSON"))).into_response()
            })?
        };

        validate_dto(&value)
            .map(ValidatedJson)
            .map_err(|errors| reject::<T>(errors).into_response())
    }
}

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: Dto,
    S: Send + Sync,
{
    type Rejection = ValidationErrors;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = query_to_value(parts.uri.query().unwrap_or_default());
        validate_dto(&value).map(ValidatedQuery).map_err(reject::<T>)
    }
}

/// Query pairs as a JSON object of strings; a repeated key keeps its last value.
pub fn query_to_value(query: &str) -> Value {
    let object: Map<String, Value> = form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
        .collect();
    Value::Object(object)
}

fn reject<T: Dto>(errors: ValidationErrors) -> ValidationErrors {
    tracing::debug!(dto = T::NAME, fields = ?errors.fields(), "Request failed validation");
    metrics::record_validation_failure(T::NAME);
    errors
}
