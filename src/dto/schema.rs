//! Schemas and the generic rule runner.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::rules::{Check, Rule};

/// A field and its ordered rules.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub rules: &'static [Rule],
}

/// Ordered field contracts for one DTO.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub fields: &'static [FieldSpec],
}

/// One failed rule on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub rule: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Violation for input that is not a JSON object at all.
    pub fn body(message: impl Into<String>) -> Self {
        Self::new("body", "isObject", message)
    }
}

/// Every violation found in one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("validation failed with {} violation(s)", .violations.len())]
pub struct ValidationErrors {
    pub violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn single(violation: FieldViolation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    pub fn messages(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.message.as_str()).collect()
    }

    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for violation in &self.violations {
            if !fields.contains(&violation.field.as_str()) {
                fields.push(&violation.field);
            }
        }
        fields
    }

    pub fn has(&self, field: &str, rule: &str) -> bool {
        self.violations.iter().any(|v| v.field == field && v.rule == rule)
    }
}

#[derive(Serialize)]
struct BadRequestBody<'a> {
    #[serde(rename = "statusCode")]
    status_code: u16,
    error: &'static str,
    message: Vec<&'a str>,
    violations: &'a [FieldViolation],
}

impl IntoResponse for ValidationErrors {
    fn into_response(self) -> Response {
        let body = BadRequestBody {
            status_code: StatusCode::BAD_REQUEST.as_u16(),
            error: "Bad Request",
            message: self.messages(),
            violations: &self.violations,
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

impl Schema {
    /// Evaluate every field in declaration order and collect all violations.
    pub fn validate(&self, input: &Value) -> Result<(), ValidationErrors> {
        let Some(object) = input.as_object() else {
            return Err(ValidationErrors::single(FieldViolation::body(
                "request body must be a JSON object",
            )));
        };

        let mut violations = Vec::new();
        for field in self.fields {
            let value = object.get(field.name);
            for rule in field.rules {
                match rule.check(field.name, value) {
                    Check::Pass => {}
                    Check::Skip => break,
                    Check::Fail(message) => violations.push(FieldViolation::new(field.name, rule.name(), message)),
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors { violations })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCHEMA: Schema = Schema {
        fields: &[
            FieldSpec {
                name: "name",
                rules: &[Rule::IsString, Rule::NotEmpty],
            },
            FieldSpec {
                name: "ref",
                rules: &[Rule::Optional, Rule::ObjectId],
            },
        ],
    };

    #[test]
    fn test_reports_all_failures_in_order() {
        let errors = SCHEMA.validate(&json!({ "ref": "nope" })).unwrap_err();

        assert_eq!(errors.fields(), vec!["name", "ref"]);
        assert_eq!(
            errors.messages(),
            vec!["name must be a string", "name should not be empty", "ref must be a mongodb id"]
        );
    }

    #[test]
    fn test_optional_short_circuits() {
        assert!(SCHEMA.validate(&json!({ "name": "x" })).is_ok());
        assert!(SCHEMA.validate(&json!({ "name": "x", "ref": null })).is_ok());
    }

    #[test]
    fn test_non_object_input() {
        let errors = SCHEMA.validate(&json!(["name"])).unwrap_err();
        assert_eq!(errors.violations.len(), 1);
        assert_eq!(errors.violations[0].field, "body");
    }

    #[test]
    fn test_input_is_not_mutated() {
        let input = json!({ "name": "", "extra": 1 });
        let before = input.clone();
        let first = SCHEMA.validate(&input);
        let second = SCHEMA.validate(&input);

        assert_eq!(input, before);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_bad_request_body() {
        let errors = SCHEMA.validate(&json!({})).unwrap_err();
        let response = errors.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["error"], "Bad Request");
        assert_eq!(body["message"][0], "name must be a string");
        assert_eq!(body["violations"][1]["rule"], "isNotEmpty");
    }
}
