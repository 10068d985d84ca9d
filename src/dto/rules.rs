//! Field rule catalogue.
//!
//! Messages follow class-validator wording so API clients see the same
//! strings the marketplace backend produces.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// A named pattern made of sub-patterns that must all match.
pub struct PatternRule {
    /// Pattern as quoted in the violation message.
    pub source: &'static str,
    parts: Lazy<Vec<Regex>>,
}

impl PatternRule {
    pub fn is_match(&self, value: &str) -> bool {
        self.parts.iter().all(|re| re.is_match(value))
    }
}

impl fmt::Debug for PatternRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PatternRule").field(&self.source).finish()
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("built-in pattern compiles"))
        .collect()
}

/// At least one lowercase, one uppercase, one digit, eight characters.
pub static PASSWORD_STRENGTH: PatternRule = PatternRule {
    source: r"/^(?=.*[a-z])(?=.*[A-Z])(?=.*\d).{8,}$/",
    parts: Lazy::new(|| compile(&[r"[a-z]", r"[A-Z]", r"\d", r"^.{8,}$"])),
};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("built-in pattern compiles"));

static OBJECT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").expect("built-in pattern compiles"));

/// A single field constraint.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    IsString,
    NotEmpty,
    Email,
    MinLength(usize),
    Matches(&'static PatternRule),
    ObjectId,
    /// Absent or null skips the rest of the field's rules.
    Optional,
}

/// Result of applying one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    Pass,
    Fail(String),
    /// Stop evaluating this field.
    Skip,
}

impl Rule {
    /// Constraint name reported in violations.
    pub fn name(&self) -> &'static str {
        match self {
            Rule::IsString => "isString",
            Rule::NotEmpty => "isNotEmpty",
            Rule::Email => "isEmail",
            Rule::MinLength(_) => "minLength",
            Rule::Matches(_) => "matches",
            Rule::ObjectId => "isMongoId",
            Rule::Optional => "isOptional",
        }
    }

    pub fn check(&self, field: &str, value: Option<&Value>) -> Check {
        let text = value.and_then(Value::as_str);
        let passed = match self {
            Rule::Optional => {
                return match value {
                    None | Some(Value::Null) => Check::Skip,
                    Some(_) => Check::Pass,
                };
            }
            Rule::IsString => text.is_some(),
            Rule::NotEmpty => !matches!(value, None | Some(Value::Null)) && text != Some(""),
            Rule::Email => text.is_some_and(|s| EMAIL.is_match(s)),
            Rule::MinLength(min) => text.is_some_and(|s| s.chars().count() >= *min),
            Rule::Matches(pattern) => text.is_some_and(|s| pattern.is_match(s)),
            Rule::ObjectId => text.is_some_and(|s| OBJECT_ID.is_match(s)),
        };

        if passed {
            Check::Pass
        } else {
            Check::Fail(self.message(field))
        }
    }

    fn message(&self, field: &str) -> String {
        match self {
            Rule::IsString => format!("{} must be a string", field),
            Rule::NotEmpty => format!("{} should not be empty", field),
            Rule::Email => format!("{} must be an email", field),
            Rule::MinLength(min) => format!("{} must be longer than or equal to {} characters", field, min),
            Rule::Matches(pattern) => format!("{} must match {} regular expression", field, pattern.source),
            Rule::ObjectId => format!("{} must be a mongodb id", field),
            Rule::Optional => String::new(),
        }
    }
}
