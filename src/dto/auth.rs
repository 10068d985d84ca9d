//! Authentication request bodies.

use serde::{Deserialize, Serialize};

use super::rules::{Rule, PASSWORD_STRENGTH};
use super::schema::{FieldSpec, Schema};
use super::Dto;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

static LOGIN: Schema = Schema {
    fields: &[
        FieldSpec {
            name: "email",
            rules: &[Rule::Email],
        },
        FieldSpec {
            name: "password",
            rules: &[Rule::IsString, Rule::NotEmpty],
        },
    ],
};

impl Dto for LoginDto {
    const NAME: &'static str = "login";

    fn schema() -> &'static Schema {
        &LOGIN
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordDto {
    pub email: String,
}

static FORGOT_PASSWORD: Schema = Schema {
    fields: &[FieldSpec {
        name: "email",
        rules: &[Rule::Email],
    }],
};

impl Dto for ForgotPasswordDto {
    const NAME: &'static str = "forgot_password";

    fn schema() -> &'static Schema {
        &FORGOT_PASSWORD
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordDto {
    pub reset_token: String,
    pub new_password: String,
}

static RESET_PASSWORD: Schema = Schema {
    fields: &[
        FieldSpec {
            name: "resetToken",
            rules: &[Rule::IsString, Rule::NotEmpty],
        },
        FieldSpec {
            name: "newPassword",
            rules: &[Rule::IsString, Rule::MinLength(8), Rule::Matches(&PASSWORD_STRENGTH)],
        },
    ],
};

impl Dto for ResetPasswordDto {
    const NAME: &'static str = "reset_password";

    fn schema() -> &'static Schema {
        &RESET_PASSWORD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::validate_dto;
    use serde_json::json;

    #[test]
    fn test_login() {
        let dto: LoginDto = validate_dto(&json!({ "email": "ada@domofix.io", "password": "x" })).unwrap();
        assert_eq!(dto.email, "ada@domofix.io");

        let errors = validate_dto::<LoginDto>(&json!({ "email": "nope", "password": "" })).unwrap_err();
        assert_eq!(errors.fields(), vec!["email", "password"]);
        assert!(errors.has("email", "isEmail"));
        assert!(errors.has("password", "isNotEmpty"));
    }

    #[test]
    fn test_forgot_password_requires_email() {
        let errors = validate_dto::<ForgotPasswordDto>(&json!({})).unwrap_err();
        assert_eq!(errors.messages(), vec!["email must be an email"]);
    }

    fn reset(password: &str) -> Result<ResetPasswordDto, crate::dto::ValidationErrors> {
        validate_dto(&json!({ "resetToken": "r-123", "newPassword": password }))
    }

    #[test]
    fn test_reset_password_strong_password() {
        let dto = reset("Abcdef12").unwrap();
        assert_eq!(dto.new_password, "Abcdef12");
        assert_eq!(dto.reset_token, "r-123");
    }

    #[test]
    fn test_reset_password_missing_uppercase() {
        // Eight characters, so only the pattern fails
        let errors = reset("abcdefg1").unwrap_err();
        assert!(errors.has("newPassword", "matches"));
        assert!(!errors.has("newPassword", "minLength"));
    }

    #[test]
    fn test_reset_password_short_and_weak() {
        let errors = reset("abcdef1").unwrap_err();
        assert!(errors.has("newPassword", "minLength"));
        assert!(errors.has("newPassword", "matches"));
        assert_eq!(errors.violations.len(), 2);
    }

    #[test]
    fn test_reset_password_reports_both_fields() {
        let errors = validate_dto::<ResetPasswordDto>(&json!({ "newPassword": 12345678 })).unwrap_err();
        assert_eq!(errors.fields(), vec!["resetToken", "newPassword"]);
    }
}
