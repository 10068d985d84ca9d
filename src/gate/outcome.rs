//! Gate outcomes and their HTTP rendering.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{Role, TokenPayload};

/// Identity attached to forwarded requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject: String,
    pub role: Option<Role>,
    pub email: Option<String>,
    pub expires_at: i64,
}

impl From<TokenPayload> for Identity {
    fn from(payload: TokenPayload) -> Self {
        Self {
            subject: payload.sub,
            role: payload.role,
            email: payload.email,
            expires_at: payload.exp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    /// No token on a protected path.
    Missing,
    /// Token verified but expired.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    RateLimited,
    InvalidToken,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Rejection::InvalidToken => StatusCode::UNAUTHORIZED,
        }
    }
}

#[derive(Serialize)]
struct RejectionBody {
    #[serde(rename = "statusCode")]
    status_code: u16,
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            // No quota details in the body
            Rejection::RateLimited => RejectionBody {
                status_code: status.as_u16(),
                error: "Too Many Requests",
                message: None,
            },
            Rejection::InvalidToken => RejectionBody {
                status_code: status.as_u16(),
                error: "Unauthorized",
                message: Some("invalid session token"),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Request classification derived from an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Public,
    Authenticated,
    Rejected,
}

/// Error taxonomy for requests that did not reach a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("no session token")]
    AuthMissing,
    #[error("invalid session token")]
    AuthInvalid,
    #[error("session token expired")]
    AuthExpired,
    #[error("rate limit exceeded")]
    RateLimited,
}

impl GateError {
    pub fn code(&self) -> &'static str {
        match self {
            GateError::AuthMissing => "auth_missing",
            GateError::AuthInvalid => "auth_invalid",
            GateError::AuthExpired => "auth_expired",
            GateError::RateLimited => "rate_limited",
        }
    }
}

/// The single decision the gate makes for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Forward {
        identity: Option<Identity>,
    },
    Redirect {
        location: String,
        reason: RedirectReason,
        /// `Set-Cookie` value clearing a stale session.
        clear_cookie: Option<String>,
    },
    Reject(Rejection),
}

impl GateOutcome {
    pub fn classification(&self) -> Classification {
        match self {
            GateOutcome::Forward { identity: None } => Classification::Public,
            GateOutcome::Forward { identity: Some(_) } => Classification::Authenticated,
            GateOutcome::Redirect { .. } | GateOutcome::Reject(_) => Classification::Rejected,
        }
    }

    pub fn error(&self) -> Option<GateError> {
        match self {
            GateOutcome::Forward { .. } => None,
            GateOutcome::Redirect { reason: RedirectReason::Missing, .. } => Some(GateError::AuthMissing),
            GateOutcome::Redirect { reason: RedirectReason::Expired, .. } => Some(GateError::AuthExpired),
            GateOutcome::Reject(Rejection::InvalidToken) => Some(GateError::AuthInvalid),
            GateOutcome::Reject(Rejection::RateLimited) => Some(GateError::RateLimited),
        }
    }

    /// `(outcome, reason)` metric labels.
    pub fn labels(&self) -> (&'static str, &'static str) {
        let outcome = match self {
            GateOutcome::Forward { .. } => "forward",
            GateOutcome::Redirect { .. } => "redirect",
            GateOutcome::Reject(_) => "reject",
        };
        let reason = match (self.classification(), self.error()) {
            (_, Some(err)) => err.code(),
            (Classification::Public, None) => "public",
            (_, None) => "authenticated",
        };
        (outcome, reason)
    }
}

/// 307 to `location`, optionally clearing the session cookie.
pub fn redirect_response(location: &str, clear_cookie: Option<&str>) -> Response {
    let mut builder = Response::builder().status(StatusCode::TEMPORARY_REDIRECT);

    match HeaderValue::from_str(location) {
        Ok(value) => builder = builder.header(header::LOCATION, value),
        Err(_) => {
            tracing::error!(location = %location, "Redirect location is not a valid header value");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }
    if let Some(cookie) = clear_cookie.and_then(|c| HeaderValue::from_str(c).ok()) {
        builder = builder.header(header::SET_COOKIE, cookie);
    }

    builder
        .body(Body::empty())
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_and_labels() {
        let public = GateOutcome::Forward { identity: None };
        assert_eq!(public.classification(), Classification::Public);
        assert_eq!(public.labels(), ("forward", "public"));

        let expired = GateOutcome::Redirect {
            location: "/login".into(),
            reason: RedirectReason::Expired,
            clear_cookie: None,
        };
        assert_eq!(expired.classification(), Classification::Rejected);
        assert_eq!(expired.labels(), ("redirect", "auth_expired"));

        let limited = GateOutcome::Reject(Rejection::RateLimited);
        assert_eq!(limited.error(), Some(GateError::RateLimited));
        assert_eq!(limited.labels(), ("reject", "rate_limited"));
    }

    #[test]
    fn test_rejection_status() {
        assert_eq!(Rejection::RateLimited.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(Rejection::InvalidToken.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_redirect_response() {
        let response = redirect_response("/login?redirect=%2Fdashboard", Some("token=; Max-Age=0"));

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/login?redirect=%2Fdashboard");
        assert_eq!(response.headers()[header::SET_COOKIE], "token=; Max-Age=0");
    }
}
