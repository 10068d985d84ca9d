//! Axum middleware running the gate in front of every handler.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{redirect_response, GateOutcome, GateRequest, Identity, RequestGate};
use crate::observability::metrics;

pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");
pub const X_USER_ROLE: HeaderName = HeaderName::from_static("x-user-role");
pub const X_USER_EMAIL: HeaderName = HeaderName::from_static("x-user-email");

/// Evaluate the gate and either continue to the handler or answer directly.
///
/// Identity headers supplied by the client are always removed; on an
/// authenticated forward they are re-set from the verified token.
pub async fn gate_middleware(
    State(gate): State<Arc<RequestGate>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    strip_identity(&mut parts.headers);

    let outcome = gate.evaluate(&GateRequest::from_parts(&parts)).await;
    let (label, reason) = outcome.labels();
    metrics::record_decision(label, reason);

    match outcome {
        GateOutcome::Forward { identity } => {
            if let Some(identity) = identity {
                insert_identity(&mut parts.headers, &identity);
                parts.extensions.insert(identity);
            }
            next.run(Request::from_parts(parts, body)).await
        }
        GateOutcome::Redirect {
            location,
            reason,
            clear_cookie,
        } => {
            tracing::debug!(path = %parts.uri.path(), ?reason, location = %location, "Redirecting to login");
            redirect_response(&location, clear_cookie.as_deref())
        }
        GateOutcome::Reject(rejection) => {
            tracing::warn!(
                path = %parts.uri.path(),
                status = rejection.status().as_u16(),
                outcome = reason,
                "Request rejected by gate"
            );
            rejection.into_response()
        }
    }
}

fn strip_identity(headers: &mut HeaderMap) {
    for name in [X_USER_ID, X_USER_ROLE, X_USER_EMAIL] {
        headers.remove(name);
    }
}

fn insert_identity(headers: &mut HeaderMap, identity: &Identity) {
    match HeaderValue::from_str(&identity.subject) {
        Ok(value) => {
            headers.insert(X_USER_ID, value);
        }
        Err(_) => tracing::warn!("Authenticated subject is not a valid header value, x-user-id omitted"),
    }
    if let Some(role) = identity.role {
        headers.insert(X_USER_ROLE, HeaderValue::from_static(role.as_str()));
    }
    if let Some(value) = identity.email.as_deref().and_then(|e| HeaderValue::from_str(e).ok()) {
        headers.insert(X_USER_EMAIL, value);
    }
}
