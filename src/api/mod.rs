//! Validated marketplace API endpoints.
//!
//! # Data Flow
//! ```text
//! Request admitted by the gate
//!     → ValidatedJson / ValidatedQuery (400 on any violation)
//!     → re-serialized DTO forwarded upstream with the original headers
//! ```
//!
//! Only fields named by a DTO reach the backend; unknown body fields are
//! dropped on re-serialization.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use crate::dto::{
    Dto, ForgotPasswordDto, LoginDto, MarkReadDto, ResetPasswordDto, ReviewQueryDto, ValidatedJson, ValidatedQuery,
};
use crate::http::server::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(forward_body::<LoginDto>))
        .route("/api/auth/forgot-password", post(forward_body::<ForgotPasswordDto>))
        .route("/api/auth/reset-password", post(forward_body::<ResetPasswordDto>))
        .route("/api/messages/{conversation_id}/read", post(mark_read))
        .route("/api/reviews", get(list_reviews))
}

/// Request line and headers, kept so the validated body can be re-sent upstream.
#[derive(Debug, Clone)]
pub struct OriginalRequest {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
}

impl<S: Send + Sync> FromRequestParts<S> for OriginalRequest {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            version: parts.version,
            headers: parts.headers.clone(),
            peer: parts.extensions.get::<ConnectInfo<SocketAddr>>().cloned(),
        })
    }
}

impl OriginalRequest {
    fn into_request(self, body: Body) -> Request<Body> {
        let mut request = Request::new(body);
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.version_mut() = self.version;
        *request.headers_mut() = self.headers;
        if let Some(peer) = self.peer {
            request.extensions_mut().insert(peer);
        }
        request
    }

    fn with_json<T: Dto>(mut self, dto: &T) -> Result<Request<Body>, serde_json::Error> {
        let body = serde_json::to_vec(dto)?;
        self.headers.remove(header::CONTENT_LENGTH);
        self.headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self.into_request(Body::from(body)))
    }
}

async fn forward_body<T: Dto + 'static>(
    State(state): State<AppState>,
    original: OriginalRequest,
    ValidatedJson(dto): ValidatedJson<T>,
) -> Response {
    match original.with_json(&dto) {
        Ok(request) => state.upstream.forward(request).await,
        Err(e) => {
            tracing::error!(dto = T::NAME, error = %e, "Failed to serialize validated body");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn mark_read(
    state: State<AppState>,
    Path(conversation_id): Path<String>,
    original: OriginalRequest,
    body: ValidatedJson<MarkReadDto>,
) -> Response {
    tracing::debug!(conversation_id = %conversation_id, "Marking conversation read");
    forward_body(state, original, body).await
}

async fn list_reviews(
    State(state): State<AppState>,
    original: OriginalRequest,
    ValidatedQuery(query): ValidatedQuery<ReviewQueryDto>,
) -> Response {
    tracing::debug!(provider_id = ?query.provider_id, "Listing reviews");
    state.upstream.forward(original.into_request(Body::empty())).await
}
