//! Request identification.
//!
//! # Responsibilities
//! - Assign an `x-request-id` (UUID v4) unless the client sent one
//! - Echo the id on the response
//! - Expose the id to the gate and to upstream forwarding
//!
//! # Design Decisions
//! - The id is set as early as possible so every log line can carry it
//! - A client-supplied id is kept for end-to-end correlation

use axum::http::{request::Parts, HeaderName, Request};
use tower::Layer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestId, SetRequestId};

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Sets and propagates `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = SetRequestId<PropagateRequestId<S>, MakeRequestUuid>;

    fn layer(&self, inner: S) -> Self::Service {
        SetRequestId::new(PropagateRequestId::new(inner, X_REQUEST_ID), X_REQUEST_ID, MakeRequestUuid)
    }
}

/// Read access to the request id header.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&str>;
}

impl RequestIdExt for Parts {
    fn request_id(&self) -> Option<&str> {
        self.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&str> {
        self.headers().get(X_REQUEST_ID).and_then(|v| v.to_str().ok())
    }
}
