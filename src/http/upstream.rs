//! Forwarding admitted requests to the marketplace backend.
//!
//! # Responsibilities
//! - Rewrite the request URI to the upstream authority
//! - Strip hop-by-hop headers in both directions
//! - Append `x-forwarded-for`
//! - Map transport failures to 502
//!
//! # Design Decisions
//! - Bodies are streamed, never buffered
//! - No retries: a failed forward is reported to the client as-is

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{
        header,
        uri::{Authority, Scheme},
        HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::UpstreamConfig;
use crate::http::request::RequestIdExt;
use crate::observability::metrics;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream address '{0}'")]
    InvalidAddress(String),
}

/// HTTP client bound to the single configured upstream.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
    authority: Authority,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let authority = Authority::from_str(&config.address)
            .map_err(|_| UpstreamError::InvalidAddress(config.address.clone()))?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self { client, authority })
    }

    /// Send `request` upstream and stream back the response.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let request_id = request.request_id().unwrap_or("unknown").to_string();
        let path = request.uri().path().to_string();

        let (mut parts, body) = request.into_parts();

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        strip_hop_by_hop(&mut parts.headers);
        if let Some(ip) = peer {
            append_forwarded_for(&mut parts.headers, &ip.to_string());
        }

        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(self.authority.clone());
        parts.uri = match Uri::from_parts(uri_parts) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream URI");
                return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
            }
        };

        tracing::debug!(request_id = %request_id, path = %path, upstream = %self.authority, "Forwarding request");

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => {
                metrics::record_upstream(response.status().as_u16(), start);
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(request_id = %request_id, path = %path, error = %e, "Upstream error");
                metrics::record_upstream(StatusCode::BAD_GATEWAY.as_u16(), start);
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: &str) {
    let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{}, {}", existing, ip),
        None => ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_address_rejected() {
        let config = UpstreamConfig {
            address: "not a host".into(),
            ..UpstreamConfig::default()
        };
        assert!(UpstreamClient::new(&config).is_err());
    }

    #[test]
    fn test_forwarded_for_appends() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, "10.0.0.1");
        assert_eq!(headers[&X_FORWARDED_FOR], "10.0.0.1");

        append_forwarded_for(&mut headers, "10.0.0.2");
        assert_eq!(headers[&X_FORWARDED_FOR], "10.0.0.1, 10.0.0.2");
    }

    #[test]
    fn test_hop_by_hop_removed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(header::COOKIE, HeaderValue::from_static("token=x"));

        strip_hop_by_hop(&mut headers);

        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get("keep-alive").is_none());
        assert!(headers.get(header::COOKIE).is_some());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = UpstreamClient::new(&UpstreamConfig {
            address,
            connect_timeout_secs: 1,
        })
        .unwrap();
        let response = client
            .forward(Request::builder().uri("/dashboard").body(Body::empty()).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
