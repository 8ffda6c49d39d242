//! Wire request to engine request.
//!
//! # Responsibilities
//! - Read the request ID assigned by the request-id layer
//! - Preserve the raw path and query exactly as they arrived
//! - Buffer the body up to the configured limit
//! - Copy headers into the engine's case-insensitive map
//!
//! # Design Decisions
//! - No decoding happens here; the engine owns every interpretation
//! - Non-UTF-8 header values are converted lossily, never dropped
//! - A repeated header keeps its last value

use axum::body::{self, Body};
use axum::http::{HeaderName, Request};
use thiserror::Error;

use crate::engine::request::{parse_query, Headers, SimRequest};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Typed name of [`X_REQUEST_ID`], for the tower-http layers.
pub fn request_id_header() -> HeaderName {
    HeaderName::from_static(X_REQUEST_ID)
}

/// Why a wire request could not be turned into a [`SimRequest`].
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request body could not be read within {limit} bytes: {source}")]
    Body {
        limit: usize,
        #[source]
        source: axum::Error,
    },
}

/// The request ID set by the request-id layer, or `"unknown"`.
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Whether the client asked for a JSON rendering.
pub fn wants_json<B>(request: &Request<B>) -> bool {
    request
        .headers()
        .get_all(axum::http::header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_ascii_lowercase().contains("application/json"))
}

/// Consume an axum request and build the engine's view of it.
pub async fn into_sim_request(
    request: Request<Body>,
    max_body_bytes: usize,
) -> Result<SimRequest, RequestError> {
    let (parts, body) = request.into_parts();

    let mut headers = Headers::new();
    for (name, value) in &parts.headers {
        headers.insert(
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }

    let body = body::to_bytes(body, max_body_bytes)
        .await
        .map_err(|source| RequestError::Body {
            limit: max_body_bytes,
            source,
        })?;

    Ok(SimRequest {
        method: parts.method,
        raw_path: parts.uri.path().to_string(),
        query: parts.uri.query().map(parse_query).unwrap_or_default(),
        headers,
        body: body.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    #[tokio::test]
    async fn test_raw_target_is_preserved() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/%61dmin/?q=%3Cscript%3E&x")
            .header("X-Forwarded-For", "127.0.0.1")
            .body(Body::from("a=b"))
            .unwrap();

        let sim = into_sim_request(request, 1024).await.unwrap();
        assert_eq!(sim.method, Method::POST);
        assert_eq!(sim.raw_path, "/%61dmin/");
        assert_eq!(sim.raw_query(), "q=%3Cscript%3E&x");
        assert_eq!(sim.headers.get("x-forwarded-for"), Some("127.0.0.1"));
        assert_eq!(sim.body, b"a=b");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .body(Body::from(vec![b'x'; 64]))
            .unwrap();

        let err = into_sim_request(request, 16).await.unwrap_err();
        assert!(err.to_string().contains("16 bytes"));
    }

    #[test]
    fn test_accept_json_detection() {
        let json = Request::builder()
            .header("Accept", "text/html, Application/JSON;q=0.9")
            .body(())
            .unwrap();
        assert!(wants_json(&json));

        let html = Request::builder().header("Accept", "text/html").body(()).unwrap();
        assert!(!wants_json(&html));
    }

    #[test]
    fn test_missing_request_id() {
        let request = Request::builder().body(()).unwrap();
        assert_eq!(request_id(&request), "unknown");
    }
}
