//! Response helpers.
//!
//! Handlers answer with [`HttpResponse`]. Errors use a fixed JSON shape:
//!
//! ```json
//! {"error": "'first' parameter did not parse as an integer", "status": 400}
//! ```

use bytes::Bytes;
use http::{header, Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;

/// MIME type for JSON bodies.
pub const JSON: &str = "application/json";

/// MIME type for generated documentation.
pub const MARKDOWN: &str = "text/markdown; charset=utf-8";

/// Response body type.
pub type ResponseBody = Full<Bytes>;

/// The HTTP response type handlers return.
pub type HttpResponse = Response<ResponseBody>;

/// Body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
    /// HTTP status code, repeated in the body.
    pub status: u16,
}

impl ApiError {
    /// Creates an error body.
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            error: message.into(),
            status: status.as_u16(),
        }
    }
}

/// Serializes `body` as JSON with the given status.
///
/// Falls back to a 500 error response if serialization fails.
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> HttpResponse {
    match serde_json::to_vec(body) {
        Ok(bytes) => raw(status, JSON, Bytes::from(bytes)),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response body");
            raw(
                StatusCode::INTERNAL_SERVER_ERROR,
                JSON,
                Bytes::from_static(br#"{"error":"response serialization failed","status":500}"#),
            )
        }
    }
}

/// A `200 OK` JSON response.
pub fn ok<T: Serialize + ?Sized>(body: &T) -> HttpResponse {
    json_response(StatusCode::OK, body)
}

/// A JSON error response.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use keystone_server::api_error;
///
/// let response = api_error(StatusCode::BAD_REQUEST, "bad input");
/// assert_eq!(response.status(), StatusCode::BAD_REQUEST);
/// ```
pub fn api_error(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    json_response(status, &ApiError::new(message, status))
}

/// A response carrying pre-encoded bytes.
pub fn raw(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> HttpResponse {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    if let Ok(value) = header::HeaderValue::from_str(content_type) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}

/// An empty response with the given status.
pub fn empty(status: StatusCode) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}
