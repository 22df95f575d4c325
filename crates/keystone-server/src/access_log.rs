//! Request logging stage.
//!
//! Logs one `REQ` event per request once the response is known.

use http::{header, HeaderValue};
use hyper::body::Body;
use keystone_telemetry::log_access;

use crate::middleware::{Middleware, Next, RequestContext};
use crate::response::HttpResponse;
use crate::service::{BoxFuture, Request};

/// Response header carrying the request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The access log pipeline stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessLog;

impl AccessLog {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn header_str<'a>(request: &'a Request, name: header::HeaderName) -> &'a str {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

impl Middleware for AccessLog {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HttpResponse> {
        Box::pin(async move {
            let host = match request.uri().authority() {
                Some(authority) => authority.to_string(),
                None => header_str(&request, header::HOST).to_string(),
            };
            let method = request.method().clone();
            let uri = request.uri().clone();
            let user_agent = header_str(&request, header::USER_AGENT).to_string();
            let remote_addr = ctx
                .remote_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_default();

            let mut response = next.run(ctx, request).await;

            let len = response.body().size_hint().exact().unwrap_or_default();
            if let Ok(value) = HeaderValue::from_str(&ctx.request_id().to_string()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }

            log_access!(
                ctx.request_id(),
                host,
                remote_addr,
                method,
                uri,
                response.status().as_u16(),
                len,
                user_agent,
                ctx.elapsed()
            );

            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Pipeline;
    use crate::response;
    use crate::service::{Route, Service};
    use bytes::Bytes;
    use http::StatusCode;

    fn pipeline() -> Pipeline {
        let mut service = Service::new("/");
        service.route(Route::get("/hello").to(|_req: Request| async { response::ok(&"hello") }));
        Pipeline::new(service).with(AccessLog::new())
    }

    #[tokio::test]
    async fn test_sets_request_id_header() {
        let mut ctx = RequestContext::default();
        let request = http::Request::builder()
            .uri("/hello")
            .header(header::HOST, "localhost:8080")
            .header(header::USER_AGENT, "test-agent")
            .body(Bytes::new())
            .unwrap();

        let response = pipeline().handle(&mut ctx, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[REQUEST_ID_HEADER],
            ctx.request_id().to_string().as_str()
        );
    }

    #[tokio::test]
    async fn test_logs_unmatched_requests_too() {
        let request = http::Request::builder()
            .uri("/missing")
            .body(Bytes::new())
            .unwrap();

        let response = pipeline()
            .handle(&mut RequestContext::default(), request)
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[test]
    fn test_header_str_missing() {
        let request = http::Request::builder().body(Bytes::new()).unwrap();
        assert_eq!(header_str(&request, header::USER_AGENT), "");
    }
}
