//! Request pipeline.
//!
//! Requests pass through a fixed chain of [`Middleware`] stages before they
//! reach the [`Service`]. [`standard_setup`](crate::standard_setup) builds
//! the chain as CORS, then access logging, then the service, so preflight
//! requests are answered before they are logged.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::StatusCode;
use tracing::{Instrument, Span};
use uuid::Uuid;

use crate::response::{self, HttpResponse};
use crate::service::{BoxFuture, Request, Service};

/// Per-request data shared by the middleware stages.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    remote_addr: Option<SocketAddr>,
    started: Instant,
}

impl RequestContext {
    /// Creates a context with a fresh time-ordered request ID.
    #[must_use]
    pub fn new(remote_addr: Option<SocketAddr>) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            remote_addr,
            started: Instant::now(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Returns the peer address, if known.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Returns the time elapsed since the request arrived.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(None)
    }
}

/// A pipeline stage.
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request, usually by calling `next.run` once.
    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HttpResponse>;
}

/// The rest of the chain.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Endpoint {
        service: &'a Service,
        timeout: Option<Duration>,
    },
}

impl<'a> Next<'a> {
    fn chain(middleware: &'a dyn Middleware, next: Self) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    fn endpoint(service: &'a Service, timeout: Option<Duration>) -> Self {
        Self {
            inner: NextInner::Endpoint { service, timeout },
        }
    }

    /// Runs the next stage, or the service at the end of the chain.
    pub async fn run(self, ctx: &mut RequestContext, request: Request) -> HttpResponse {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Endpoint {
                service,
                timeout: Some(limit),
            } => {
                let method = request.method().clone();
                let path = request.uri().path().to_string();
                match tokio::time::timeout(limit, service.dispatch(request)).await {
                    Ok(response) => response,
                    Err(_) => {
                        tracing::warn!(%method, %path, ?limit, "handler timed out");
                        response::api_error(StatusCode::GATEWAY_TIMEOUT, "handler timed out")
                    }
                }
            }
            NextInner::Endpoint {
                service,
                timeout: None,
            } => service.dispatch(request).await,
        }
    }
}

/// A service wrapped in its middleware chain.
#[derive(Clone)]
pub struct Pipeline {
    service: Arc<Service>,
    middleware: Vec<Arc<dyn Middleware>>,
    handler_timeout: Option<Duration>,
    span: Span,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("service", &self.service.root())
            .field(
                "middleware",
                &self.middleware.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field("handler_timeout", &self.handler_timeout)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline with no middleware.
    pub fn new(service: Service) -> Self {
        Self {
            service: Arc::new(service),
            middleware: Vec::new(),
            handler_timeout: None,
            span: Span::none(),
        }
    }

    /// Appends a stage. Stages run in the order they are added.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Bounds how long the service may take. Zero disables the bound.
    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Sets the span every request runs in.
    pub fn span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Returns the wrapped service.
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the stage names, outermost first.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    /// Runs a request through every stage and the service.
    pub async fn handle(&self, ctx: &mut RequestContext, request: Request) -> HttpResponse {
        let mut next = Next::endpoint(&self.service, self.handler_timeout);
        for middleware in self.middleware.iter().rev() {
            next = Next::chain(middleware.as_ref(), next);
        }
        next.run(ctx, request).instrument(self.span.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Route;
    use bytes::Bytes;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, HttpResponse> {
            Box::pin(async move {
                self.seen.lock().unwrap().push(self.name);
                next.run(ctx, request).await
            })
        }
    }

    struct Teapot;

    impl Middleware for Teapot {
        fn name(&self) -> &'static str {
            "teapot"
        }

        fn process<'a>(
            &'a self,
            _ctx: &'a mut RequestContext,
            _request: Request,
            _next: Next<'a>,
        ) -> BoxFuture<'a, HttpResponse> {
            Box::pin(async { response::empty(StatusCode::IM_A_TEAPOT) })
        }
    }

    fn service() -> Service {
        let mut service = Service::new("/");
        service
            .route(Route::get("/ok").to(|_req: Request| async { response::ok(&"ok") }))
            .route(Route::get("/slow").to(|_req: Request| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                response::ok(&"late")
            }));
        service
    }

    fn request(uri: &str) -> Request {
        http::Request::builder().uri(uri).body(Bytes::new()).unwrap()
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(service())
            .with(Recorder {
                name: "outer",
                seen: Arc::clone(&seen),
            })
            .with(Recorder {
                name: "inner",
                seen: Arc::clone(&seen),
            });

        let response = pipeline
            .handle(&mut RequestContext::default(), request("/ok"))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*seen.lock().unwrap(), vec!["outer", "inner"]);
        assert_eq!(pipeline.stage_names(), vec!["outer", "inner"]);
    }

    #[tokio::test]
    async fn test_stage_can_short_circuit() {
        let pipeline = Pipeline::new(service()).with(Teapot);
        let response = pipeline
            .handle(&mut RequestContext::default(), request("/ok"))
            .await;
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn test_handler_timeout() {
        let pipeline = Pipeline::new(service()).handler_timeout(Duration::from_millis(20));
        let response = pipeline
            .handle(&mut RequestContext::default(), request("/slow"))
            .await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_zero_timeout_disables_bound() {
        let pipeline = Pipeline::new(service()).handler_timeout(Duration::ZERO);
        assert!(pipeline.handler_timeout.is_none());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestContext::default();
        let b = RequestContext::default();
        assert_ne!(a.request_id(), b.request_id());
        assert!(a.remote_addr().is_none());
    }
}
