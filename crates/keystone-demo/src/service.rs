//! The count service and its builder.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use keystone::server::{Route, Service, ServiceBuilder, JSON};
use tracing::Span;

use crate::count::{self, ExitFn};

/// Configuration key for the child instance `passthrough` calls.
pub const PASSTHROUGH: &str = "passthrough";

/// Default passthrough target.
pub const DEFAULT_PASSTHROUGH: &str = "http://localhost:9998";

/// Timeout for passthrough calls.
pub const PASSTHROUGH_TIMEOUT: Duration = Duration::from_secs(1);

/// Builds the demo API.
pub struct CountService {
    logger: Span,
    passthrough_url: String,
    client: reqwest::Client,
    exit: ExitFn,
}

impl fmt::Debug for CountService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountService")
            .field("passthrough_url", &self.passthrough_url)
            .finish_non_exhaustive()
    }
}

impl CountService {
    /// Creates the builder. `die` exits the process.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be created.
    pub fn new(passthrough_url: impl Into<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(PASSTHROUGH_TIMEOUT)
            .build()?;
        Ok(Self {
            logger: Span::none(),
            passthrough_url: passthrough_url.into(),
            client,
            exit: Arc::new(|code: i32| std::process::exit(code)),
        })
    }

    /// Replaces what `die` calls.
    #[must_use]
    pub fn with_exit(mut self, exit: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.exit = Arc::new(exit);
        self
    }

    /// Returns the passthrough target.
    pub fn passthrough_url(&self) -> &str {
        &self.passthrough_url
    }
}

impl ServiceBuilder for CountService {
    fn build(&mut self, logger: Span, root_path: &str) -> Service {
        self.logger = logger;

        let mut service = Service::new(root_path).doc("This provides the API for the sample server.");
        service
            .route(
                Route::get("/count/:first/:last")
                    .to(count::count)
                    .doc("Returns an array of numbers from first to last.")
                    .notes("Just a dummy endpoint to show some techniques")
                    .operation("Count")
                    .produces(JSON)
                    .writes(&[4, 5, 6]),
            )
            .route(
                Route::get("/die/:code")
                    .to(count::die(Arc::clone(&self.exit)))
                    .doc("Kills the server with the given exit code")
                    .operation("Die")
                    .produces(JSON)
                    .writes(&"dying"),
            )
            .route(
                Route::get("/passthrough/:first/:last")
                    .to(count::passthrough(self.client.clone(), self.passthrough_url.clone()))
                    .doc("Passes the count query on to the child service.")
                    .notes("Another dummy endpoint to show some techniques")
                    .operation("Passthrough")
                    .produces(JSON)
                    .writes(&[4, 5, 6]),
            );
        service
    }

    fn logger(&self) -> Span {
        self.logger.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use keystone::server::{HttpResponse, Pipeline, Server, ServerConfig, ShutdownSignal};
    use std::sync::atomic::{AtomicI32, Ordering};
    use tokio::net::TcpListener;

    async fn get(service: &Service, path: &str) -> HttpResponse {
        let request = http::Request::builder().uri(path).body(Bytes::new()).unwrap();
        service.dispatch(request).await
    }

    async fn body(response: HttpResponse) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_docs_describe_every_route() {
        let mut builder = CountService::new(DEFAULT_PASSTHROUGH).unwrap();
        let docs = builder.build(Span::none(), "/").docs();

        assert!(docs.starts_with("# API `/`"));
        assert!(docs.contains("This provides the API for the sample server."));
        assert!(docs.contains("## GET /count/:first/:last"));
        assert!(docs.contains("* Operation: `Count`"));
        assert!(docs.contains("## GET /die/:code"));
        assert!(docs.contains("Kills the server with the given exit code"));
        assert!(docs.contains("## GET /passthrough/:first/:last"));
        assert!(docs.contains("Another dummy endpoint to show some techniques"));
        assert!(docs.contains("* Produces: `application/json`"));
        assert!(docs.contains("\"dying\""));
    }

    #[test]
    fn test_logger_is_kept() {
        let mut builder = CountService::new(DEFAULT_PASSTHROUGH).unwrap();
        assert!(builder.logger().is_none());

        let span = tracing::info_span!("service");
        builder.build(span.clone(), "/");
        assert_eq!(builder.logger().id(), span.id());
    }

    #[tokio::test]
    async fn test_die_exits_after_delay() {
        let exited = Arc::new(AtomicI32::new(-1));
        let recorded = Arc::clone(&exited);
        let mut builder = CountService::new(DEFAULT_PASSTHROUGH)
            .unwrap()
            .with_exit(move |code| recorded.store(code, Ordering::SeqCst));
        let service = builder.build(Span::none(), "/");

        let response = get(&service, "/die/3").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, "\"Shutting down in 1 sec\"");
        assert_eq!(exited.load(Ordering::SeqCst), -1);

        tokio::time::sleep(count::DIE_DELAY + Duration::from_millis(500)).await;
        assert_eq!(exited.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_die_with_bad_code_exits_zero() {
        let exited = Arc::new(AtomicI32::new(-1));
        let recorded = Arc::clone(&exited);
        let mut builder = CountService::new(DEFAULT_PASSTHROUGH)
            .unwrap()
            .with_exit(move |code| recorded.store(code, Ordering::SeqCst));
        let service = builder.build(Span::none(), "/");

        get(&service, "/die/soon").await;
        tokio::time::sleep(count::DIE_DELAY + Duration::from_millis(500)).await;
        assert_eq!(exited.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_passthrough_relays_child_response() {
        let mut child = CountService::new(DEFAULT_PASSTHROUGH).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Server::new(
            ServerConfig::builder()
                .addr(addr)
                .shutdown_timeout(Duration::from_millis(200))
                .build(),
            Pipeline::new(child.build(Span::none(), "/")),
        );
        let shutdown = ShutdownSignal::new();
        let handle = tokio::spawn(server.serve(listener, shutdown.clone()));

        let mut parent = CountService::new(format!("http://{addr}")).unwrap();
        let service = parent.build(Span::none(), "/");

        let response = get(&service, "/passthrough/1/3").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, "[1,2,3]");

        let response = get(&service, "/passthrough/3/1").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body(response).await.contains("'first' must be less than 'last'"));

        shutdown.trigger("test");
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_passthrough_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut builder = CountService::new(format!("http://{addr}")).unwrap();
        let service = builder.build(Span::none(), "/");

        let response = get(&service, "/passthrough/1/3").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body(response).await,
            r#"{"error":"bad response from passthrough","status":500}"#
        );
    }
}
