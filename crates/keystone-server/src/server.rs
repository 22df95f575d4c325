//! HTTP server.
//!
//! Serves a [`Pipeline`] over HTTP/1.1 with hyper and tokio:
//!
//! - one task per connection, tracked for graceful shutdown
//! - request headers must arrive within the read timeout
//! - reading the body and running the pipeline must finish within the
//!   write timeout, or the client gets a 504
//!
//! ```rust,ignore
//! use keystone_server::{Pipeline, Server, ServerConfig, ShutdownSignal};
//!
//! let server = Server::new(ServerConfig::default(), pipeline);
//! server.run_with_shutdown(ShutdownSignal::new()).await?;
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::middleware::{Pipeline, RequestContext};
use crate::response::{self, HttpResponse};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// A configured server, ready to listen.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    pipeline: Pipeline,
}

impl Server {
    /// Creates a server.
    #[must_use]
    pub fn new(config: ServerConfig, pipeline: Pipeline) -> Self {
        Self { config, pipeline }
    }

    /// Returns the server settings.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the request pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Binds the configured address and serves until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// fires, then waits up to the shutdown timeout for open connections.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the listener address cannot be read.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::debug!(addr = %local_addr, "accepting connections");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream, remote_addr, shutdown).await {
                                tracing::debug!(%remote_addr, error = %e, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                },
                () = shutdown.recv() => {
                    tracing::info!(reason = shutdown.reason().unwrap_or_default(), "stopping server");
                    break;
                }
            }
        }

        let drain = server.config.shutdown_timeout();
        tokio::select! {
            () = tracker.wait_idle() => tracing::info!("all connections closed"),
            () = tokio::time::sleep(drain) => tracing::warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            ),
        }

        tracing::info!("server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let server = Arc::clone(self);
        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(req, remote_addr).await) }
        });

        let mut builder = http1::Builder::new();
        builder.timer(TokioTimer::new());
        let read_timeout = self.config.read_timeout();
        if !read_timeout.is_zero() {
            builder.header_read_timeout(read_timeout);
        }

        let conn = builder.serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        let mut draining = false;
        loop {
            tokio::select! {
                result = conn.as_mut() => return result,
                () = shutdown.recv(), if !draining => {
                    draining = true;
                    conn.as_mut().graceful_shutdown();
                }
            }
        }
    }

    async fn handle_request(&self, req: Request<Incoming>, remote_addr: SocketAddr) -> HttpResponse {
        let mut ctx = RequestContext::new(Some(remote_addr));
        let write_timeout = self.config.write_timeout();

        let (parts, body) = req.into_parts();
        let collected = if write_timeout.is_zero() {
            Ok(collect_body(body).await)
        } else {
            tokio::time::timeout(write_timeout, collect_body(body)).await
        };

        let body = match collected {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "failed to read request body");
                return response::api_error(StatusCode::BAD_REQUEST, "failed to read request body");
            }
            Err(_) => {
                tracing::warn!("request body read timed out");
                return response::api_error(StatusCode::REQUEST_TIMEOUT, "request body read timed out");
            }
        };

        self.pipeline
            .handle(&mut ctx, Request::from_parts(parts, body))
            .await
    }
}

async fn collect_body(body: Incoming) -> Result<Bytes, hyper::Error> {
    Ok(body.collect().await?.to_bytes())
}
