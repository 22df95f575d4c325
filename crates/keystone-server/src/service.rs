//! Services, routes and generated documentation.
//!
//! A [`Service`] is a set of [`Route`]s mounted under a root path. Route
//! patterns use `:name` segments for path parameters:
//!
//! ```rust
//! use keystone_server::{ok, Request, RequestExt, Route, Service, JSON};
//!
//! let mut service = Service::new("/api").doc("Counting service.");
//! service.route(
//!     Route::get("/echo/:word")
//!         .to(|req: Request| async move {
//!             let word = req.param("word").unwrap_or_default().to_string();
//!             ok(&word)
//!         })
//!         .doc("Echoes a word.")
//!         .operation("Echo")
//!         .produces(JSON)
//!         .writes(&"hello"),
//! );
//!
//! assert!(service.match_route(&http::Method::GET, "/api/echo/hi").is_some());
//! ```
//!
//! Every service also answers `GET <root>/docs` with its markdown
//! documentation and `GET <root>/health` with `{"status":"ok"}`, unless a
//! route claims those paths first.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::io::{self, Write};
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use serde::Serialize;

use crate::response::{self, HttpResponse, MARKDOWN};

/// The request type handlers receive. The body is fully buffered.
pub type Request = http::Request<Bytes>;

/// A boxed future that returns a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Path parameters captured by the matched route.
///
/// Stored in the request extensions before the handler runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(HashMap<String, String>);

impl PathParams {
    /// Returns a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns the number of captured parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Convenience accessors on [`Request`].
pub trait RequestExt {
    /// Returns a path parameter captured by the route.
    fn param(&self, name: &str) -> Option<&str>;
}

impl RequestExt for Request {
    fn param(&self, name: &str) -> Option<&str> {
        self.extensions().get::<PathParams>()?.get(name)
    }
}

/// An async request handler.
///
/// Implemented for every `Fn(Request) -> impl Future<Output = HttpResponse>`.
pub trait Handler: Send + Sync + 'static {
    /// Handles a request.
    fn call(&self, request: Request) -> BoxFuture<'static, HttpResponse>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'static, HttpResponse> {
        Box::pin(self(request))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

fn parse_segments(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix(':') {
            Some(name) if !name.is_empty() => Segment::Param(name.to_string()),
            _ => Segment::Literal(s.to_string()),
        })
        .collect()
}

/// A route: method, path pattern, handler and documentation.
#[derive(Clone)]
pub struct Route {
    method: Method,
    pattern: String,
    segments: Vec<Segment>,
    handler: Option<Arc<dyn Handler>>,
    doc: String,
    notes: String,
    operation: String,
    produces: String,
    example: Option<serde_json::Value>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .field("operation", &self.operation)
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

impl Route {
    /// Creates a route for any method.
    pub fn new(method: Method, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        Self {
            method,
            segments: parse_segments(&pattern),
            pattern,
            handler: None,
            doc: String::new(),
            notes: String::new(),
            operation: String::new(),
            produces: String::new(),
            example: None,
        }
    }

    /// Creates a `GET` route.
    pub fn get(pattern: impl Into<String>) -> Self {
        Self::new(Method::GET, pattern)
    }

    /// Creates a `POST` route.
    pub fn post(pattern: impl Into<String>) -> Self {
        Self::new(Method::POST, pattern)
    }

    /// Creates a `PUT` route.
    pub fn put(pattern: impl Into<String>) -> Self {
        Self::new(Method::PUT, pattern)
    }

    /// Creates a `DELETE` route.
    pub fn delete(pattern: impl Into<String>) -> Self {
        Self::new(Method::DELETE, pattern)
    }

    /// Sets the handler.
    pub fn to(mut self, handler: impl Handler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Sets the one-line summary.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Sets longer notes.
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Sets the operation name.
    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }

    /// Sets the MIME type the route produces.
    pub fn produces(mut self, mime: impl Into<String>) -> Self {
        self.produces = mime.into();
        self
    }

    /// Records a sample of what the route writes, for the docs.
    pub fn writes<T: Serialize + ?Sized>(mut self, sample: &T) -> Self {
        self.example = serde_json::to_value(sample).ok();
        self
    }

    /// Returns the method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the path pattern, relative to the service root.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the operation name.
    #[must_use]
    pub fn operation_name(&self) -> &str {
        &self.operation
    }

    fn match_path(&self, path: &str) -> Option<PathParams> {
        let actual: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if actual.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, value) in self.segments.iter().zip(actual) {
            match segment {
                Segment::Literal(expected) if expected != value => return None,
                Segment::Literal(_) => {}
                Segment::Param(name) => {
                    params.insert(name.clone(), value.to_string());
                }
            }
        }
        Some(PathParams(params))
    }

    fn write_docs(&self, root: &str, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "## {} {}", self.method, join_path(root, &self.pattern))?;
        writeln!(out)?;
        if !self.doc.is_empty() {
            writeln!(out, "{}", self.doc.trim())?;
            writeln!(out)?;
        }
        if !self.notes.is_empty() {
            writeln!(out, "{}", self.notes.trim())?;
            writeln!(out)?;
        }
        if !self.operation.is_empty() {
            writeln!(out, "* Operation: `{}`", self.operation)?;
        }
        if !self.produces.is_empty() {
            writeln!(out, "* Produces: `{}`", self.produces)?;
        }
        if !self.operation.is_empty() || !self.produces.is_empty() {
            writeln!(out)?;
        }
        if let Some(example) = &self.example {
            let pretty = serde_json::to_string_pretty(example).map_err(io::Error::other)?;
            writeln!(out, "Example response:")?;
            writeln!(out)?;
            writeln!(out, "```json\n{pretty}\n```")?;
            writeln!(out)?;
        }
        Ok(())
    }
}

fn join_path(root: &str, pattern: &str) -> String {
    let root = root.trim_end_matches('/');
    let pattern = pattern.trim_start_matches('/');
    format!("{root}/{pattern}")
}

/// A matched route with its captured parameters.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    route: &'a Route,
    params: PathParams,
}

impl RouteMatch<'_> {
    /// Returns the matched route.
    #[must_use]
    pub fn route(&self) -> &Route {
        self.route
    }

    /// Returns the captured parameters.
    #[must_use]
    pub fn params(&self) -> &PathParams {
        &self.params
    }
}

/// A documented set of routes under a root path.
#[derive(Debug, Clone)]
pub struct Service {
    root: String,
    doc: String,
    routes: Vec<Route>,
}

impl Service {
    /// Creates an empty service mounted at `root`.
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let trimmed = root.trim_end_matches('/');
        let root = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        Self {
            root,
            doc: String::new(),
            routes: Vec::new(),
        }
    }

    /// Sets the service description.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// Adds a route. Routes are matched in the order they are added.
    pub fn route(&mut self, route: Route) -> &mut Self {
        self.routes.push(route);
        self
    }

    /// Returns the root path, without a trailing slash (`""` for `/`).
    #[must_use]
    pub fn root(&self) -> &str {
        if self.root == "/" {
            ""
        } else {
            &self.root
        }
    }

    /// Returns the registered routes.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    fn strip_root<'p>(&self, path: &'p str) -> Option<&'p str> {
        let root = self.root();
        if root.is_empty() {
            return Some(path);
        }
        let rest = path.strip_prefix(root)?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }

    /// Finds the first route matching a request path (including the root).
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let relative = self.strip_root(path)?;
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                route
                    .match_path(relative)
                    .map(|params| RouteMatch { route, params })
            })
    }

    /// Writes markdown documentation for every route.
    pub fn generate_docs(&self, out: &mut dyn Write) -> io::Result<()> {
        let title = if self.root().is_empty() { "/" } else { self.root() };
        writeln!(out, "# API `{title}`")?;
        writeln!(out)?;
        if !self.doc.trim().is_empty() {
            writeln!(out, "{}", self.doc.trim())?;
            writeln!(out)?;
        }
        for route in &self.routes {
            route.write_docs(self.root(), out)?;
        }
        Ok(())
    }

    /// Renders the documentation to a string.
    #[must_use]
    pub fn docs(&self) -> String {
        let mut buf = Vec::new();
        // Vec writes are infallible and examples are already JSON values.
        let _ = self.generate_docs(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Dispatches a request to the first matching route.
    pub async fn dispatch(&self, mut request: Request) -> HttpResponse {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        if let Some(matched) = self.match_route(&method, &path) {
            let Some(handler) = matched.route.handler.clone() else {
                return response::api_error(
                    StatusCode::NOT_IMPLEMENTED,
                    format!("no handler for {method} {path}"),
                );
            };
            request.extensions_mut().insert(matched.params);
            return handler.call(request).await;
        }

        if method == Method::GET {
            match self.strip_root(&path) {
                Some("/docs") => return response::raw(StatusCode::OK, MARKDOWN, self.docs()),
                Some("/health") => {
                    return response::ok(&serde_json::json!({ "status": "ok" }));
                }
                _ => {}
            }
        }

        response::api_error(StatusCode::NOT_FOUND, format!("no route for {method} {path}"))
    }
}
