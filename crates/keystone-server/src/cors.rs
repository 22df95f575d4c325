//! CORS (Cross-Origin Resource Sharing) stage.
//!
//! Answers preflight requests and adds `Access-Control-Allow-Origin` to
//! responses for allowed origins. Settings come from the standard
//! configuration:
//!
//! - `CORS_ORIGINS`: allowed origins; `*` allows any origin
//! - `CORS_METHODS`: allowed methods
//! - `CORS_DEBUG`: logs every CORS decision at debug level
//!
//! Credentials are never allowed.

use std::collections::HashSet;

use http::{header, HeaderValue, Method, StatusCode};
use keystone_config::Config;

use crate::middleware::{Middleware, Next, RequestContext};
use crate::response::{self, HttpResponse};
use crate::service::{BoxFuture, Request};

/// CORS header names.
pub mod headers {
    /// `Access-Control-Allow-Origin` header.
    pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
    /// `Access-Control-Allow-Methods` header.
    pub const ALLOW_METHODS: &str = "access-control-allow-methods";
    /// `Access-Control-Allow-Headers` header.
    pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
    /// `Access-Control-Request-Method` header (preflight).
    pub const REQUEST_METHOD: &str = "access-control-request-method";
    /// `Access-Control-Request-Headers` header (preflight).
    pub const REQUEST_HEADERS: &str = "access-control-request-headers";
}

/// Configuration key for allowed origins.
pub const CORS_ORIGINS: &str = "CORS_ORIGINS";
/// Configuration key for allowed methods.
pub const CORS_METHODS: &str = "CORS_METHODS";
/// Configuration key enabling CORS debug logs.
pub const CORS_DEBUG: &str = "CORS_DEBUG";

/// Request headers allowed on every preflight.
const DEFAULT_ALLOWED_HEADERS: [&str; 4] = ["origin", "accept", "content-type", "x-requested-with"];

/// The set of allowed origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Any origin (`*`).
    Any,
    /// Exactly these origins.
    List(HashSet<String>),
}

impl AllowedOrigins {
    /// Builds the set from configured values; a `*` entry allows any origin.
    pub fn from_list<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = HashSet::new();
        for origin in origins {
            let origin = origin.as_ref().trim();
            if origin == "*" {
                return Self::Any;
            }
            if !origin.is_empty() {
                list.insert(origin.to_string());
            }
        }
        Self::List(list)
    }

    /// Checks if an origin is allowed.
    #[must_use]
    pub fn is_allowed(&self, origin: &str) -> bool {
        match self {
            Self::Any => true,
            Self::List(origins) => origins.contains(origin),
        }
    }

    fn header_value(&self, origin: &str) -> Option<HeaderValue> {
        match self {
            Self::Any => Some(HeaderValue::from_static("*")),
            Self::List(origins) if origins.contains(origin) => HeaderValue::from_str(origin).ok(),
            Self::List(_) => None,
        }
    }
}

/// CORS settings.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    allowed_origins: AllowedOrigins,
    allowed_methods: Vec<Method>,
    allowed_headers: Vec<String>,
    debug: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: AllowedOrigins::Any,
            allowed_methods: vec![Method::GET, Method::POST, Method::PUT, Method::DELETE],
            allowed_headers: DEFAULT_ALLOWED_HEADERS.iter().map(ToString::to_string).collect(),
            debug: false,
        }
    }
}

impl CorsConfig {
    /// Creates the default settings: any origin, `GET POST PUT DELETE`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `CORS_ORIGINS`, `CORS_METHODS` and `CORS_DEBUG`.
    ///
    /// Method names that do not parse are skipped.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut cors = Self::default();
        if let Ok(origins) = config.try_get_string_list(CORS_ORIGINS) {
            if config.contains(CORS_ORIGINS) {
                cors.allowed_origins = AllowedOrigins::from_list(origins);
            }
        }
        if let Ok(methods) = config.try_get_string_list(CORS_METHODS) {
            if config.contains(CORS_METHODS) {
                cors = cors.allow_methods(methods);
            }
        }
        if let Ok(debug) = config.try_get_flag(CORS_DEBUG) {
            cors.debug = debug;
        }
        cors
    }

    /// Replaces the allowed origins.
    pub fn allow_origins(mut self, origins: AllowedOrigins) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// Replaces the allowed methods.
    pub fn allow_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_methods = methods
            .into_iter()
            .filter_map(|m| Method::from_bytes(m.as_ref().trim().to_uppercase().as_bytes()).ok())
            .collect();
        self
    }

    /// Enables debug logging of CORS decisions.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Returns the allowed origins.
    #[must_use]
    pub fn allowed_origins(&self) -> &AllowedOrigins {
        &self.allowed_origins
    }

    /// Returns the allowed methods.
    #[must_use]
    pub fn allowed_methods(&self) -> &[Method] {
        &self.allowed_methods
    }

    /// Returns whether debug logging is on.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }
}

/// The CORS pipeline stage.
#[derive(Debug, Clone)]
pub struct Cors {
    config: CorsConfig,
}

impl Cors {
    /// Creates the stage.
    #[must_use]
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    fn trace(&self, decision: &str, origin: &str) {
        if self.config.debug {
            tracing::debug!(origin, decision, "cors");
        }
    }

    fn is_preflight(request: &Request) -> bool {
        request.method() == Method::OPTIONS
            && request.headers().contains_key(header::ORIGIN)
            && request.headers().contains_key(headers::REQUEST_METHOD)
    }

    fn origin(request: &Request) -> Option<&str> {
        request
            .headers()
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
    }

    fn handle_preflight(&self, request: &Request) -> HttpResponse {
        let Some(origin) = Self::origin(request) else {
            return Self::forbidden();
        };

        if !self.config.allowed_origins.is_allowed(origin) {
            self.trace("preflight rejected: origin not allowed", origin);
            return Self::forbidden();
        }

        let requested_method = request
            .headers()
            .get(headers::REQUEST_METHOD)
            .and_then(|v| v.to_str().ok())
            .and_then(|m| Method::from_bytes(m.trim().to_uppercase().as_bytes()).ok());
        match requested_method {
            Some(method) if self.config.allowed_methods.contains(&method) => {}
            _ => {
                self.trace("preflight rejected: method not allowed", origin);
                return Self::forbidden();
            }
        }

        if let Some(requested) = request
            .headers()
            .get(headers::REQUEST_HEADERS)
            .and_then(|v| v.to_str().ok())
        {
            let rejected = requested
                .split(',')
                .map(|h| h.trim().to_lowercase())
                .filter(|h| !h.is_empty())
                .any(|h| !self.config.allowed_headers.contains(&h));
            if rejected {
                self.trace("preflight rejected: header not allowed", origin);
                return Self::forbidden();
            }
        }

        self.trace("preflight accepted", origin);
        self.preflight_response(origin)
    }

    fn preflight_response(&self, origin: &str) -> HttpResponse {
        let mut response = response::empty(StatusCode::NO_CONTENT);
        let headers = response.headers_mut();

        if let Some(value) = self.config.allowed_origins.header_value(origin) {
            headers.insert(headers::ALLOW_ORIGIN, value);
        }
        let methods: Vec<&str> = self.config.allowed_methods.iter().map(Method::as_str).collect();
        if let Ok(value) = HeaderValue::from_str(&methods.join(", ")) {
            headers.insert(headers::ALLOW_METHODS, value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.config.allowed_headers.join(", ")) {
            headers.insert(headers::ALLOW_HEADERS, value);
        }
        headers.insert(
            header::VARY,
            HeaderValue::from_static("Origin, Access-Control-Request-Method, Access-Control-Request-Headers"),
        );
        response
    }

    fn forbidden() -> HttpResponse {
        response::empty(StatusCode::FORBIDDEN)
    }

    fn add_cors_headers(&self, response: &mut HttpResponse, origin: &str) {
        let Some(value) = self.config.allowed_origins.header_value(origin) else {
            return;
        };
        let headers = response.headers_mut();
        headers.insert(headers::ALLOW_ORIGIN, value);
        if matches!(self.config.allowed_origins, AllowedOrigins::List(_)) {
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
        }
    }
}

impl Middleware for Cors {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HttpResponse> {
        Box::pin(async move {
            if Self::is_preflight(&request) {
                return self.handle_preflight(&request);
            }

            let origin = Self::origin(&request).map(String::from);
            let mut response = next.run(ctx, request).await;

            if let Some(origin) = origin {
                if self.config.allowed_origins.is_allowed(&origin) {
                    self.trace("actual request allowed", &origin);
                    self.add_cors_headers(&mut response, &origin);
                } else {
                    self.trace("actual request origin not allowed", &origin);
                }
            }
            response
        })
    }
}
