//! # HTTP Server
//!
//! HTTP/1 server built on Hyper and Tokio.
//! Implements graceful shutdown with signal handling.
//!
//! ## Request pipeline
//!
//! 1. Collect the body (413 past the size limit).
//! 2. Parse a non-empty body as JSON (400 "JSON Inválido" on failure).
//! 3. Route on method + URL (404 with an empty body when nothing matches).
//! 4. Run middleware, the handler, then middleware again in reverse.

use crate::error::{Error, Result};
use crate::middleware::{Middleware, MiddlewareChain, MiddlewareResult};
use crate::request::ApiRequest;
use crate::router::{Match, Method, Router};
use http_body_util::Full;
pub use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// HTTP Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Shutdown timeout for graceful shutdown (default: 30 seconds)
    pub shutdown_timeout: Duration,
    /// Max request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 3333).into(),
            keep_alive: true,
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024,
        }
    }
}

/// HTTP response produced by handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
    /// Content type
    pub content_type: String,
    /// Response headers
    pub headers: HashMap<String, String>,
}

impl Default for ApiResponse {
    fn default() -> Self {
        Self {
            status: 200,
            body: String::new(),
            content_type: "text/plain; charset=utf-8".to_string(),
            headers: HashMap::new(),
        }
    }
}

impl ApiResponse {
    /// Create a JSON response
    #[must_use]
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: "application/json".to_string(),
            ..Self::default()
        }
    }

    /// Create a text response
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Create a response with no body
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self::default().with_status(status)
    }

    /// Response a client sees for an error
    #[must_use]
    pub fn from_error(err: &Error) -> Self {
        Self::text(err.client_message()).with_status(err.status_code())
    }

    /// Set status code
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set or override a header
    pub fn set_header(&mut self, key: &str, value: &str) {
        if key.eq_ignore_ascii_case("content-type") {
            self.content_type = value.to_string();
        } else {
            self.headers.insert(key.to_string(), value.to_string());
        }
    }

    /// Get a header value (Content-Type included)
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        if key.eq_ignore_ascii_case("content-type") {
            return Some(&self.content_type);
        }
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Convert to hyper Response
    fn into_hyper(self) -> Response<Full<Bytes>> {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = Response::builder()
            .status(status)
            .header("Content-Type", &self.content_type);
        for (k, v) in &self.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }

        builder
            .body(Full::new(Bytes::from(self.body)))
            .unwrap_or_else(|e| {
                error!("Failed to build response: {}", e);
                let mut fallback = Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
                *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}

/// Future returned by a [`Handler`]
pub type HandlerFuture = Pin<Box<dyn Future<Output = ApiResponse> + Send>>;

/// Handler function type (async)
pub type Handler = Arc<dyn Fn(&ApiRequest, &Match) -> HandlerFuture + Send + Sync>;

/// Wrap a synchronous, fallible handler
///
/// Errors are logged and turned into the matching client response.
pub fn sync_handler<F>(f: F) -> Handler
where
    F: Fn(&ApiRequest, &Match) -> Result<ApiResponse> + Send + Sync + 'static,
{
    Arc::new(move |req: &ApiRequest, matched: &Match| -> HandlerFuture {
        let response = f(req, matched).unwrap_or_else(|err| {
            match &err {
                Error::InvalidInput { errors, .. } => {
                    warn!(path = %req.path, fields = ?errors.fields(), "Request rejected: invalid input");
                }
                e if e.status_code() >= 500 => {
                    error!(path = %req.path, error = %e, "Handler failed");
                }
                e => warn!(path = %req.path, error = %e, "Request rejected"),
            }
            ApiResponse::from_error(&err)
        });
        Box::pin(async move { response })
    })
}

/// HTTP server: route table, handler table and middleware chain
pub struct Server {
    config: ServerConfig,
    router: Router,
    handlers: Vec<Handler>,
    middleware: MiddlewareChain,
}

impl Default for Server {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

impl Server {
    /// Create a new Server instance
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            router: Router::new(),
            handlers: Vec::new(),
            middleware: MiddlewareChain::new(),
        }
    }

    /// Bind the server to an address
    #[must_use]
    pub const fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.address = addr;
        self
    }

    /// Current configuration
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Set max request body size
    pub fn set_max_body_size(&mut self, bytes: usize) {
        self.config.max_body_size = bytes;
    }

    /// Add a middleware to the chain
    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middleware.add(middleware);
    }

    /// Add a route and its handler
    ///
    /// Routes are matched in the order they are added.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed
    pub fn add_route(&mut self, method: Method, path: &str, handler: Handler) -> Result<()> {
        let handler_id = self.router.add_route(method, path)?;
        debug_assert_eq!(handler_id, self.handlers.len());
        self.handlers.push(handler);
        Ok(())
    }

    /// The route table
    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }

    /// Serve until Ctrl-C, then drain connections
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the address cannot be bound.
    pub async fn serve(&self) -> Result<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves, then drain connections
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the address cannot be bound, or
    /// `Error::Io` if accepting fails.
    pub async fn serve_with_shutdown(&self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let addr = self.config.address;
        let listener = bind_listener(addr).map_err(|source| Error::BindError {
            address: addr.to_string(),
            source,
        })?;

        info!("Server listening on http://{}", addr);

        let router = Arc::new(self.router.clone());
        let handlers = Arc::new(self.handlers.clone());
        let middleware = Arc::new(self.middleware.clone());
        let graceful = GracefulShutdown::new();
        let max_body_size = self.config.max_body_size;
        let keep_alive = self.config.keep_alive;

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = accept_result?;
                    let io = TokioIo::new(stream);

                    let router = router.clone();
                    let handlers = handlers.clone();
                    let middleware = middleware.clone();

                    let conn = http1::Builder::new()
                        .keep_alive(keep_alive)
                        .serve_connection(io, service_fn(move |req| {
                            let router = router.clone();
                            let handlers = handlers.clone();
                            let middleware = middleware.clone();
                            async move {
                                let method = req.method().clone();
                                let path = req.uri().path().to_string();
                                let version = format!("{:?}", req.version());

                                let result = handle_request(
                                    req,
                                    &router,
                                    &handlers,
                                    &middleware,
                                    remote_addr,
                                    max_body_size,
                                )
                                .await;

                                match &result {
                                    Ok(resp) => {
                                        info!("    {} - \"{} {} {}\" {}",
                                            remote_addr,
                                            method,
                                            path,
                                            version,
                                            resp.status()
                                        );
                                    }
                                    Err(_) => {
                                        error!("    {} - \"{} {} {}\" ERROR",
                                            remote_addr,
                                            method,
                                            path,
                                            version
                                        );
                                    }
                                }
                                result
                            }
                        }));
                    let conn = graceful.watch(conn);

                    tokio::task::spawn(async move {
                        if let Err(err) = conn.await {
                            error!("Error serving connection: {:?}", err);
                        }
                    });
                }
                () = &mut shutdown => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
            }
        }

        // Stop accepting before telling open connections to finish.
        drop(listener);
        let timeout = self.config.shutdown_timeout;
        if tokio::time::timeout(timeout, graceful.shutdown()).await.is_err() {
            warn!(
                timeout_secs = timeout.as_secs(),
                "Shutdown timeout elapsed with connections still open"
            );
        }
        Ok(())
    }

    /// Execute a test request directly without network stack
    pub async fn test_request(
        &self,
        method: Method,
        url: &str,
        headers: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> ApiResponse {
        if let Some(b) = body.as_ref() {
            if b.len() > self.config.max_body_size {
                return ApiResponse::from_error(&Error::PayloadTooLarge {
                    limit: self.config.max_body_size,
                });
            }
        }
        let mut req = ApiRequest::new(method, url, headers, body);
        req.set_header("x-client-ip", "test");

        process_request(&mut req, &self.router, &self.handlers, &self.middleware).await
    }
}

fn bind_listener(addr: SocketAddr) -> std::io::Result<tokio::net::TcpListener> {
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4()?
    } else {
        tokio::net::TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(1024)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Core request processing logic (network agnostic)
async fn process_request(
    req: &mut ApiRequest,
    router: &Router,
    handlers: &[Handler],
    middleware: &MiddlewareChain,
) -> ApiResponse {
    let request_id = match req.header("x-request-id") {
        Some(id) => id.to_string(),
        None => {
            let id = req.id().to_string();
            req.set_header("x-request-id", &id);
            id
        }
    };

    let mut response = route_request(req, router, handlers, middleware).await;
    response.set_header("x-request-id", &request_id);
    response
}

async fn route_request(
    req: &mut ApiRequest,
    router: &Router,
    handlers: &[Handler],
    middleware: &MiddlewareChain,
) -> ApiResponse {
    if let Err(e) = req.parse_json_body() {
        warn!(path = %req.path, error = %e, "Rejected request body");
        return ApiResponse::from_error(&e);
    }

    let matched = match router.match_route(req.method, &req.url()) {
        Ok(m) => m,
        Err(_) => return ApiResponse::empty(404),
    };
    req.params.clone_from(&matched.params);

    let Some(handler) = handlers.get(matched.handler_id) else {
        error!(handler_id = matched.handler_id, "Route has no handler");
        return ApiResponse::empty(500);
    };

    let mut response = match middleware.run_before(req) {
        MiddlewareResult::Continue => handler(&*req, &matched).await,
        MiddlewareResult::Respond(resp) => resp,
    };
    middleware.run_after(req, &mut response);
    response
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    router: &Router,
    handlers: &[Handler],
    middleware: &MiddlewareChain,
    remote_addr: SocketAddr,
    max_body_size: usize,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let Some(method) = Method::from_hyper(req.method()) else {
        return Ok(ApiResponse::empty(404).into_hyper());
    };

    let mut api_request = match ApiRequest::from_hyper_with_limit(method, req, max_body_size).await {
        Ok(r) => r,
        Err(e) => {
            warn!("Failed to read request: {}", e);
            return Ok(ApiResponse::from_error(&e).into_hyper());
        }
    };

    api_request.set_header("x-client-ip", &remote_addr.ip().to_string());
    let response = process_request(&mut api_request, router, handlers, middleware).await;
    Ok(response.into_hyper())
}
