//! # Middleware System
//!
//! Request/response interception for logging and timing.

use crate::request::ApiRequest;
use crate::server::ApiResponse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info};

/// Middleware trait for request/response interception
///
/// Middlewares are called in order before the handler, and in reverse order after.
pub trait Middleware: Send + Sync {
    /// Called before the request handler
    ///
    /// Can inspect the request or return early with a response.
    fn before_request(&self, _req: &ApiRequest) -> MiddlewareResult {
        MiddlewareResult::Continue
    }

    /// Called after the request handler
    ///
    /// Can modify the response or perform logging.
    fn after_response(&self, _req: &ApiRequest, _res: &mut ApiResponse) {}

    /// Middleware name for logging
    fn name(&self) -> &'static str {
        "Unknown"
    }
}

/// Result of middleware execution
#[derive(Debug)]
pub enum MiddlewareResult {
    /// Continue to next middleware/handler
    Continue,
    /// Short-circuit with this response (skip handler)
    Respond(ApiResponse),
}

/// Middleware chain for processing requests
#[derive(Default, Clone)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Create a new empty middleware chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the chain
    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    /// Execute `before_request` for all middlewares
    pub fn run_before(&self, req: &ApiRequest) -> MiddlewareResult {
        for mw in &self.middlewares {
            match mw.before_request(req) {
                MiddlewareResult::Continue => continue,
                result => return result,
            }
        }
        MiddlewareResult::Continue
    }

    /// Execute `after_response` for all middlewares (in reverse order)
    pub fn run_after(&self, req: &ApiRequest, res: &mut ApiResponse) {
        for mw in self.middlewares.iter().rev() {
            mw.after_response(req, res);
        }
    }

    /// Get the number of middlewares
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check if chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Names of the registered middlewares, in call order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|mw| mw.name()).collect()
    }
}

/// Logging middleware - one structured event per request and per response
#[derive(Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    /// Create a new logging middleware
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for LoggingMiddleware {
    fn before_request(&self, req: &ApiRequest) -> MiddlewareResult {
        let request_id = req.header("x-request-id").unwrap_or("-");
        debug!(request_id = %request_id, body = ?req.json(), params = ?req.params, "Request details");
        info!(
            method = %req.method,
            path = %req.path,
            request_id = %request_id,
            "Request received"
        );
        MiddlewareResult::Continue
    }

    fn after_response(&self, req: &ApiRequest, res: &mut ApiResponse) {
        let request_id = req.header("x-request-id").unwrap_or("-");
        info!(
            method = %req.method,
            path = %req.path,
            status = res.status,
            request_id = %request_id,
            "Response sent"
        );
    }

    fn name(&self) -> &'static str {
        "LoggingMiddleware"
    }
}

/// Timing middleware - measures handler duration per request
#[derive(Default)]
pub struct TimingMiddleware {
    start_times: Mutex<HashMap<String, Instant>>,
}

impl TimingMiddleware {
    /// Create a new timing middleware
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Middleware for TimingMiddleware {
    fn before_request(&self, req: &ApiRequest) -> MiddlewareResult {
        self.start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(req.id().to_string(), Instant::now());
        MiddlewareResult::Continue
    }

    fn after_response(&self, req: &ApiRequest, _res: &mut ApiResponse) {
        let start = self
            .start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(req.id());
        if let Some(start) = start {
            debug!(
                method = %req.method,
                path = %req.path,
                duration_us = %start.elapsed().as_micros(),
                "Request timing"
            );
        }
    }

    fn name(&self) -> &'static str {
        "TimingMiddleware"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Method;

    fn create_test_request() -> ApiRequest {
        let mut headers = HashMap::new();
        headers.insert("x-request-id".to_string(), "req-1".to_string());
        ApiRequest::new(Method::Get, "/series", headers, None)
    }

    struct Reject;

    impl Middleware for Reject {
        fn before_request(&self, _req: &ApiRequest) -> MiddlewareResult {
            MiddlewareResult::Respond(ApiResponse::text("blocked").with_status(403))
        }
    }

    #[test]
    fn test_middleware_chain_empty() {
        let chain = MiddlewareChain::new();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
    }

    #[test]
    fn test_middleware_chain_add() {
        let mut chain = MiddlewareChain::new();
        chain.add(LoggingMiddleware::new());
        chain.add(TimingMiddleware::new());

        assert_eq!(chain.names(), vec!["LoggingMiddleware", "TimingMiddleware"]);
    }

    #[test]
    fn test_chain_short_circuits() {
        let mut chain = MiddlewareChain::new();
        chain.add(LoggingMiddleware::new());
        chain.add(Reject);

        match chain.run_before(&create_test_request()) {
            MiddlewareResult::Respond(res) => assert_eq!(res.status, 403),
            MiddlewareResult::Continue => panic!("expected short-circuit"),
        }
    }

    #[test]
    fn test_timing_middleware_clears_entry() {
        let mw = TimingMiddleware::new();
        let req = create_test_request();
        let mut res = ApiResponse::text("ok");

        mw.before_request(&req);
        assert_eq!(mw.start_times.lock().unwrap().len(), 1);
        mw.after_response(&req, &mut res);
        assert!(mw.start_times.lock().unwrap().is_empty());
    }

    #[test]
    fn test_timing_ignores_client_request_id() {
        let mw = TimingMiddleware::new();
        let first = create_test_request();
        let second = create_test_request();
        let mut res = ApiResponse::text("ok");

        mw.before_request(&first);
        mw.before_request(&second);
        assert_eq!(mw.start_times.lock().unwrap().len(), 2);

        mw.after_response(&first, &mut res);
        assert!(mw.start_times.lock().unwrap().contains_key(second.id()));
        mw.after_response(&second, &mut res);
        assert!(mw.start_times.lock().unwrap().is_empty());
    }
}
