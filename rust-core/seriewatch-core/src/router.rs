//! # Router
//!
//! Ordered route table. Routes are tried in registration order and the first
//! one whose method equals the request method and whose pattern matches the
//! URL wins; there is no best-match ranking.

use crate::error::{Error, Result};
use crate::query::parse_query;
use crate::route::RouteInfo;
use std::collections::HashMap;

/// HTTP methods supported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// HTTP PATCH
    Patch,
    /// HTTP HEAD
    Head,
    /// HTTP OPTIONS
    Options,
}

impl Method {
    /// Map a hyper method; `None` for methods this service never routes
    #[must_use]
    pub fn from_hyper(method: &hyper::Method) -> Option<Self> {
        match *method {
            hyper::Method::GET => Some(Self::Get),
            hyper::Method::POST => Some(Self::Post),
            hyper::Method::PUT => Some(Self::Put),
            hyper::Method::DELETE => Some(Self::Delete),
            hyper::Method::PATCH => Some(Self::Patch),
            hyper::Method::HEAD => Some(Self::Head),
            hyper::Method::OPTIONS => Some(Self::Options),
            _ => None,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
            Self::Head => write!(f, "HEAD"),
            Self::Options => write!(f, "OPTIONS"),
        }
    }
}

/// Route handler identifier
pub type HandlerId = usize;

/// Matched route with extracted parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// The handler ID for this route
    pub handler_id: HandlerId,
    /// Path placeholders captured from the URL
    pub params: HashMap<String, String>,
    /// Decoded query string; empty when the URL had none
    pub query: HashMap<String, String>,
}

impl Match {
    /// Get a path parameter by name
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// HTTP router over an ordered list of compiled routes
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<RouteInfo>,
}

impl Router {
    /// Create a new empty router
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route with the given method and path pattern
    ///
    /// Handler IDs are assigned sequentially from zero, so they double as
    /// indices into a handler table kept alongside the router.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed
    pub fn add_route(&mut self, method: Method, path: &str) -> Result<HandlerId> {
        let handler_id = self.routes.len();
        let route = RouteInfo::new(handler_id, method, path)?;
        self.routes.push(route);
        Ok(handler_id)
    }

    /// Match a request against registered routes
    ///
    /// `url` is the request target: path plus optional `?query`.
    ///
    /// # Errors
    ///
    /// Returns `Error::RouteNotFound` if no route matches
    pub fn match_route(&self, method: Method, url: &str) -> Result<Match> {
        for route in self.routes.iter().filter(|r| r.method == method) {
            if let Ok(captures) = route.pattern.captures(url) {
                return Ok(Match {
                    handler_id: route.handler_id,
                    params: captures.params,
                    query: captures.query.as_deref().map(parse_query).unwrap_or_default(),
                });
            }
        }

        Err(Error::RouteNotFound {
            method: method.to_string(),
            path: url.to_string(),
        })
    }

    /// Registered routes, in match order
    #[must_use]
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    /// Convenience method to add a GET route
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn get(&mut self, path: &str) -> Result<HandlerId> {
        self.add_route(Method::Get, path)
    }

    /// Convenience method to add a POST route
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn post(&mut self, path: &str) -> Result<HandlerId> {
        self.add_route(Method::Post, path)
    }

    /// Convenience method to add a PUT route
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn put(&mut self, path: &str) -> Result<HandlerId> {
        self.add_route(Method::Put, path)
    }

    /// Convenience method to add a DELETE route
    ///
    /// # Errors
    ///
    /// See [`Router::add_route`].
    pub fn delete(&mut self, path: &str) -> Result<HandlerId> {
        self.add_route(Method::Delete, path)
    }
}
