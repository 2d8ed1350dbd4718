//! # Seriewatch Core
//!
//! Core library for the seriewatch service: tracks which series a user has
//! watched on each streaming platform and serves the list over HTTP.
//!
//! ## Architecture
//!
//! Tokio runs a Hyper HTTP/1 server. Requests go through an ordered route
//! table to synchronous handlers over a JSON-file backed record store.
//!
//! ## Modules
//!
//! - `server` - HTTP server built on Hyper
//! - `router` - Ordered, first-match routing
//! - `route` - Path pattern compilation and matching
//! - `query` - Query string decoding
//! - `request` - HTTP request wrapper with headers, query and JSON body
//! - `middleware` - Request/response middleware system
//! - `json` - JSON parsing with simd-json
//! - `validation` - Structured validation errors
//! - `store` - Typed record tables persisted to a JSON file
//! - `model` - Platforms and series
//! - `series` - The series operations
//! - `api` - Route registration for the series operations
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod api;
pub mod error;
pub mod json;
pub mod middleware;
pub mod model;
pub mod query;
pub mod request;
pub mod route;
pub mod router;
pub mod series;
pub mod server;
pub mod store;
pub mod validation;

pub use api::register_routes;
pub use error::{Error, Result};
pub use json::{parse_json, to_json};
pub use middleware::{LoggingMiddleware, Middleware, MiddlewareChain, TimingMiddleware};
pub use model::{Platform, Series, SeriesListing};
pub use query::parse_query;
pub use request::ApiRequest;
pub use route::{RouteInfo, RoutePattern};
pub use router::{Method, Router};
pub use series::SeriesService;
pub use server::{ApiResponse, Server, ServerConfig};
pub use store::{Database, Flush, Record};
pub use validation::{FieldError, ValidationCode, ValidationErrors, ValidationResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
