//! # Error Handling
//!
//! Centralized error types for seriewatch core.
//! Uses `thiserror` for ergonomic error definitions.

use crate::validation::ValidationErrors;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for seriewatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the seriewatch service
#[derive(Error, Debug)]
pub enum Error {
    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    BindError {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Router failed to match the requested method and URL
    #[error("No route found for {method} {path}")]
    RouteNotFound {
        /// Request method
        method: String,
        /// The URL that wasn't matched
        path: String,
    },

    /// A compiled pattern was asked for captures of a URL it does not match
    #[error("URL {url} does not match pattern {pattern}")]
    NoMatch {
        /// The route pattern
        pattern: String,
        /// The URL tested against it
        url: String,
    },

    /// Invalid route pattern provided
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid pattern
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Required request fields are missing
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Message returned to the client
        message: String,
        /// The offending fields
        errors: ValidationErrors,
    },

    /// Platform, series or record lookup came up empty
    #[error("Not found: {message}")]
    NotFound {
        /// Message returned to the client
        message: String,
    },

    /// Request body is not valid JSON
    #[error("Malformed request body: {reason}")]
    MalformedBody {
        /// Parser error
        reason: String,
    },

    /// Writing the store snapshot failed
    #[error("Failed to persist {}: {source}", path.display())]
    Persistence {
        /// Backing file
        path: PathBuf,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
    },
}

impl Error {
    /// Shorthand for a `NotFound` error with a client message
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Shorthand for an `InvalidInput` error
    pub fn invalid_input(message: impl Into<String>, errors: ValidationErrors) -> Self {
        Self::InvalidInput {
            message: message.into(),
            errors,
        }
    }

    /// HTTP status code a client sees for this error
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput { .. } | Self::MalformedBody { .. } => 400,
            Self::NotFound { .. } | Self::RouteNotFound { .. } | Self::NoMatch { .. } => 404,
            Self::PayloadTooLarge { .. } => 413,
            _ => 500,
        }
    }

    /// Body text a client sees for this error
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidInput { message, .. } | Self::NotFound { message } => message.clone(),
            Self::MalformedBody { .. } => "JSON Inválido".to_string(),
            Self::RouteNotFound { .. } | Self::NoMatch { .. } => String::new(),
            Self::PayloadTooLarge { .. } => "Payload Too Large".to_string(),
            _ => "Internal Server Error".to_string(),
        }
    }
}
