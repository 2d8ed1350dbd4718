//! # HTTP Request
//!
//! Request wrapper handed to handlers: method, target URL, headers, the raw
//! body, and what routing and body parsing extracted from them.

use crate::error::{Error, Result};
use crate::json::parse_json_bytes;
use crate::query::parse_query;
use crate::router::Method;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

/// HTTP request as seen by handlers
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Request path (without query string)
    pub path: String,
    /// Raw query string (e.g., "page=1&limit=10")
    query_string: Option<String>,
    /// Parsed query parameters
    query_params: HashMap<String, String>,
    /// Path parameters captured by the matched route
    pub params: HashMap<String, String>,
    /// Request headers
    headers: hyper::HeaderMap,
    /// Request body (collected)
    body: Option<Bytes>,
    /// Parsed JSON body; `None` until parsed or when the body is empty
    json: Option<Value>,
    /// Server-assigned id, unique per request
    id: String,
}

impl ApiRequest {
    /// Create a request by hand (tests and [`crate::Server::test_request`])
    ///
    /// `url` may carry a query string.
    pub fn new(
        method: Method,
        url: impl Into<String>,
        headers_map: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> Self {
        let url = url.into();
        let (path, query_string) = match url.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (url, None),
        };

        let mut headers = hyper::HeaderMap::new();
        for (k, v) in headers_map {
            if let (Ok(n), Ok(v)) = (
                hyper::header::HeaderName::from_bytes(k.as_bytes()),
                hyper::header::HeaderValue::from_str(&v),
            ) {
                headers.insert(n, v);
            }
        }

        Self::from_parts(method, path, query_string, headers, body)
    }

    fn from_parts(
        method: Method,
        path: String,
        query_string: Option<String>,
        headers: hyper::HeaderMap,
        body: Option<Bytes>,
    ) -> Self {
        let query_params = query_string.as_deref().map(parse_query).unwrap_or_default();
        Self {
            method,
            path,
            query_string,
            query_params,
            params: HashMap::new(),
            headers,
            body,
            json: None,
            id: Uuid::new_v4().to_string(),
        }
    }

    /// Server-assigned request id
    ///
    /// Unlike the `x-request-id` header this is never taken from the client.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Create from a hyper request, collecting at most `max_body_size` bytes
    ///
    /// # Errors
    ///
    /// `Error::PayloadTooLarge` when the body exceeds the limit,
    /// `Error::MalformedBody` when the body cannot be read.
    pub async fn from_hyper_with_limit(
        method: Method,
        req: hyper::Request<hyper::body::Incoming>,
        max_body_size: usize,
    ) -> Result<Self> {
        let uri = req.uri();
        let path = uri.path().to_string();
        let query_string = uri.query().map(String::from);

        let headers = req.headers().clone();
        if let Some(content_len) = headers
            .get(hyper::header::CONTENT_LENGTH)
            .and_then(|len| len.to_str().ok())
            .and_then(|len| len.parse::<usize>().ok())
        {
            if content_len > max_body_size {
                return Err(Error::PayloadTooLarge {
                    limit: max_body_size,
                });
            }
        }

        let body = collect_body(req.into_body(), max_body_size).await?;
        Ok(Self::from_parts(method, path, query_string, headers, Some(body)))
    }

    /// Parse the body as JSON
    ///
    /// An absent or whitespace-only body leaves the request without JSON.
    ///
    /// # Errors
    ///
    /// `Error::MalformedBody` when a non-empty body is not valid JSON.
    pub fn parse_json_body(&mut self) -> Result<()> {
        let Some(body) = &self.body else {
            return Ok(());
        };
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }

        let mut bytes = body.to_vec();
        self.json = Some(parse_json_bytes(&mut bytes)?);
        Ok(())
    }

    /// The parsed JSON body, if any
    #[must_use]
    pub const fn json(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    /// The request target: path plus `?query` when present
    #[must_use]
    pub fn url(&self) -> String {
        match &self.query_string {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    /// Get a header value by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set or override a header
    pub fn set_header(&mut self, name: &str, value: &str) {
        if let (Ok(n), Ok(v)) = (
            hyper::header::HeaderName::from_bytes(name.as_bytes()),
            hyper::header::HeaderValue::from_str(value),
        ) {
            self.headers.insert(n, v);
        }
    }

    /// Get query parameters as a `HashMap`
    #[must_use]
    pub const fn query_map(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Get raw query string
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// Get the request body as bytes
    #[must_use]
    pub fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

/// Collect a body, failing once more than `limit` bytes have arrived
///
/// The limit holds for chunked bodies that carry no `Content-Length`.
async fn collect_body<B>(body: B, limit: usize) -> Result<Bytes>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(Error::PayloadTooLarge { limit }),
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            Err(Error::MalformedBody {
                reason: format!("body read failed: {e}"),
            })
        }
    }
}
