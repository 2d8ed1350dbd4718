//! # Route Patterns
//!
//! Compiles path templates such as `/series/:plataformaId` into a list of
//! literal and placeholder segments, then matches URLs segment by segment.
//!
//! A compiled pattern accepts a trailing query string (`?...`) unless it was
//! built with [`RoutePattern::compile_strict`]. A trailing `?` in the template
//! is accepted as an explicit query marker.

use crate::error::{Error, Result};
use crate::router::{HandlerId, Method};
use std::collections::HashMap;
use std::fmt;

/// One `/`-separated piece of a compiled pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the URL segment exactly
    Literal(String),
    /// Captures one non-empty URL segment under this name
    Param(String),
}

/// Values captured from a matching URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    /// Placeholder name to raw (not percent-decoded) path segment
    pub params: HashMap<String, String>,
    /// Everything after the first `?`, if the URL had one
    pub query: Option<String>,
}

/// A compiled route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
    allow_query: bool,
}

impl RoutePattern {
    /// Compile a pattern that also matches URLs carrying a query string
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern does not start with
    /// `/`, has an unnamed placeholder, or repeats a placeholder name.
    pub fn compile(pattern: &str) -> Result<Self> {
        Self::build(pattern, true)
    }

    /// Compile a pattern that rejects URLs carrying a query string
    ///
    /// # Errors
    ///
    /// Same as [`RoutePattern::compile`].
    pub fn compile_strict(pattern: &str) -> Result<Self> {
        Self::build(pattern, false)
    }

    fn build(pattern: &str, allow_query: bool) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidRoutePattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let (path, marked) = match pattern.strip_suffix('?') {
            Some(p) => (p, true),
            None => (pattern, false),
        };
        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| invalid("must start with '/'"))?;
        if rest.contains('?') {
            return Err(invalid("'?' is only allowed at the end"));
        }

        let mut segments = Vec::new();
        for part in rest.split('/') {
            if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(invalid("placeholder without a name"));
                }
                if segments.contains(&Segment::Param(name.to_string())) {
                    return Err(invalid("duplicate placeholder name"));
                }
                segments.push(Segment::Param(name.to_string()));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
            allow_query: allow_query || marked,
        })
    }

    /// The template this pattern was compiled from
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Compiled segments, in path order
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether a trailing query string is accepted
    #[must_use]
    pub const fn allows_query(&self) -> bool {
        self.allow_query
    }

    /// Names of the placeholders, in path order
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Check whether a URL matches
    #[must_use]
    pub fn test(&self, url: &str) -> bool {
        self.try_match(url).is_some()
    }

    /// Extract captures from a URL
    ///
    /// # Errors
    ///
    /// Returns `Error::NoMatch` if the URL does not match this pattern.
    pub fn captures(&self, url: &str) -> Result<Captures> {
        self.try_match(url).ok_or_else(|| Error::NoMatch {
            pattern: self.source.clone(),
            url: url.to_string(),
        })
    }

    fn try_match(&self, url: &str) -> Option<Captures> {
        let (path, query) = match url.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (url, None),
        };
        if query.is_some() && !self.allow_query {
            return None;
        }

        let rest = path.strip_prefix('/')?;
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Param(name) if !part.is_empty() => {
                    params.insert(name.clone(), part.to_string());
                }
                _ => return None,
            }
        }

        Some(Captures {
            params,
            query: query.map(str::to_string),
        })
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// A registered route: method, compiled pattern and the handler it maps to
#[derive(Debug, Clone)]
pub struct RouteInfo {
    /// Unique handler identifier
    pub handler_id: HandlerId,
    /// Request method this route answers
    pub method: Method,
    /// Compiled path pattern
    pub pattern: RoutePattern,
}

impl RouteInfo {
    /// Create a new `RouteInfo`, compiling the path pattern
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed
    pub fn new(handler_id: HandlerId, method: Method, path: &str) -> Result<Self> {
        Ok(Self {
            handler_id,
            method,
            pattern: RoutePattern::compile(path)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern_matches_exact_path_only() {
        let p = RoutePattern::compile("/series").unwrap();
        assert!(p.test("/series"));
        assert!(!p.test("/series/"));
        assert!(!p.test("/series/abc"));
        assert!(!p.test("/Series"));
        assert!(!p.test("series"));
        assert_eq!(p.param_names().count(), 0);
    }

    #[test]
    fn test_placeholder_captures_segment() {
        let p = RoutePattern::compile("/series/:plataformaId").unwrap();
        let c = p.captures("/series/3f2a-9b").unwrap();
        assert_eq!(c.params.get("plataformaId").map(String::as_str), Some("3f2a-9b"));
        assert_eq!(c.query, None);
    }

    #[test]
    fn test_placeholder_is_not_percent_decoded() {
        let p = RoutePattern::compile("/series/:id").unwrap();
        let c = p.captures("/series/a%20b").unwrap();
        assert_eq!(c.params["id"], "a%20b");
    }

    #[test]
    fn test_placeholder_needs_non_empty_segment() {
        let p = RoutePattern::compile("/series/:id").unwrap();
        assert!(!p.test("/series/"));
        assert!(!p.test("/series"));
        assert!(!p.test("/series/a/b"));
    }

    #[test]
    fn test_multiple_placeholders() {
        let p = RoutePattern::compile("/plataformas/:pid/series/:sid").unwrap();
        let c = p.captures("/plataformas/p1/series/s9").unwrap();
        assert_eq!(c.params["pid"], "p1");
        assert_eq!(c.params["sid"], "s9");
        assert_eq!(p.param_names().collect::<Vec<_>>(), vec!["pid", "sid"]);
    }

    #[test]
    fn test_query_is_captured() {
        let p = RoutePattern::compile("/series").unwrap();
        let c = p.captures("/series?assistiu=Sim&page=2").unwrap();
        assert_eq!(c.query.as_deref(), Some("assistiu=Sim&page=2"));

        let c = p.captures("/series?").unwrap();
        assert_eq!(c.query.as_deref(), Some(""));
    }

    #[test]
    fn test_strict_pattern_rejects_query() {
        let p = RoutePattern::compile_strict("/series").unwrap();
        assert!(!p.allows_query());
        assert!(p.test("/series"));
        assert!(!p.test("/series?x=1"));
    }

    #[test]
    fn test_explicit_query_marker() {
        let p = RoutePattern::compile_strict("/series?").unwrap();
        assert!(p.allows_query());
        assert!(p.test("/series?x=1"));
        assert_eq!(p.source(), "/series?");
    }

    #[test]
    fn test_root_pattern() {
        let p = RoutePattern::compile("/").unwrap();
        assert!(p.test("/"));
        assert!(!p.test("/series"));
    }

    #[test]
    fn test_no_match_error() {
        let p = RoutePattern::compile("/series/add").unwrap();
        let err = p.captures("/series/remove").unwrap_err();
        assert!(matches!(err, Error::NoMatch { .. }));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(RoutePattern::compile("series").is_err());
        assert!(RoutePattern::compile("/series/:").is_err());
        assert!(RoutePattern::compile("/a/:id/b/:id").is_err());
        assert!(RoutePattern::compile("/a?b/c").is_err());
    }

    #[test]
    fn test_route_info_compiles_pattern() {
        let info = RouteInfo::new(3, Method::Get, "/series/:plataformaId").unwrap();
        assert_eq!(info.handler_id, 3);
        assert_eq!(info.method, Method::Get);
        assert_eq!(
            info.pattern.segments(),
            &[
                Segment::Literal("series".to_string()),
                Segment::Param("plataformaId".to_string())
            ]
        );
    }
}
