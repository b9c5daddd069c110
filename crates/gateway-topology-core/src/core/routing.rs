// crates/gateway-topology-core/src/core/routing.rs
// ============================================================================
// Module: Gateway Routing
// Description: Path patterns, methods, and most-specific route resolution.
// Purpose: Model the gateway route table independent of declaration order.
// Dependencies: crate::core::{error, identifiers}, serde
// ============================================================================

//! ## Overview
//! A route table is an ordered list of `(pattern, method)` routes. Order is
//! kept for enumeration and rendering only; resolution always picks the most
//! specific match:
//! - segments are compared left to right, literal beats `{param}` beats the
//!   greedy `{proxy+}` segment,
//! - among equally specific patterns, an exact method beats `ANY`.
//!
//! The greedy segment must be the last segment of a pattern. It captures the
//! remainder of the request path (at least one segment) and hands it to the
//! target unchanged.
//!
//! Two patterns collide when they have the same shape (same literals in the
//! same positions, parameters in the same positions) regardless of parameter
//! names, matching how the platform rejects sibling resources.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::TopologyError;
use crate::core::identifiers::GatewayId;
use crate::core::identifiers::RouteId;
use crate::core::identifiers::UnitId;

// ============================================================================
// SECTION: Methods
// ============================================================================

/// HTTP method accepted by a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`.
    Get,
    /// `POST`.
    Post,
    /// `PUT`.
    Put,
    /// `PATCH`.
    Patch,
    /// `DELETE`.
    Delete,
    /// `HEAD`.
    Head,
    /// `OPTIONS`.
    Options,
    /// Any method.
    Any,
}

impl HttpMethod {
    /// Returns the canonical upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Any => "ANY",
        }
    }

    /// Returns the method token used inside execute-api ARNs.
    #[must_use]
    pub const fn arn_token(self) -> &'static str {
        match self {
            Self::Any => "*",
            other => other.as_str(),
        }
    }

    /// Returns true when a route declared with `self` accepts `request`.
    #[must_use]
    pub fn accepts(self, request: Self) -> bool {
        self == Self::Any || self == request
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = TopologyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "ANY" | "*" => Ok(Self::Any),
            other => Err(TopologyError::Configuration(format!("unsupported http method {other}"))),
        }
    }
}

// ============================================================================
// SECTION: Path Patterns
// ============================================================================

/// One segment of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Exact literal segment.
    Literal(String),
    /// Single-segment parameter, `{name}`.
    Param(String),
    /// Greedy remainder, `{name+}`.
    Greedy(String),
}

impl PathSegment {
    /// Specificity rank used by route resolution.
    const fn rank(&self) -> u8 {
        match self {
            Self::Literal(_) => 2,
            Self::Param(_) => 1,
            Self::Greedy(_) => 0,
        }
    }

    /// Returns the segment with parameter names erased.
    fn shape(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Param(_) | Self::Greedy(_) => None,
        }
    }
}

/// Parsed route path pattern such as `/items/{id}` or `/{proxy+}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathPattern {
    /// Normalized pattern text.
    raw: String,
    /// Parsed segments; empty for the root pattern.
    segments: Vec<PathSegment>,
}

impl PathPattern {
    /// Parses and normalizes a path pattern.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the pattern does not
    /// start with `/`, contains empty or malformed segments, reuses a
    /// parameter name, or places a greedy segment before the end.
    pub fn parse(pattern: &str) -> Result<Self, TopologyError> {
        let trimmed = pattern.trim();
        if !trimmed.starts_with('/') {
            return Err(invalid_pattern(pattern, "must start with /"));
        }
        let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if body.starts_with('/') {
            return Err(invalid_pattern(pattern, "contains an empty segment"));
        }
        let body = body.strip_suffix('/').unwrap_or(body);
        if body.is_empty() {
            return Ok(Self {
                raw: "/".to_string(),
                segments: Vec::new(),
            });
        }
        let parts: Vec<&str> = body.split('/').collect();
        let mut segments = Vec::with_capacity(parts.len());
        let mut names: Vec<&str> = Vec::new();
        for (index, part) in parts.iter().enumerate() {
            if part.is_empty() {
                return Err(invalid_pattern(pattern, "contains an empty segment"));
            }
            let segment = if let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}'))
            {
                let (name, greedy) =
                    inner.strip_suffix('+').map_or((inner, false), |name| (name, true));
                if name.is_empty()
                    || !name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
                {
                    return Err(invalid_pattern(pattern, "has a malformed parameter"));
                }
                if names.contains(&name) {
                    return Err(invalid_pattern(pattern, "reuses a parameter name"));
                }
                names.push(name);
                if greedy {
                    if index + 1 != parts.len() {
                        return Err(invalid_pattern(pattern, "greedy segment must be last"));
                    }
                    PathSegment::Greedy(name.to_string())
                } else {
                    PathSegment::Param(name.to_string())
                }
            } else {
                if part.contains(['{', '}']) {
                    return Err(invalid_pattern(pattern, "has a malformed parameter"));
                }
                PathSegment::Literal((*part).to_string())
            };
            segments.push(segment);
        }
        Ok(Self {
            raw: format!("/{body}"),
            segments,
        })
    }

    /// Returns the normalized pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns true when the pattern ends in a greedy segment.
    #[must_use]
    pub fn is_greedy(&self) -> bool {
        matches!(self.segments.last(), Some(PathSegment::Greedy(_)))
    }

    /// Returns the resource path as rendered inside execute-api ARNs.
    #[must_use]
    pub fn arn_resource(&self) -> &str {
        self.raw.trim_start_matches('/')
    }

    /// Returns true when both patterns have the same shape.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(left, right)| {
                left.rank() == right.rank() && left.shape() == right.shape()
            })
    }

    /// Returns the specificity key used to rank matching patterns.
    fn specificity(&self) -> Vec<u8> {
        self.segments.iter().map(PathSegment::rank).collect()
    }

    /// Matches a request path, returning captured parameters.
    #[must_use]
    pub fn capture(&self, path: &RequestPath<'_>) -> Option<PathCaptures> {
        let mut captures = PathCaptures::default();
        let request = &path.segments;
        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Literal(value) => {
                    let (_, actual) = request.get(index)?;
                    if actual != value {
                        return None;
                    }
                }
                PathSegment::Param(name) => {
                    let (_, actual) = request.get(index)?;
                    captures.params.insert(name.clone(), (*actual).to_string());
                }
                PathSegment::Greedy(name) => {
                    let (offset, _) = request.get(index)?;
                    let remainder = &path.raw[*offset ..];
                    captures.params.insert(name.clone(), remainder.to_string());
                    captures.proxy_path = Some(remainder.to_string());
                    return Some(captures);
                }
            }
        }
        (request.len() == self.segments.len()).then_some(captures)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl TryFrom<String> for PathPattern {
    type Error = TopologyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PathPattern> for String {
    fn from(value: PathPattern) -> Self {
        value.raw
    }
}

/// Builds a pattern validation error.
fn invalid_pattern(pattern: &str, reason: &str) -> TopologyError {
    TopologyError::Configuration(format!("path pattern {pattern:?} {reason}"))
}

// ============================================================================
// SECTION: Request Paths
// ============================================================================

/// Request path split into non-empty segments with their byte offsets.
#[derive(Debug, Clone)]
pub struct RequestPath<'a> {
    /// Raw path without the query string.
    raw: &'a str,
    /// `(offset, segment)` pairs.
    segments: Vec<(usize, &'a str)>,
}

impl<'a> RequestPath<'a> {
    /// Splits a request path. Query strings are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Configuration`] when the path does not start with `/`.
    pub fn parse(path: &'a str) -> Result<Self, TopologyError> {
        let raw = path.split_once('?').map_or(path, |(head, _)| head);
        if !raw.starts_with('/') {
            return Err(TopologyError::Configuration(format!(
                "request path {path:?} must start with /"
            )));
        }
        let mut segments = Vec::new();
        let mut offset = 0usize;
        for part in raw.split('/') {
            if !part.is_empty() {
                segments.push((offset, part));
            }
            offset += part.len() + 1;
        }
        Ok(Self {
            raw,
            segments,
        })
    }

    /// Returns the raw path without the query string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.raw
    }
}

/// Parameters captured while matching a pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathCaptures {
    /// Named parameters, including the greedy parameter.
    pub params: BTreeMap<String, String>,
    /// Remainder captured by a greedy segment, forwarded unchanged.
    pub proxy_path: Option<String>,
}

// ============================================================================
// SECTION: Routes
// ============================================================================

/// A single gateway route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Route handle.
    pub id: RouteId,
    /// Owning gateway.
    pub gateway: GatewayId,
    /// Path pattern.
    pub pattern: PathPattern,
    /// Accepted method.
    pub method: HttpMethod,
    /// Compute unit receiving matched requests.
    pub target: UnitId,
    /// Whether callers must present an API key. Always explicit per route.
    pub api_key_required: bool,
}

/// A resolved route together with its captures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteMatch<'a> {
    /// Matched route.
    pub route: &'a Route,
    /// Captured parameters.
    pub captures: PathCaptures,
}

/// Ordered route table with most-specific-match resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    /// Routes in declaration order.
    routes: Vec<Route>,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            routes: Vec::new(),
        }
    }

    /// Appends a route, rejecting `(pattern, method)` collisions.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::DuplicateRoute`] when an existing route has
    /// the same pattern shape and method, whatever its target.
    pub fn insert(&mut self, route: Route) -> Result<(), TopologyError> {
        if self
            .routes
            .iter()
            .any(|existing| existing.method == route.method && existing.pattern.same_shape(&route.pattern))
        {
            return Err(TopologyError::DuplicateRoute {
                gateway: route.gateway.name().to_string(),
                path: route.pattern.to_string(),
                method: route.method.to_string(),
            });
        }
        self.routes.push(route);
        Ok(())
    }

    /// Returns routes in declaration order.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true when no routes are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolves a request to the most specific matching route.
    #[must_use]
    pub fn resolve(&self, method: HttpMethod, path: &RequestPath<'_>) -> Option<RouteMatch<'_>> {
        let mut best: Option<((Vec<u8>, u8), RouteMatch<'_>)> = None;
        for route in &self.routes {
            if !route.method.accepts(method) {
                continue;
            }
            let Some(captures) = route.pattern.capture(path) else {
                continue;
            };
            let key = (route.pattern.specificity(), u8::from(route.method != HttpMethod::Any));
            let better = best.as_ref().is_none_or(|(best_key, _)| key > *best_key);
            if better {
                best = Some((key, RouteMatch {
                    route,
                    captures,
                }));
            }
        }
        best.map(|(_, matched)| matched)
    }

    /// Returns true when any route pattern matches the path, for any method.
    #[must_use]
    pub fn has_resource(&self, path: &RequestPath<'_>) -> bool {
        self.routes.iter().any(|route| route.pattern.capture(path).is_some())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
