//! Endpoint classification
//!
//! A static table maps request paths to the access class the gate enforces.
//! Patterns use `{name}` for any single non-empty segment and `{name:int}`
//! for a segment made only of ASCII digits.

use std::fmt;

use once_cell::sync::Lazy;
use serde::Serialize;

/// Access class of a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointClass {
    /// No route matches
    Invalid,
    /// Requires a valid API key
    Protected,
    /// Served without a key, IP-limited only
    Free,
}

impl EndpointClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Protected => "protected",
            Self::Free => "free",
        }
    }
}

impl fmt::Display for EndpointClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
    NumericParam,
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(inner) if inner.ends_with(":int") => Self::NumericParam,
            Some(_) => Self::Param,
            None => Self::Literal(raw.to_string()),
        }
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Self::Literal(literal) => literal == value,
            Self::Param => !value.is_empty(),
            Self::NumericParam => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
        }
    }
}

/// One entry of the route table
#[derive(Debug, Clone)]
pub struct RoutePattern {
    pattern: String,
    class: EndpointClass,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn new(pattern: impl Into<String>, class: EndpointClass) -> Self {
        let pattern = pattern.into();
        let segments = split_path(&pattern).map(Segment::parse).collect();

        Self {
            pattern,
            class,
            segments,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn class(&self) -> EndpointClass {
        self.class
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut parts = split_path(path);

        for segment in &self.segments {
            match parts.next() {
                Some(part) if segment.matches(part) => {}
                _ => return false,
            }
        }

        parts.next().is_none()
    }
}

/// Ordered route table; the first matching pattern wins
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RoutePattern>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, pattern: impl Into<String>, class: EndpointClass) -> Self {
        self.routes.push(RoutePattern::new(pattern, class));
        self
    }

    /// Routes served by the quotes API
    pub fn quotes() -> Self {
        Self::new()
            .with_route("/quotes/random", EndpointClass::Free)
            .with_route("/quotes/random/anime", EndpointClass::Protected)
            .with_route("/quotes/random/character", EndpointClass::Protected)
            .with_route("/quotes/{id:int}", EndpointClass::Protected)
            .with_route("/quotes", EndpointClass::Protected)
    }

    pub fn routes(&self) -> &[RoutePattern] {
        &self.routes
    }

    pub fn classify(&self, path: &str) -> EndpointClass {
        self.routes
            .iter()
            .find(|route| route.matches(path))
            .map(RoutePattern::class)
            .unwrap_or(EndpointClass::Invalid)
    }
}

static QUOTE_ROUTES: Lazy<RouteTable> = Lazy::new(RouteTable::quotes);

/// Classifies a path against the quotes route table
pub fn classify(path: &str) -> EndpointClass {
    QUOTE_ROUTES.classify(path)
}

/// Splits on `/` after the leading slash; empty segments are kept
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_route() {
        assert_eq!(classify("/quotes/random"), EndpointClass::Free);
    }

    #[test]
    fn test_protected_routes() {
        assert_eq!(classify("/quotes/random/anime"), EndpointClass::Protected);
        assert_eq!(classify("/quotes/random/character"), EndpointClass::Protected);
        assert_eq!(classify("/quotes/7"), EndpointClass::Protected);
        assert_eq!(classify("/quotes"), EndpointClass::Protected);
    }

    #[test]
    fn test_invalid_routes() {
        assert_eq!(classify("/"), EndpointClass::Invalid);
        assert_eq!(classify(""), EndpointClass::Invalid);
        assert_eq!(classify("/unknown"), EndpointClass::Invalid);
        assert_eq!(classify("/quotes/abc"), EndpointClass::Invalid);
        assert_eq!(classify("/quotes/7/extra"), EndpointClass::Invalid);
        assert_eq!(classify("/quotes/random/"), EndpointClass::Invalid);
        assert_eq!(classify("/quotes//"), EndpointClass::Invalid);
        assert_eq!(classify("/QUOTES/random"), EndpointClass::Invalid);
    }

    #[test]
    fn test_numeric_param_rejects_signs() {
        assert_eq!(classify("/quotes/-1"), EndpointClass::Invalid);
        assert_eq!(classify("/quotes/1e3"), EndpointClass::Invalid);
    }

    #[test]
    fn test_plain_param_matches_any_segment() {
        let table = RouteTable::new().with_route("/anime/{name}", EndpointClass::Free);

        assert_eq!(table.classify("/anime/naruto"), EndpointClass::Free);
        assert_eq!(table.classify("/anime/"), EndpointClass::Invalid);
    }

    #[test]
    fn test_first_match_wins() {
        let table = RouteTable::new()
            .with_route("/items/{id:int}", EndpointClass::Free)
            .with_route("/items/{id}", EndpointClass::Protected);

        assert_eq!(table.classify("/items/42"), EndpointClass::Free);
        assert_eq!(table.classify("/items/abc"), EndpointClass::Protected);
    }

    #[test]
    fn test_empty_table_classifies_everything_invalid() {
        assert_eq!(RouteTable::new().classify("/quotes"), EndpointClass::Invalid);
    }
}
