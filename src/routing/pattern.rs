//! Path patterns with named parameters.
//!
//! Supported syntax:
//!
//! - literal segments: `/search`
//! - named segments: `/:workspaceId/search`
//! - optional trailing named segments: `/docs/:page?`
//! - a trailing splat capturing the rest of the path: `/files/*path`
//!
//! Literal segments compare ASCII case-insensitively, one trailing slash is
//! ignored on both sides, and captured values are percent-decoded.

use crate::domain::error::{Result, SynapseError};
use std::collections::BTreeMap;
use std::fmt;

/// Parameters captured by a successful match, by name.
pub type PathParams = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    OptionalParam(String),
    Splat(String),
}

/// A compiled path pattern.
#[derive(Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RoutePattern").field(&self.source).finish()
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn split_path(path: &str) -> Option<Vec<&str>> {
    let rest = path.strip_prefix('/')?;
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    if rest.is_empty() {
        return Some(Vec::new());
    }
    Some(rest.split('/').collect())
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(
        |e| {
            tracing::debug!(segment = %raw, error = %e, "keeping undecodable path segment");
            raw.to_string()
        },
        std::borrow::Cow::into_owned,
    )
}

impl RoutePattern {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`SynapseError::InvalidRoutePattern`] when the pattern does not
    /// start with `/`, contains empty segments or invalid parameter names,
    /// repeats a parameter name, places a required segment after an optional
    /// one, or has a splat that is not last.
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason: &str| SynapseError::InvalidRoutePattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let parts = split_path(pattern).ok_or_else(|| invalid("must start with '/'"))?;
        let mut segments = Vec::with_capacity(parts.len());
        let mut names: Vec<&str> = Vec::new();
        let mut seen_optional = false;

        for (index, part) in parts.iter().enumerate() {
            if part.is_empty() {
                return Err(invalid("empty segment"));
            }

            let (segment, name) = if let Some(name) = part.strip_prefix(':') {
                if let Some(name) = name.strip_suffix('?') {
                    (Segment::OptionalParam(name.to_string()), Some(name))
                } else {
                    (Segment::Param(name.to_string()), Some(name))
                }
            } else if let Some(name) = part.strip_prefix('*') {
                if index + 1 != parts.len() {
                    return Err(invalid("splat must be the last segment"));
                }
                (Segment::Splat(name.to_string()), Some(name))
            } else {
                (Segment::Literal((*part).to_string()), None)
            };

            if let Some(name) = name {
                if !valid_name(name) {
                    return Err(invalid("parameter names must be non-empty [A-Za-z0-9_]"));
                }
                if names.contains(&name) {
                    return Err(invalid("duplicate parameter name"));
                }
                names.push(name);
            }

            match segment {
                Segment::OptionalParam(_) => seen_optional = true,
                Segment::Splat(_) => {}
                _ if seen_optional => {
                    return Err(invalid("required segment after optional parameter"));
                }
                _ => {}
            }

            segments.push(segment);
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// The pattern text this was compiled from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Matches `path` against the pattern, returning the captured parameters.
    ///
    /// ```rust
    /// use synapse::routing::RoutePattern;
    ///
    /// let pattern = RoutePattern::parse("/:workspaceId/search")?;
    /// let params = pattern.matches("/w1/search").expect("matches");
    /// assert_eq!(params["workspaceId"], "w1");
    /// assert!(pattern.matches("/w1/settings").is_none());
    /// # Ok::<(), synapse::SynapseError>(())
    /// ```
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let parts = split_path(path)?;
        let mut params = PathParams::new();
        let mut cursor = 0;

        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => {
                    let part = parts.get(cursor)?;
                    if !part.eq_ignore_ascii_case(literal) {
                        return None;
                    }
                    cursor += 1;
                }
                Segment::Param(name) => {
                    let part = parts.get(cursor).filter(|p| !p.is_empty())?;
                    params.insert(name.clone(), decode(part));
                    cursor += 1;
                }
                Segment::OptionalParam(name) => {
                    if let Some(part) = parts.get(cursor).filter(|p| !p.is_empty()) {
                        params.insert(name.clone(), decode(part));
                        cursor += 1;
                    }
                }
                Segment::Splat(name) => {
                    let rest = &parts[cursor.min(parts.len())..];
                    if !rest.is_empty() {
                        let joined: Vec<String> = rest.iter().map(|p| decode(p)).collect();
                        params.insert(name.clone(), joined.join("/"));
                    }
                    cursor = parts.len();
                }
            }
        }

        (cursor == parts.len()).then_some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> PathParams {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn root_matches_only_root() {
        let root = RoutePattern::parse("/").unwrap();
        assert_eq!(root.matches("/"), Some(PathParams::new()));
        assert_eq!(root.matches("/a"), None);
    }

    #[test]
    fn extracts_named_parameters() {
        let pattern = RoutePattern::parse("/:workspaceId/search").unwrap();
        assert_eq!(pattern.matches("/w1/search"), Some(params(&[("workspaceId", "w1")])));
        assert_eq!(pattern.matches("/w1/search/"), Some(params(&[("workspaceId", "w1")])));
        assert_eq!(pattern.matches("/w1"), None);
        assert_eq!(pattern.matches("//search"), None);
        assert_eq!(pattern.matches("/w1/search/extra"), None);
    }

    #[test]
    fn decodes_parameters_and_ignores_literal_case() {
        let pattern = RoutePattern::parse("/Users/:name").unwrap();
        assert_eq!(pattern.matches("/users/Ada%20Lovelace"), Some(params(&[("name", "Ada Lovelace")])));
    }

    #[test]
    fn optional_and_splat_segments() {
        let optional = RoutePattern::parse("/docs/:page?").unwrap();
        assert_eq!(optional.matches("/docs"), Some(PathParams::new()));
        assert_eq!(optional.matches("/docs/intro"), Some(params(&[("page", "intro")])));

        let splat = RoutePattern::parse("/files/*path").unwrap();
        assert_eq!(splat.matches("/files/a/b.txt"), Some(params(&[("path", "a/b.txt")])));
        assert_eq!(splat.matches("/files"), Some(PathParams::new()));
    }

    #[test]
    fn rejects_malformed_patterns() {
        for bad in ["search", "/a//b", "/:", "/:a/:a", "/*rest/x", "/:a?/b", "/:bad-name"] {
            assert!(
                matches!(RoutePattern::parse(bad), Err(SynapseError::InvalidRoutePattern { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn relative_paths_never_match() {
        let pattern = RoutePattern::parse("/a").unwrap();
        assert_eq!(pattern.matches("a"), None);
    }
}
