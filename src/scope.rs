//! Dotted-path scope patterns.
//!
//! A scope decides which module paths get template rewriting. Patterns are
//! matched segment-wise against a path split on `.`:
//!
//! | Segment | Matches                               |
//! |---------|---------------------------------------|
//! | `name`  | exactly `name` (case-sensitive)       |
//! | `*`     | exactly one segment                   |
//! | `**`    | zero or more segments                 |
//!
//! Matching is anchored at both ends, so `mod.*.foo` rejects
//! `mod.bar.boo.foo` while `mod.**.foo` accepts it.

use std::str::FromStr;

use crate::error::{SqlbindError, SqlbindResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Literal(String),
    One,
    Any,
}

/// A validated scope pattern such as `app.**.queries`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePattern {
    source: String,
    segments: Vec<PatternSegment>,
}

impl ScopePattern {
    /// Parse and validate a pattern.
    ///
    /// Wildcards must occupy a whole segment; `foo*` or `a**b` are rejected
    /// here rather than silently treated as literals at match time.
    pub fn parse(pattern: &str) -> SqlbindResult<Self> {
        if pattern.is_empty() {
            return Err(SqlbindError::pattern(pattern, "pattern is empty"));
        }

        let segments = pattern
            .split('.')
            .map(|seg| match seg {
                "" => Err(SqlbindError::pattern(pattern, "empty segment")),
                "*" => Ok(PatternSegment::One),
                "**" => Ok(PatternSegment::Any),
                s if s.contains('*') => Err(SqlbindError::pattern(
                    pattern,
                    "wildcards must occupy a whole segment",
                )),
                s => Ok(PatternSegment::Literal(s.to_string())),
            })
            .collect::<SqlbindResult<Vec<_>>>()?;

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check whether `path` falls inside this pattern.
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = if path.is_empty() {
            Vec::new()
        } else {
            path.split('.').collect()
        };
        match_segments(&self.segments, &parts)
    }
}

impl FromStr for ScopePattern {
    type Err = SqlbindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ScopePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Anchored matching with a single resume point.
///
/// `*` behaves like a one-segment wildcard and `**` like a variable-length
/// one; on mismatch the most recent `**` absorbs one more segment. Every step
/// advances either the path or the resume point, so this terminates in
/// O(pattern * path).
fn match_segments(pattern: &[PatternSegment], path: &[&str]) -> bool {
    let (mut p, mut s) = (0, 0);
    let mut resume: Option<(usize, usize)> = None;

    while s < path.len() {
        match pattern.get(p) {
            Some(PatternSegment::Any) => {
                resume = Some((p, s));
                p += 1;
                continue;
            }
            Some(PatternSegment::One) => {
                p += 1;
                s += 1;
                continue;
            }
            Some(PatternSegment::Literal(lit)) if lit == path[s] => {
                p += 1;
                s += 1;
                continue;
            }
            _ => {}
        }

        match resume {
            Some((any_at, absorbed_from)) => {
                p = any_at + 1;
                s = absorbed_from + 1;
                resume = Some((any_at, s));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|seg| *seg == PatternSegment::Any)
}

/// A set of scope patterns owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct ScopeMatcher {
    patterns: Vec<ScopePattern>,
}

impl ScopeMatcher {
    /// Build a matcher, validating every pattern up front.
    pub fn new<I, S>(patterns: I) -> SqlbindResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        patterns
            .into_iter()
            .map(|p| ScopePattern::parse(p.as_ref()))
            .collect::<SqlbindResult<Vec<_>>>()
            .map(Self::from_patterns)
    }

    pub fn from_patterns(patterns: Vec<ScopePattern>) -> Self {
        Self { patterns }
    }

    /// Whether any pattern enables `path`.
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    pub fn patterns(&self) -> &[ScopePattern] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Match a single path against a single pattern string.
///
/// Convenience for one-off checks; an invalid pattern matches nothing.
pub fn match_path(path: &str, pattern: &str) -> bool {
    ScopePattern::parse(pattern)
        .map(|p| p.matches(path))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_wildcard_is_one_segment() {
        assert!(match_path("mod.bar.foo", "mod.*.foo"));
        assert!(!match_path("mod.bar.boo.foo", "mod.*.foo"));
        assert!(match_path("tests.test_sqlbind", "tests.*"));
        assert!(!match_path("tests.pkg.test_sqlbind", "tests.*"));
    }

    #[test]
    fn test_trailing_double_wildcard() {
        assert!(match_path("mod.bar.boo.foo", "mod.**"));
        assert!(match_path("mod", "mod.**"));
    }

    #[test]
    fn test_double_wildcard_anchors_suffix() {
        assert!(match_path("mod.bar.foo", "mod.**.foo"));
        assert!(match_path("mod.bar.boo.foo", "mod.**.foo"));
        assert!(match_path("mod.foo", "mod.**.foo"));
        assert!(!match_path("mod.bar.boo", "mod.**.foo"));
        assert!(!match_path("mod.foo.bar", "mod.**.foo"));
    }

    #[test]
    fn test_bare_double_wildcard_matches_everything() {
        assert!(match_path("mod.bar.foo", "**"));
        assert!(match_path("x", "**"));
        assert!(match_path("", "**"));
    }

    #[test]
    fn test_case_sensitive_and_anchored() {
        assert!(!match_path("Mod.bar", "mod.bar"));
        assert!(!match_path("mod.bar.baz", "mod.bar"));
        assert!(!match_path("x.mod.bar", "mod.bar"));
    }

    #[test]
    fn test_mixed_wildcards() {
        assert!(match_path("a.x.y.z.b", "a.**.*.b"));
        assert!(!match_path("a.b", "a.**.*.b"));
        assert!(match_path("a.x.b.c.b", "a.**.b"));
    }

    #[test]
    fn test_invalid_patterns_rejected_eagerly() {
        assert!(ScopePattern::parse("").is_err());
        assert!(ScopePattern::parse("mod..foo").is_err());
        assert!(ScopePattern::parse("mod.fo*").is_err());
        assert!(ScopePattern::parse("mod.a**b").is_err());

        let err = ScopeMatcher::new(["tests.*", "bad.x*"]).unwrap_err();
        assert!(matches!(err, SqlbindError::InvalidPattern { .. }));
    }

    #[test]
    fn test_matcher_any_pattern() {
        let matcher = ScopeMatcher::new(["tests.*", "app.**.queries"]).unwrap();
        assert!(matcher.matches("tests.users"));
        assert!(matcher.matches("app.billing.v2.queries"));
        assert!(!matcher.matches("app.billing.models"));
        assert!(!ScopeMatcher::default().matches("tests.users"));
    }

    #[test]
    fn test_matcher_from_parsed_patterns() {
        let patterns: Vec<ScopePattern> = ["jobs.*", "cli"]
            .iter()
            .map(|p| p.parse().unwrap())
            .collect();
        let matcher = ScopeMatcher::from_patterns(patterns);
        assert_eq!(matcher.patterns().len(), 2);
        assert!(matcher.matches("jobs.nightly"));
        assert!(matcher.matches("cli"));
        assert!(!matcher.matches("cli.render"));
    }
}
