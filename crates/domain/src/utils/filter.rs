//! Batch selection filters
//!
//! Callers restrict a metrics run to a subset of sources and weeks. String
//! selection is a small tagged variant instead of runtime type inspection:
//! a single wildcard pattern, a list of patterns, or an arbitrary
//! predicate, dispatched through one `matches` method.

use std::sync::Arc;

use regex::Regex;

use crate::errors::{Result, SlotwatchError};
use crate::types::snapshot::IsoWeek;

type PredicateFn = dyn Fn(&str) -> bool + Send + Sync;

/// A compiled wildcard pattern (`*` any run, `?` any one character,
/// `[...]`/`[!...]` character classes), matched against the whole string,
/// case-sensitive.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    raw: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a wildcard pattern.
    pub fn compile(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&translate(pattern))
            .map_err(|_| SlotwatchError::InvalidFilter(pattern.to_string()))?;
        Ok(Self { raw: pattern.to_string(), regex })
    }

    /// Whether the whole value matches the pattern.
    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    /// The original pattern text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Translate a wildcard pattern into an anchored regular expression.
fn translate(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    out.push('^');
                }
                for c in chars.by_ref() {
                    out.push(c);
                    if c == ']' {
                        break;
                    }
                }
            }
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }

    out.push('$');
    out
}

/// A string selection rule: one pattern, any of several patterns, or a
/// caller-supplied predicate.
#[derive(Clone)]
pub enum StringFilter {
    /// Single wildcard pattern.
    Glob(GlobPattern),
    /// Any-of list of wildcard patterns.
    AnyOf(Vec<GlobPattern>),
    /// Arbitrary predicate.
    Predicate(Arc<PredicateFn>),
}

impl StringFilter {
    /// Filter matching a single wildcard pattern.
    pub fn glob(pattern: &str) -> Result<Self> {
        Ok(Self::Glob(GlobPattern::compile(pattern)?))
    }

    /// Filter matching any of the given wildcard patterns.
    pub fn any_of<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| GlobPattern::compile(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::AnyOf(patterns))
    }

    /// Filter delegating to a predicate.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Single dispatch point for all variants.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Glob(pattern) => pattern.matches(value),
            Self::AnyOf(patterns) => patterns.iter().any(|p| p.matches(value)),
            Self::Predicate(f) => f(value),
        }
    }
}

impl std::fmt::Debug for StringFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Glob(pattern) => f.debug_tuple("Glob").field(&pattern.as_str()).finish(),
            Self::AnyOf(patterns) => {
                let raw: Vec<&str> = patterns.iter().map(GlobPattern::as_str).collect();
                f.debug_tuple("AnyOf").field(&raw).finish()
            }
            Self::Predicate(_) => f.debug_tuple("Predicate").field(&"..").finish(),
        }
    }
}

/// Week bounds for a run, all optional and combined with AND.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WeekFilter {
    /// Exact week match.
    pub exact: Option<IsoWeek>,
    /// Strictly after this week.
    pub gt: Option<IsoWeek>,
    /// At or after this week.
    pub gte: Option<IsoWeek>,
    /// Strictly before this week.
    pub lt: Option<IsoWeek>,
    /// At or before this week.
    pub lte: Option<IsoWeek>,
}

impl WeekFilter {
    /// Whether a week satisfies every configured bound.
    pub fn matches(&self, week: IsoWeek) -> bool {
        if self.exact.is_some_and(|w| week != w) {
            return false;
        }
        if self.gt.is_some_and(|w| week <= w) {
            return false;
        }
        if self.gte.is_some_and(|w| week < w) {
            return false;
        }
        if self.lt.is_some_and(|w| week >= w) {
            return false;
        }
        if self.lte.is_some_and(|w| week > w) {
            return false;
        }
        true
    }
}
