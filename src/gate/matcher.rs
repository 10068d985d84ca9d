//! Public allow-list matching.
//!
//! # Responsibilities
//! - Match exact paths, path segments, and raw prefixes
//! - Combine patterns with OR semantics
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - `/foo` matches `/foo` and `/foo/...`, never `/foobar`
//! - `/foo*` is a raw prefix match for asset trees
//! - Paths with `.` or `..` segments are never public, including `%2e` forms
//! - No regex to guarantee O(n) matching

/// Trait for matching a request path.
pub trait PathMatcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;
}

/// Matches one path exactly.
#[derive(Debug, Clone)]
pub struct ExactPath {
    path: String,
}

impl ExactPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl PathMatcher for ExactPath {
    fn matches(&self, path: &str) -> bool {
        path == self.path
    }
}

/// Matches a path and everything below it on a segment boundary.
#[derive(Debug, Clone)]
pub struct SegmentPrefix {
    prefix: String,
}

impl SegmentPrefix {
    /// Trailing slashes are dropped so `/docs/` and `/docs` behave the same.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }
}

impl PathMatcher for SegmentPrefix {
    fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(&self.prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

/// Matches any path starting with the prefix.
#[derive(Debug, Clone)]
pub struct WildcardPrefix {
    prefix: String,
}

impl WildcardPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl PathMatcher for WildcardPrefix {
    fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

/// Compiled public allow-list. A path is public if any matcher accepts it.
#[derive(Debug, Default)]
pub struct AllowList {
    matchers: Vec<Box<dyn PathMatcher>>,
}

impl AllowList {
    /// Compile configured patterns.
    pub fn from_patterns(patterns: &[String]) -> Self {
        let matchers = patterns
            .iter()
            .map(|p| -> Box<dyn PathMatcher> {
                if let Some(prefix) = p.strip_suffix('*') {
                    Box::new(WildcardPrefix::new(prefix))
                } else if p.trim_end_matches('/').is_empty() {
                    // "/" alone would otherwise make every path public
                    Box::new(ExactPath::new("/"))
                } else {
                    Box::new(SegmentPrefix::new(p.as_str()))
                }
            })
            .collect();
        Self { matchers }
    }

    pub fn is_public(&self, path: &str) -> bool {
        if has_dot_segment(path) {
            return false;
        }
        self.matchers.iter().any(|m| m.matches(path))
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(|segment| {
        // Upstreams may decode %2e before resolving dot segments
        let segment = segment.to_ascii_lowercase().replace("%2e", ".");
        segment == "." || segment == ".."
    })
}
