//! Route matching primitives.
//!
//! # Responsibilities
//! - Match a path prefix on segment boundaries (case-sensitive)
//! - Match the request method against an allowed set
//!
//! # Design Decisions
//! - `/crawler` matches `/crawler` and `/crawler/x`, never `/crawlerx`
//! - A trailing `/*` or `/` in the configured path is ignored
//! - Empty method set = always matches (wildcard)
//! - Paths with `.`/`..` segments (plain or percent-encoded) never match, so a
//!   suffix cannot climb out of a route's target path

use http::Method;

/// Path prefix matched on `/` boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefix {
    /// Normalized prefix without trailing slash; empty for the root.
    prefix: String,
}

impl PathPrefix {
    pub fn new(path: &str) -> Self {
        let trimmed = path.trim_end_matches('*').trim_end_matches('/');
        Self {
            prefix: trimmed.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        if self.prefix.is_empty() {
            "/"
        } else {
            &self.prefix
        }
    }

    /// Number of bytes matched, used to rank competing routes.
    pub fn len(&self) -> usize {
        self.prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }

    /// Returns the remainder of `path` after the prefix when it matches.
    ///
    /// The remainder is either empty or starts with `/`.
    pub fn strip<'p>(&self, path: &'p str) -> Option<&'p str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

/// True when any segment of `path` resolves to `.` or `..` under URL parsing.
///
/// A backslash counts as a separator and `%2e` as a dot, as they do for http(s) URLs.
pub fn has_dot_segments(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let segment = segment
            .replace(['\t', '\n', '\r'], "")
            .to_ascii_lowercase()
            .replace("%2e", ".");
        segment == "." || segment == ".."
    })
}

/// Allowed methods of a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet {
    methods: Vec<Method>,
}

impl MethodSet {
    pub fn new(methods: Vec<Method>) -> Self {
        Self { methods }
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }
}
