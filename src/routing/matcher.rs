//! Request pattern matching.
//!
//! # Responsibilities
//! - Compile a handler's declared pattern once at construction
//! - Test it against host OR path (either matching is sufficient)
//!
//! # Design Decisions
//! - Regular expressions (`regex` crate): linear-time matching, no backtracking
//! - Host is matched in normalised form (lowercase, no port)
//! - Path includes the query string

use regex::Regex;

/// A compiled match pattern over host and/or path.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern from a regular expression string.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(source)?,
        })
    }

    /// True if the pattern matches the host or the path.
    pub fn matches(&self, host: &str, path: &str) -> bool {
        self.regex.is_match(host) || self.regex.is_match(path)
    }

    /// Source text of the pattern.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
