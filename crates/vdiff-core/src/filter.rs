//! Conjunctive regex filter over relative artifact paths.

use regex::Regex;

use crate::error::{CoreError, CoreResult};

/// Compiled path predicate. A path is accepted when it matches every
/// pattern; an empty filter accepts everything.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    patterns: Vec<Regex>,
}

impl PathFilter {
    /// Compile zero or more patterns. Matching is an unanchored search.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPattern`] for the first malformed pattern.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> CoreResult<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).map_err(|source| CoreError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Whether `path` passes every pattern.
    #[must_use]
    pub fn accepts(&self, path: &str) -> bool {
        self.patterns.iter().all(|pattern| pattern.is_match(path))
    }

    /// Whether the filter has no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
