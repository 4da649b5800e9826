//! Ignore patterns for framework-generated class names.
//!
//! A pattern without `*` is an exact name. A pattern with wildcards matches
//! when every literal segment appears in the candidate in left-to-right
//! order, not necessarily contiguously. `"*"` alone matches everything.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IgnoreSet {
    patterns: Vec<String>,
}

impl IgnoreSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty())
                .collect(),
        }
    }

    pub fn extend<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.extend(
            patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.is_empty()),
        );
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns `true` if any pattern suppresses `name`.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| matches_pattern(p, name))
    }
}

/// Matches one pattern against one candidate name.
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == name;
    }

    let mut cursor = 0usize;
    for segment in pattern.split('*').filter(|s| !s.is_empty()) {
        match name[cursor..].find(segment) {
            Some(pos) => cursor += pos + segment.len(),
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_pattern() {
        assert!(matches_pattern("active", "active"));
        assert!(!matches_pattern("active", "inactive"));
    }

    #[test]
    fn test_prefix_wildcard() {
        assert!(matches_pattern("btn-*", "btn-primary"));
        assert!(!matches_pattern("btn-*", "button"));
    }

    #[test]
    fn test_segments_need_not_be_contiguous() {
        assert!(matches_pattern("col-*", "col-md-6"));
        assert!(matches_pattern("col*6", "col-md-6"));
        // `btn-` is found inside the name even though the name does not start with it.
        assert!(matches_pattern("btn-*", "my-btn-large"));
    }

    #[test]
    fn test_segments_respect_order() {
        assert!(!matches_pattern("md*col", "col-md-6"));
    }

    #[test]
    fn test_bare_wildcard_matches_everything() {
        assert!(matches_pattern("*", "anything"));
        assert!(matches_pattern("**", ""));
    }

    #[test]
    fn test_ignore_set() {
        let set = IgnoreSet::new(["btn-*", "", "active"]);
        assert_eq!(set.patterns().len(), 2);
        assert!(set.is_ignored("btn-primary"));
        assert!(set.is_ignored("active"));
        assert!(!set.is_ignored("card"));
        assert!(!IgnoreSet::default().is_ignored("card"));
    }
}
