//! Prefix extraction and group keys.
//!
//! A prefix is the leading part of a display name up to (excluding) its first
//! hyphen or underscore: `foo-bar` and `foo_baz` share the prefix `foo`,
//! while `foobar` has none. An empty prefix means "no grouping applies".

use std::fmt;

use regex::Regex;

use crate::error::{GroupingError, Result};

/// The default prefix pattern: one or more non-delimiter characters followed
/// by the first hyphen or underscore.
pub const DEFAULT_PREFIX_PATTERN: &str = r"^([^-_]+)[-_]";

/// Suffix appended to the textual form of a starred section's group key.
///
/// Prefixes never contain `_`, so the suffix cannot collide with a prefix.
pub const STARRED_SUFFIX: &str = "_starred";

/// The identity of a synthetic group: a prefix qualified by section.
///
/// Two items with the same prefix in different sections (starred vs.
/// regular) have different keys and are never grouped together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    prefix: String,
    starred: bool,
}

impl GroupKey {
    /// Create a key from a prefix and the section flag.
    pub fn new(prefix: impl Into<String>, starred: bool) -> Self {
        Self {
            prefix: prefix.into(),
            starred,
        }
    }

    /// The textual prefix (the header label).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether the key belongs to the starred section.
    pub fn is_starred(&self) -> bool {
        self.starred
    }

    /// `true` for the "no grouping applies" sentinel.
    pub fn is_ungrouped(&self) -> bool {
        self.prefix.is_empty()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix)?;
        if self.starred {
            f.write_str(STARRED_SUFFIX)?;
        }
        Ok(())
    }
}

/// Compiled prefix pattern.
///
/// The pattern's first capture group (or the whole match, if it has none) is
/// the prefix; everything after the whole match is the remainder shown for
/// grouped members.
#[derive(Debug, Clone)]
pub struct PrefixMatcher {
    pattern: Regex,
}

impl PrefixMatcher {
    /// Compile a prefix pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| GroupingError::invalid_config("prefix_pattern", e.to_string()))?;
        Ok(Self { pattern })
    }

    /// Compile [`DEFAULT_PREFIX_PATTERN`].
    pub fn with_default_pattern() -> Result<Self> {
        Self::new(DEFAULT_PREFIX_PATTERN)
    }

    /// The prefix of `name`, or `""` if the pattern does not match.
    pub fn prefix_of<'a>(&self, name: &'a str) -> &'a str {
        self.pattern
            .captures(name)
            .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
            .map_or("", |m| m.as_str())
    }

    /// `name` with its prefix and delimiter removed.
    ///
    /// Names without a prefix are returned unchanged.
    pub fn strip<'a>(&self, name: &'a str) -> &'a str {
        match self.pattern.find(name) {
            Some(m) => &name[m.end()..],
            None => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> PrefixMatcher {
        PrefixMatcher::with_default_pattern().unwrap()
    }

    #[test]
    fn test_prefix_up_to_first_delimiter() {
        let m = matcher();
        assert_eq!(m.prefix_of("foo-a"), "foo");
        assert_eq!(m.prefix_of("foo_b"), "foo");
        assert_eq!(m.prefix_of("team-infra-alerts"), "team");
        assert_eq!(m.prefix_of("ops_on-call"), "ops");
    }

    #[test]
    fn test_no_delimiter_is_ungrouped() {
        let m = matcher();
        assert_eq!(m.prefix_of("bar"), "");
        assert_eq!(m.prefix_of(""), "");
        // A leading delimiter leaves nothing to group on.
        assert_eq!(m.prefix_of("-foo"), "");
        assert_eq!(m.prefix_of("_foo"), "");
    }

    #[test]
    fn test_strip_removes_prefix_and_delimiter() {
        let m = matcher();
        assert_eq!(m.strip("foo-a"), "a");
        assert_eq!(m.strip("team-infra-alerts"), "infra-alerts");
        assert_eq!(m.strip("foo-"), "");
        assert_eq!(m.strip("general"), "general");
        assert_eq!(m.strip("foo (root)"), "foo (root)");
    }

    #[test]
    fn test_custom_pattern_without_group_uses_whole_match() {
        let m = PrefixMatcher::new(r"^[a-z]+\.").unwrap();
        assert_eq!(m.prefix_of("proj.web"), "proj.");
        assert_eq!(m.strip("proj.web"), "web");
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = PrefixMatcher::new("(unclosed").unwrap_err();
        assert!(matches!(
            err,
            GroupingError::InvalidConfig {
                field: "prefix_pattern",
                ..
            }
        ));
    }

    #[test]
    fn test_group_key_display_and_isolation() {
        let regular = GroupKey::new("foo", false);
        let starred = GroupKey::new("foo", true);

        assert_eq!(regular.to_string(), "foo");
        assert_eq!(starred.to_string(), "foo_starred");
        assert_ne!(regular, starred);
        assert!(GroupKey::new("", true).is_ungrouped());
        assert!(!starred.is_ungrouped());
    }
}
