//! Uniqueness tags
//!
//! The server under test is shared mutable state. Every fixture carries a tag
//! derived from the wall clock, a process-wide counter and a random suffix, and
//! searches scoped by that tag only see the fixtures of the scenario that
//! minted it.

use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniquenessTag(String);

impl UniquenessTag {
    /// Mint a new tag. Lowercase alphanumerics only, so the tag is safe in
    /// identifiers, names, codes and URLs alike.
    pub fn new() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let salt: u16 = rand::thread_rng().gen();
        Self(format!("{:x}{:x}{:04x}", millis, seq, salt))
    }

    /// Use an explicit suffix instead of a generated one
    pub fn from_suffix(suffix: impl Into<String>) -> Self {
        Self(suffix.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `"<prefix>-<tag>"`, e.g. `TestFamily-18c2f…`
    pub fn label(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.0)
    }

    /// Derive a tag for a sub-group of fixtures within one scenario
    pub fn child(&self, name: &str) -> Self {
        Self(format!("{}{}", self.0, name.to_ascii_lowercase()))
    }
}

impl Default for UniquenessTag {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UniquenessTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tags_are_distinct() {
        let tags: HashSet<UniquenessTag> = (0..1000).map(|_| UniquenessTag::new()).collect();
        assert_eq!(tags.len(), 1000);
    }

    #[test]
    fn test_tag_charset() {
        let tag = UniquenessTag::new();
        assert!(tag
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_label_and_child() {
        let tag = UniquenessTag::from_suffix("abc");
        assert_eq!(tag.label("TestFamily"), "TestFamily-abc");
        assert_eq!(tag.child("Other").as_str(), "abcother");
        assert_eq!(tag.to_string(), "abc");
    }
}
