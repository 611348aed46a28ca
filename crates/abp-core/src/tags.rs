//! Runtime tag registry gating `$tag=` rules.
//!
//! A rule carrying a tag is inert until that tag is explicitly enabled on
//! the index it was loaded into. Tags are not part of the snapshot - they
//! are caller-controlled runtime state, the same way a browser extension
//! would flip a feature flag on or off without recompiling its filter set.

use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    enabled: HashSet<String>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self, tag: &str) {
        self.enabled.insert(tag.to_string());
    }

    pub fn disable(&mut self, tag: &str) {
        self.enabled.remove(tag);
    }

    pub fn is_enabled(&self, tag: &str) -> bool {
        self.enabled.contains(tag)
    }

    pub fn clear(&mut self) {
        self.enabled.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_by_default() {
        let tags = TagRegistry::new();
        assert!(!tags.is_enabled("social"));
    }

    #[test]
    fn enable_disable_round_trip() {
        let mut tags = TagRegistry::new();
        tags.enable("social");
        assert!(tags.is_enabled("social"));
        tags.disable("social");
        assert!(!tags.is_enabled("social"));
    }
}
