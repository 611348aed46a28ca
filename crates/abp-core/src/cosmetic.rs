//! Element-hiding selector indexes (`##`/`#@#`).
//!
//! Selectors are pre-aggregated per domain at parse time into a single
//! comma-joined string, so a lookup is one hash probe plus a suffix walk
//! rather than a per-rule scan.

use std::collections::{BTreeSet, HashMap};

use crate::suffixes::domain_suffixes;

#[derive(Debug, Clone, Default)]
pub struct CosmeticIndex {
    by_domain: HashMap<String, Vec<String>>,
    exception_by_domain: HashMap<String, Vec<String>>,
    /// The domain-less `##selector` set. A later domain-less `#@#selector`
    /// retracts a matching entry from this set rather than being recorded
    /// as an exception in its own right (see `add_exception`).
    generic: BTreeSet<String>,
}

impl CosmeticIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a `##selector` rule. `domain_list` is the rule's
    /// pipe-free, comma-separated domain prefix (`a.com,b.com`); `None`
    /// routes the selector into the generic `simpleCosmeticFilters` set.
    pub fn add_hiding(&mut self, domain_list: Option<&str>, selector: &str) {
        match domain_list {
            None => {
                self.generic.insert(selector.to_string());
            }
            Some(list) => {
                for domain in list.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                    self.by_domain
                        .entry(domain.to_ascii_lowercase())
                        .or_default()
                        .push(selector.to_string());
                }
            }
        }
    }

    /// Register a `#@#selector` rule. A domain-less exception retracts the
    /// selector from the generic set; a domain-scoped exception is recorded
    /// in the exception map for that domain.
    pub fn add_exception(&mut self, domain_list: Option<&str>, selector: &str) {
        match domain_list {
            None => {
                self.generic.remove(selector);
            }
            Some(list) => {
                for domain in list.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                    self.exception_by_domain
                        .entry(domain.to_ascii_lowercase())
                        .or_default()
                        .push(selector.to_string());
                }
            }
        }
    }

    /// Walk `host`'s parent-domain chain (host itself first), returning the
    /// first domain-keyed hit, or the generic set joined with `,` if no
    /// domain-specific entry matched and the generic set is non-empty.
    pub fn get_selectors(&self, host: &str) -> Option<String> {
        for suffix in domain_suffixes(host) {
            if let Some(selectors) = self.by_domain.get(&suffix.to_ascii_lowercase()) {
                return Some(selectors.join(","));
            }
        }
        if self.generic.is_empty() {
            None
        } else {
            Some(self.generic.iter().cloned().collect::<Vec<_>>().join(","))
        }
    }

    /// Symmetric over the exception map; no generic fallback, since
    /// exceptions are inherently about overriding a specific domain's
    /// hiding rules.
    pub fn get_exception_selectors(&self, host: &str) -> Option<String> {
        for suffix in domain_suffixes(host) {
            if let Some(selectors) = self.exception_by_domain.get(&suffix.to_ascii_lowercase()) {
                return Some(selectors.join(","));
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.by_domain.is_empty() && self.exception_by_domain.is_empty() && self.generic.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_domain.clear();
        self.exception_by_domain.clear();
        self.generic.clear();
    }

    /// `(domain, joined selectors)` pairs for serialization.
    pub fn domain_map_joined(&self) -> Vec<(String, String)> {
        self.by_domain
            .iter()
            .map(|(d, sels)| (d.clone(), sels.join(",")))
            .collect()
    }

    pub fn exception_domain_map_joined(&self) -> Vec<(String, String)> {
        self.exception_by_domain
            .iter()
            .map(|(d, sels)| (d.clone(), sels.join(",")))
            .collect()
    }

    pub fn generic_selectors(&self) -> Vec<String> {
        self.generic.iter().cloned().collect()
    }

    /// Rebuild from pre-aggregated `(domain, joined_selectors)` pairs, as
    /// produced by a snapshot load. Each joined string is stored whole so
    /// `get_selectors` returns the exact bytes that were serialized.
    pub fn load_domain_map(&mut self, entries: impl Iterator<Item = (String, String)>) {
        for (domain, joined) in entries {
            self.by_domain.entry(domain).or_default().push(joined);
        }
    }

    pub fn load_exception_domain_map(&mut self, entries: impl Iterator<Item = (String, String)>) {
        for (domain, joined) in entries {
            self.exception_by_domain.entry(domain).or_default().push(joined);
        }
    }

    pub fn load_generic(&mut self, selectors: impl Iterator<Item = String>) {
        self.generic.extend(selectors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_scoped_lookup_walks_suffixes() {
        let mut idx = CosmeticIndex::new();
        idx.add_hiding(Some("example.com"), ".ad");
        assert_eq!(idx.get_selectors("sub.example.com"), Some(".ad".to_string()));
        assert_eq!(idx.get_selectors("other.com"), None);
    }

    #[test]
    fn generic_fallback_when_no_domain_hit() {
        let mut idx = CosmeticIndex::new();
        idx.add_hiding(None, ".banner");
        assert_eq!(idx.get_selectors("anything.com"), Some(".banner".to_string()));
    }

    #[test]
    fn domain_specific_entry_wins_over_generic() {
        let mut idx = CosmeticIndex::new();
        idx.add_hiding(None, ".banner");
        idx.add_hiding(Some("example.com"), ".ad");
        assert_eq!(idx.get_selectors("example.com"), Some(".ad".to_string()));
        assert_eq!(idx.get_selectors("other.com"), Some(".banner".to_string()));
    }

    #[test]
    fn domain_less_exception_retracts_generic_selector() {
        let mut idx = CosmeticIndex::new();
        idx.add_hiding(None, ".banner");
        idx.add_exception(None, ".banner");
        assert_eq!(idx.get_selectors("anything.com"), None);
    }

    #[test]
    fn domain_scoped_exception_is_independent_of_generic() {
        let mut idx = CosmeticIndex::new();
        idx.add_hiding(None, ".banner");
        idx.add_exception(Some("example.com"), ".banner");
        assert_eq!(idx.get_selectors("anything.com"), Some(".banner".to_string()));
        assert_eq!(
            idx.get_exception_selectors("example.com"),
            Some(".banner".to_string())
        );
        assert_eq!(idx.get_exception_selectors("other.com"), None);
    }
}
