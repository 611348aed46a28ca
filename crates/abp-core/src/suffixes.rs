//! Domain-suffix walking shared by the matcher's no-fingerprint domain
//! gates, the host-anchored hash-set probe, and cosmetic lookup.
//!
//! "Check the host, then each parent domain" is the one contract every one
//! of those call sites needs; none of them care where the registrable
//! domain actually ends; they only care if the full requester domain chain
//! is considered.

use crate::psl::get_parent_domain;

/// Yield `host`, then each successive parent domain, most specific first,
/// down to (and including) the single-label root.
pub fn domain_suffixes(host: &str) -> impl Iterator<Item = &str> {
    DomainSuffixes { current: Some(host) }
}

struct DomainSuffixes<'a> {
    current: Option<&'a str>,
}

impl<'a> Iterator for DomainSuffixes<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let current = self.current?;
        self.current = get_parent_domain(current);
        Some(current)
    }
}

/// Does any parent-domain suffix of `domain` (including `domain` itself)
/// appear in `set`? `set` is expected to hold lower-cased domain strings.
pub fn any_suffix_matches(set: &std::collections::HashSet<String>, domain: &str) -> bool {
    domain_suffixes(domain).any(|suffix| set.contains(&suffix.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_full_chain() {
        let chain: Vec<&str> = domain_suffixes("a.b.c.com").collect();
        assert_eq!(chain, vec!["a.b.c.com", "b.c.com", "c.com", "com"]);
    }

    #[test]
    fn single_label_yields_itself_only() {
        let chain: Vec<&str> = domain_suffixes("localhost").collect();
        assert_eq!(chain, vec!["localhost"]);
    }
}
