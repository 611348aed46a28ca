//! Minimal host-suffix helpers.
//!
//! The matching pipeline only ever needs "the parent domain of this host"
//! to walk a suffix chain one label at a time - it does not need a full
//! Public Suffix List table (no `$domain=` rule or `||host^` anchor cares
//! about the true eTLD+1 boundary, only about literal label suffixes). A
//! full PSL table is the kind of thing a browser integration layer would
//! own and is out of scope for the core per the purpose/scope section.

/// Strip the left-most label from `host`, e.g. `"sub.example.com"` ->
/// `Some("example.com")`, `"com"` -> `None`.
#[inline]
pub fn get_parent_domain(host: &str) -> Option<&str> {
    host.find('.').map(|idx| &host[idx + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_parent_domain() {
        assert_eq!(get_parent_domain("sub.example.com"), Some("example.com"));
        assert_eq!(get_parent_domain("example.com"), Some("com"));
        assert_eq!(get_parent_domain("com"), None);
        assert_eq!(get_parent_domain(""), None);
    }
}
