//! The per-request match pipeline (§4.2): scheme/host extraction, a
//! per-request 2-gram bloom, the block-side bucket pipeline, and the
//! symmetric exception-side pipeline gating it.

use crate::bloom::build_request_bloom;
use crate::filter::Filter;
use crate::index::FilterIndex;
use crate::suffixes::{any_suffix_matches, domain_suffixes};
use crate::types::{FilterOption, MatchDecision, RequestContext};
use crate::url::{extract_host, extract_scheme};

/// Thin read-only handle over a [`FilterIndex`] that runs the match
/// pipeline. Holding the index by reference (rather than folding these
/// methods directly onto `FilterIndex`) keeps the bucket-scan algorithm
/// separable from the storage layout it scans.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'idx, 'a> {
    index: &'idx FilterIndex<'a>,
}

impl<'idx, 'a> Matcher<'idx, 'a> {
    pub fn new(index: &'idx FilterIndex<'a>) -> Self {
        Self { index }
    }

    /// `true` iff the request is blocked by some rule and not overridden by
    /// an exception. Uses the bloom/hash-set short-circuit wherever it is
    /// safe to (§4.2 steps 4-6).
    pub fn matches(&self, ctx: &RequestContext<'_>) -> MatchDecision {
        let Some((ctx, host)) = self.prepare(ctx) else {
            return MatchDecision::Allow;
        };
        let request_bloom = build_request_bloom(ctx.url);

        let block_hit = self.scan_block_side(&ctx, &host, &request_bloom, false).is_some();
        if !block_hit {
            return MatchDecision::Allow;
        }
        let exception_hit = self.scan_exception_side(&ctx, &host, &request_bloom, false).is_some();
        if exception_hit {
            MatchDecision::Allow
        } else {
            MatchDecision::Block
        }
    }

    /// Returns the actual matched block/exception rule handles, always
    /// linear-scanning `filters`/`exceptionFilters` rather than trusting
    /// the bloom/hash-set pre-filter to skip the scan - used by
    /// diagnostics and callers that need the rule itself, not just a bool.
    pub fn find_matching_filters(
        &self,
        ctx: &RequestContext<'_>,
    ) -> (Option<&'idx Filter<'a>>, Option<&'idx Filter<'a>>) {
        let Some((ctx, host)) = self.prepare(ctx) else {
            return (None, None);
        };
        let request_bloom = build_request_bloom(ctx.url);
        let block = self.scan_block_side(&ctx, &host, &request_bloom, true);
        let exception = self.scan_exception_side(&ctx, &host, &request_bloom, true);
        (block, exception)
    }

    /// Preparation phase (§4.2 steps 1-3): validate scheme, extract host,
    /// and fill in the party bit if the caller left both unset. Returns
    /// `None` if the URL's scheme is not one of the blockable schemes.
    fn prepare<'r>(&self, ctx: &RequestContext<'r>) -> Option<(RequestContext<'r>, String)> {
        extract_scheme(ctx.url)?;
        let host = extract_host(ctx.url)?.to_string();

        let mut request_option = ctx.request_option;
        let has_party_bits =
            request_option.intersects(FilterOption::THIRD_PARTY | FilterOption::NOT_THIRD_PARTY);
        if !has_party_bits {
            if let Some(site_domain) = ctx.site_domain {
                if is_third_party(site_domain, &host) {
                    request_option |= FilterOption::THIRD_PARTY;
                } else {
                    request_option |= FilterOption::NOT_THIRD_PARTY;
                }
            }
        }

        Some((
            RequestContext {
                url: ctx.url,
                site_domain: ctx.site_domain,
                request_option,
            },
            host,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_block_side(
        &self,
        ctx: &RequestContext<'_>,
        host: &str,
        request_bloom: &crate::bloom::BloomFilter<Vec<u8>>,
        skip_shortcut: bool,
    ) -> Option<&'idx Filter<'a>> {
        let idx = self.index;
        scan_side(
            ctx,
            host,
            request_bloom,
            &idx.tags,
            &idx.no_fingerprint_domain_only,
            &idx.no_fingerprint_domain_set,
            &idx.no_fingerprint_anti_domain_only,
            &idx.no_fingerprint_anti_domain_set,
            &idx.no_fingerprint_filters,
            &idx.host_anchored,
            &idx.block_bloom,
            &idx.filters,
            skip_shortcut,
            Some(idx),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_exception_side(
        &self,
        ctx: &RequestContext<'_>,
        host: &str,
        request_bloom: &crate::bloom::BloomFilter<Vec<u8>>,
        skip_shortcut: bool,
    ) -> Option<&'idx Filter<'a>> {
        let idx = self.index;
        scan_side(
            ctx,
            host,
            request_bloom,
            &idx.tags,
            &idx.no_fingerprint_domain_only_exception,
            &idx.no_fingerprint_domain_set_exception,
            &idx.no_fingerprint_anti_domain_only_exception,
            &idx.no_fingerprint_anti_domain_set_exception,
            &idx.no_fingerprint_exception_filters,
            &idx.host_anchored_exception,
            &idx.exception_bloom,
            &idx.exception_filters,
            skip_shortcut,
            None,
        )
    }
}

/// One side (block or exception) of the bucket-scan pipeline (§4.2). Both
/// sides share this exact shape; only which buckets are passed in differs.
#[allow(clippy::too_many_arguments)]
fn scan_side<'idx, 'a>(
    ctx: &RequestContext<'_>,
    host: &str,
    request_bloom: &crate::bloom::BloomFilter<Vec<u8>>,
    tags: &crate::tags::TagRegistry,
    domain_only: &'idx [Filter<'a>],
    domain_set: &std::collections::HashSet<String>,
    anti_domain_only: &'idx [Filter<'a>],
    anti_domain_set: &std::collections::HashSet<String>,
    no_fingerprint: &'idx [Filter<'a>],
    host_anchored: &'idx std::collections::HashMap<String, Vec<Filter<'a>>>,
    bloom: &crate::bloom::BloomFilter<Vec<u8>>,
    linear_filters: &'idx [Filter<'a>],
    skip_shortcut: bool,
    bad_fingerprint_sink: Option<&FilterIndex<'a>>,
) -> Option<&'idx Filter<'a>> {
    let site_domain = ctx.site_domain;

    // Step 1: no-fingerprint domain-only bucket, gated by suffix membership.
    if site_domain.map_or(false, |d| any_suffix_matches(domain_set, d)) {
        if let Some(f) = scan(domain_only, ctx, host, request_bloom, tags) {
            return Some(f);
        }
    }

    // Step 2: no-fingerprint anti-domain-only bucket. Load-bearing
    // asymmetry: a "miss" on every parent-domain suffix (including when
    // there is no site domain to check at all) gates the scan in, not out.
    let anti_domain_missed = match site_domain {
        Some(d) => !any_suffix_matches(anti_domain_set, d),
        None => true,
    };
    if anti_domain_missed {
        if let Some(f) = scan(anti_domain_only, ctx, host, request_bloom, tags) {
            return Some(f);
        }
    }

    // Step 3: mixed-domain-list / no-domain-list no-fingerprint bucket,
    // scanned unconditionally.
    if let Some(f) = scan(no_fingerprint, ctx, host, request_bloom, tags) {
        return Some(f);
    }

    if skip_shortcut {
        for suffix in domain_suffixes(host) {
            if let Some(bucket) = host_anchored.get(suffix) {
                if let Some(f) = scan(bucket, ctx, host, request_bloom, tags) {
                    return Some(f);
                }
            }
        }
        return scan(linear_filters, ctx, host, request_bloom, tags);
    }

    // Step 4: bloom + host-anchored hash-set gate. If both miss, the
    // request cannot match anything left in this side; bail out cheaply.
    let bloom_hit = bloom.substring_exists(ctx.url, 6);
    let mut host_anchored_hit: Option<&'idx Filter<'a>> = None;
    for suffix in domain_suffixes(host) {
        if let Some(bucket) = host_anchored.get(suffix) {
            if let Some(f) = scan(bucket, ctx, host, request_bloom, tags) {
                host_anchored_hit = Some(f);
                break;
            }
        }
    }
    if !bloom_hit && host_anchored_hit.is_none() {
        return None;
    }

    // Step 5: an actual host-anchored predicate match wins outright.
    if let Some(f) = host_anchored_hit {
        return Some(f);
    }

    // Step 6: bloom said maybe; fall back to the full linear scan. A miss
    // here is a bloom false positive, recorded for diagnostics if enabled.
    match scan(linear_filters, ctx, host, request_bloom, tags) {
        Some(f) => Some(f),
        None => {
            if let Some(idx) = bad_fingerprint_sink {
                record_bad_fingerprint(idx, ctx.url);
            }
            None
        }
    }
}

fn scan<'idx, 'a>(
    bucket: &'idx [Filter<'a>],
    ctx: &RequestContext<'_>,
    host: &str,
    request_bloom: &crate::bloom::BloomFilter<Vec<u8>>,
    tags: &crate::tags::TagRegistry,
) -> Option<&'idx Filter<'a>> {
    bucket
        .iter()
        .find(|f| f.matches(ctx, host, request_bloom, tags))
}

fn record_bad_fingerprint(index: &FilterIndex<'_>, url: &str) {
    let mut log = index.bad_fingerprints.borrow_mut();
    if !log.is_enabled() {
        return;
    }
    let bytes = url.as_bytes();
    if bytes.len() < 6 {
        return;
    }
    for window in bytes.windows(6) {
        if let Ok(candidate) = std::str::from_utf8(window) {
            log.record(url, candidate);
            break;
        }
    }
}

/// "Strip equal trailing labels until either side is empty" per §4.2 step
/// 3; if both sides still have a label left after that, they are
/// third-party to one another.
pub fn is_third_party(context_domain: &str, host: &str) -> bool {
    let mut a: Vec<&str> = context_domain.split('.').collect();
    let mut b: Vec<&str> = host.split('.').collect();
    while !a.is_empty() && !b.is_empty() && a.last() == b.last() {
        a.pop();
        b.pop();
    }
    !a.is_empty() && !b.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::FilterIndex;

    fn ctx<'a>(url: &'a str, site_domain: Option<&'a str>) -> RequestContext<'a> {
        RequestContext { url, site_domain, request_option: FilterOption::empty() }
    }

    #[test]
    fn test_is_third_party() {
        assert!(!is_third_party("example.com", "sub.example.com"));
        assert!(!is_third_party("sub.example.com", "example.com"));
        assert!(is_third_party("example.com", "evil.com"));
        assert!(!is_third_party("example.com", "example.com"));
    }

    #[test]
    fn blocks_a_simple_pattern() {
        let mut idx = FilterIndex::new();
        idx.parse("/banner-ads/\n");
        let m = Matcher::new(&idx);
        let decision = m.matches(&ctx("https://x.com/banner-ads/a.js", None));
        assert_eq!(decision, MatchDecision::Block);
    }

    #[test]
    fn exception_overrides_block() {
        let mut idx = FilterIndex::new();
        idx.parse("/banner-ads/\n@@/banner-ads/*exempt\n");
        let m = Matcher::new(&idx);
        let decision = m.matches(&ctx("https://x.com/banner-ads/exempt", None));
        assert_eq!(decision, MatchDecision::Allow);
    }

    #[test]
    fn host_anchored_rule_blocks_matching_host() {
        let mut idx = FilterIndex::new();
        idx.parse("||ads.example.com^\n");
        let m = Matcher::new(&idx);
        let decision = m.matches(&ctx("https://ads.example.com/x.js", None));
        assert_eq!(decision, MatchDecision::Block);
        let decision = m.matches(&ctx("https://other.com/x.js", None));
        assert_eq!(decision, MatchDecision::Allow);
    }

    #[test]
    fn host_anchored_exception_with_path_body_overrides_block() {
        let mut idx = FilterIndex::new();
        idx.parse("||example.com^\n@@||example.com/whitelist^\n");
        let m = Matcher::new(&idx);
        let decision = m.matches(&ctx("http://example.com/whitelist/a", Some("other.com")));
        assert_eq!(decision, MatchDecision::Allow);
        let decision = m.matches(&ctx("http://example.com/ad.js", Some("other.com")));
        assert_eq!(decision, MatchDecision::Block);
    }

    #[test]
    fn non_blockable_scheme_is_allowed() {
        let mut idx = FilterIndex::new();
        idx.parse("/banner-ads/\n");
        let m = Matcher::new(&idx);
        let decision = m.matches(&ctx("data:text/html,banner-ads", None));
        assert_eq!(decision, MatchDecision::Allow);
    }

    #[test]
    fn domain_constrained_rule_respects_site_domain() {
        let mut idx = FilterIndex::new();
        idx.parse("ads$domain=example.com\n");
        let m = Matcher::new(&idx);
        assert_eq!(
            m.matches(&ctx("https://cdn.io/ads.js", Some("example.com"))),
            MatchDecision::Block
        );
        assert_eq!(
            m.matches(&ctx("https://cdn.io/ads.js", Some("other.com"))),
            MatchDecision::Allow
        );
    }

    #[test]
    fn mixed_domain_list_blocks_only_the_allowed_subdomain() {
        let mut idx = FilterIndex::new();
        idx.parse("ads$domain=a.com|~sub.a.com\n");
        let m = Matcher::new(&idx);
        assert_eq!(m.matches(&ctx("https://t.com/ads", Some("a.com"))), MatchDecision::Block);
        assert_eq!(m.matches(&ctx("https://t.com/ads", Some("sub.a.com"))), MatchDecision::Allow);
        assert_eq!(m.matches(&ctx("https://t.com/ads", Some("b.com"))), MatchDecision::Allow);
    }

    #[test]
    fn find_matching_filters_recovers_rule_handles() {
        let mut idx = FilterIndex::new();
        idx.parse("/banner-ads/\n");
        let m = Matcher::new(&idx);
        let (block, exception) = m.find_matching_filters(&ctx("https://x.com/banner-ads/a.js", None));
        assert!(block.is_some());
        assert!(exception.is_none());
    }
}
