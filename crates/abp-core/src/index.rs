//! The central filter index: owns every bucket and ancillary structure the
//! parser routes into and the matcher scans.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::bad_fingerprint::BadFingerprintLog;
use crate::bloom::{BloomFilter, BLOCK_BLOOM_BITS, BLOCK_BLOOM_K, EXCEPTION_BLOOM_BITS, EXCEPTION_BLOOM_K};
use crate::cosmetic::CosmeticIndex;
use crate::filter::{DomainOnlyKind, Filter};
use crate::parser::{parse_line, ParseResult};
use crate::tags::TagRegistry;
use crate::types::FilterType;

/// The fully indexed state of one or more parsed filter lists.
///
/// Every bucket named in the routing table lives here as a plain owned
/// collection - including the ones rebuilt from a deserialized snapshot,
/// per the design note on [`crate::hashindex`]: the binary layout is only
/// ever the wire form, never the live runtime representation.
#[derive(Debug)]
pub struct FilterIndex<'a> {
    pub(crate) filters: Vec<Filter<'a>>,
    pub(crate) exception_filters: Vec<Filter<'a>>,

    pub(crate) host_anchored: HashMap<String, Vec<Filter<'a>>>,
    pub(crate) host_anchored_exception: HashMap<String, Vec<Filter<'a>>>,

    pub(crate) no_fingerprint_domain_only: Vec<Filter<'a>>,
    pub(crate) no_fingerprint_domain_only_exception: Vec<Filter<'a>>,
    pub(crate) no_fingerprint_anti_domain_only: Vec<Filter<'a>>,
    pub(crate) no_fingerprint_anti_domain_only_exception: Vec<Filter<'a>>,
    pub(crate) no_fingerprint_filters: Vec<Filter<'a>>,
    pub(crate) no_fingerprint_exception_filters: Vec<Filter<'a>>,

    pub(crate) no_fingerprint_domain_set: HashSet<String>,
    pub(crate) no_fingerprint_domain_set_exception: HashSet<String>,
    pub(crate) no_fingerprint_anti_domain_set: HashSet<String>,
    pub(crate) no_fingerprint_anti_domain_set_exception: HashSet<String>,

    pub(crate) html_filters: Vec<Filter<'a>>,

    pub(crate) cosmetic: CosmeticIndex,

    pub(crate) block_bloom: BloomFilter<Vec<u8>>,
    pub(crate) exception_bloom: BloomFilter<Vec<u8>>,

    pub(crate) tags: TagRegistry,
    pub(crate) bad_fingerprints: RefCell<BadFingerprintLog>,

    pending_badfilters: Vec<(String, Option<String>)>,
}

impl<'a> Default for FilterIndex<'a> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            exception_filters: Vec::new(),
            host_anchored: HashMap::new(),
            host_anchored_exception: HashMap::new(),
            no_fingerprint_domain_only: Vec::new(),
            no_fingerprint_domain_only_exception: Vec::new(),
            no_fingerprint_anti_domain_only: Vec::new(),
            no_fingerprint_anti_domain_only_exception: Vec::new(),
            no_fingerprint_filters: Vec::new(),
            no_fingerprint_exception_filters: Vec::new(),
            no_fingerprint_domain_set: HashSet::new(),
            no_fingerprint_domain_set_exception: HashSet::new(),
            no_fingerprint_anti_domain_set: HashSet::new(),
            no_fingerprint_anti_domain_set_exception: HashSet::new(),
            html_filters: Vec::new(),
            cosmetic: CosmeticIndex::new(),
            block_bloom: BloomFilter::new(BLOCK_BLOOM_BITS, BLOCK_BLOOM_K),
            exception_bloom: BloomFilter::new(EXCEPTION_BLOOM_BITS, EXCEPTION_BLOOM_K),
            tags: TagRegistry::new(),
            bad_fingerprints: RefCell::new(BadFingerprintLog::new()),
            pending_badfilters: Vec::new(),
        }
    }
}

impl<'a> FilterIndex<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` (newline-delimited filter-list rules) and route every
    /// resulting record into its bucket. May be called more than once on
    /// the same index to merge additional lists; `$badfilter` directives
    /// accumulated across every call are (re-)applied at the end of each
    /// call, so ordering between a rule and its badfilter does not matter.
    pub fn parse(&mut self, text: &str) {
        self.parse_with(text, false);
    }

    /// As [`Self::parse`], but when `preserve_rules` is set every routed
    /// record keeps a verbatim copy of its source line in
    /// [`Filter::rule_definition`] - off by default since most records
    /// never need it and it doubles the string storage for the ones that
    /// do. Returns `true` unless `text` is empty; a malformed individual
    /// line is skipped rather than failing the whole call.
    pub fn parse_with(&mut self, text: &str, preserve_rules: bool) -> bool {
        let mut saw_line = false;
        for line in text.lines() {
            saw_line = true;
            match parse_line(line) {
                ParseResult::Skip | ParseResult::Dropped => {}
                ParseResult::BadFilter { pattern, domain_list } => {
                    self.pending_badfilters.push((pattern, domain_list));
                }
                ParseResult::Rule(mut filter) => {
                    if preserve_rules {
                        filter.rule_definition = Some(Cow::Owned(line.trim().to_string()));
                    }
                    self.route(filter);
                }
            }
        }
        self.apply_badfilters();
        saw_line
    }

    fn route(&mut self, filter: Filter<'a>) {
        let is_exception = filter.filter_type.contains(FilterType::EXCEPTION);
        let is_host_only = filter.filter_type.contains(FilterType::HOST_ONLY);
        let is_cosmetic = filter
            .filter_type
            .intersects(FilterType::ELEMENT_HIDING | FilterType::ELEMENT_HIDING_EXCEPTION);
        let is_html = filter.filter_type.contains(FilterType::HTML_FILTERING);

        if is_cosmetic {
            let is_exception_cosmetic = filter.filter_type.contains(FilterType::ELEMENT_HIDING_EXCEPTION);
            if is_exception_cosmetic {
                self.cosmetic.add_exception(filter.domain_list.as_deref(), &filter.data);
            } else {
                self.cosmetic.add_hiding(filter.domain_list.as_deref(), &filter.data);
            }
            return;
        }

        if is_html {
            self.html_filters.push(filter);
            return;
        }

        if is_host_only {
            let host = filter.host.as_deref().unwrap_or("").to_ascii_lowercase();
            let bucket = if is_exception {
                &mut self.host_anchored_exception
            } else {
                &mut self.host_anchored
            };
            bucket.entry(host).or_default().push(filter);
            return;
        }

        if let Some(fp) = filter.fingerprint() {
            let fp = fp.as_bytes().to_vec();
            if is_exception {
                self.exception_bloom.add(&fp);
                self.exception_filters.push(filter);
            } else {
                self.block_bloom.add(&fp);
                self.filters.push(filter);
            }
            return;
        }

        let domains: Vec<String> = filter
            .domain_list_domains()
            .iter()
            .map(|d| d.to_ascii_lowercase())
            .collect();

        match filter.domain_only_kind() {
            DomainOnlyKind::Positive => {
                let set = if is_exception {
                    &mut self.no_fingerprint_domain_set_exception
                } else {
                    &mut self.no_fingerprint_domain_set
                };
                set.extend(domains);
                if is_exception {
                    self.no_fingerprint_domain_only_exception.push(filter);
                } else {
                    self.no_fingerprint_domain_only.push(filter);
                }
            }
            DomainOnlyKind::Negative => {
                let set = if is_exception {
                    &mut self.no_fingerprint_anti_domain_set_exception
                } else {
                    &mut self.no_fingerprint_anti_domain_set
                };
                set.extend(domains);
                if is_exception {
                    self.no_fingerprint_anti_domain_only_exception.push(filter);
                } else {
                    self.no_fingerprint_anti_domain_only.push(filter);
                }
            }
            DomainOnlyKind::Mixed => {
                if is_exception {
                    self.no_fingerprint_exception_filters.push(filter);
                } else {
                    self.no_fingerprint_filters.push(filter);
                }
            }
        }
    }

    /// Retroactively remove every rule matching a collected `$badfilter`
    /// directive (same pattern body, same domain list) from every bucket
    /// it could have landed in. Resolved here, after parsing and before the
    /// index is considered final, per the badfilter directive's contract.
    fn apply_badfilters(&mut self) {
        if self.pending_badfilters.is_empty() {
            return;
        }
        let bad = self.pending_badfilters.clone();
        let is_bad = |f: &Filter<'a>| {
            bad.iter()
                .any(|(p, d)| f.data.as_ref() == p.as_str() && f.domain_list.as_deref() == d.as_deref())
        };
        self.filters.retain(|f| !is_bad(f));
        self.exception_filters.retain(|f| !is_bad(f));
        self.no_fingerprint_filters.retain(|f| !is_bad(f));
        self.no_fingerprint_exception_filters.retain(|f| !is_bad(f));
        self.no_fingerprint_domain_only.retain(|f| !is_bad(f));
        self.no_fingerprint_domain_only_exception.retain(|f| !is_bad(f));
        self.no_fingerprint_anti_domain_only.retain(|f| !is_bad(f));
        self.no_fingerprint_anti_domain_only_exception.retain(|f| !is_bad(f));
        for bucket in self.host_anchored.values_mut() {
            bucket.retain(|f| !is_bad(f));
        }
        for bucket in self.host_anchored_exception.values_mut() {
            bucket.retain(|f| !is_bad(f));
        }
    }

    // -- Tags -----------------------------------------------------------

    pub fn add_tag(&mut self, tag: &str) {
        self.tags.enable(tag);
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.disable(tag);
    }

    pub fn tag_exists(&self, tag: &str) -> bool {
        self.tags.is_enabled(tag)
    }

    // -- Cosmetic lookup --------------------------------------------------

    pub fn get_element_hiding_selectors(&self, host: &str) -> Option<String> {
        self.cosmetic.get_selectors(host)
    }

    pub fn get_element_hiding_exception_selectors(&self, host: &str) -> Option<String> {
        self.cosmetic.get_exception_selectors(host)
    }

    // -- Diagnostics ------------------------------------------------------

    pub fn enable_bad_fingerprint_detection(&mut self, enabled: bool) {
        self.bad_fingerprints.borrow_mut().set_enabled(enabled);
    }

    pub fn bad_fingerprint_for(&self, url: &str) -> Option<String> {
        self.bad_fingerprints.borrow().get(url).map(str::to_string)
    }

    // -- Snapshot support ---------------------------------------------------

    /// Recompute the four no-fingerprint domain/anti-domain sets from the
    /// `domain_list` already carried by each row in their respective
    /// buckets. Used after loading a snapshot, where the buckets are
    /// decoded directly but the derived sets are not persisted separately -
    /// the rows are the single source of truth for set membership.
    pub(crate) fn rebuild_domain_sets(&mut self) {
        for filter in &self.no_fingerprint_domain_only {
            self.no_fingerprint_domain_set
                .extend(filter.domain_list_domains().iter().map(|d| d.to_ascii_lowercase()));
        }
        for filter in &self.no_fingerprint_domain_only_exception {
            self.no_fingerprint_domain_set_exception
                .extend(filter.domain_list_domains().iter().map(|d| d.to_ascii_lowercase()));
        }
        for filter in &self.no_fingerprint_anti_domain_only {
            self.no_fingerprint_anti_domain_set
                .extend(filter.domain_list_domains().iter().map(|d| d.to_ascii_lowercase()));
        }
        for filter in &self.no_fingerprint_anti_domain_only_exception {
            self.no_fingerprint_anti_domain_set_exception
                .extend(filter.domain_list_domains().iter().map(|d| d.to_ascii_lowercase()));
        }
    }

    // -- Bulk state -------------------------------------------------------

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn rule_count(&self) -> usize {
        self.filters.len()
            + self.exception_filters.len()
            + self.host_anchored.values().map(Vec::len).sum::<usize>()
            + self.host_anchored_exception.values().map(Vec::len).sum::<usize>()
            + self.no_fingerprint_domain_only.len()
            + self.no_fingerprint_domain_only_exception.len()
            + self.no_fingerprint_anti_domain_only.len()
            + self.no_fingerprint_anti_domain_only_exception.len()
            + self.no_fingerprint_filters.len()
            + self.no_fingerprint_exception_filters.len()
            + self.html_filters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FilterOption, RequestContext};

    #[test]
    fn host_only_rule_routes_to_host_anchored_bucket() {
        let mut idx = FilterIndex::new();
        idx.parse("||ads.example.com^\n");
        assert!(idx.host_anchored.contains_key("ads.example.com"));
        assert_eq!(idx.rule_count(), 1);
    }

    #[test]
    fn fingerprintable_rule_populates_bloom_and_filters_bucket() {
        let mut idx = FilterIndex::new();
        idx.parse("/banner-ads/*\n");
        assert_eq!(idx.filters.len(), 1);
        assert!(idx.block_bloom.substring_exists("/banner-ads/x.js", 6));
    }

    #[test]
    fn domain_only_positive_rule_populates_domain_set() {
        let mut idx = FilterIndex::new();
        // `^` alone carries no usable fingerprint and no host anchor, so a
        // domain-only rule routes to the no-fingerprint domain bucket.
        idx.parse("^$domain=example.com\n");
        assert!(idx.no_fingerprint_domain_set.contains("example.com"));
        assert_eq!(idx.no_fingerprint_domain_only.len(), 1);
    }

    #[test]
    fn badfilter_retroactively_removes_matching_rule() {
        let mut idx = FilterIndex::new();
        idx.parse("ads.js\nads.js$badfilter\n");
        assert!(idx.filters.is_empty());
    }

    #[test]
    fn cosmetic_rules_do_not_create_filter_records() {
        let mut idx = FilterIndex::new();
        idx.parse("example.com##.ad\n#@#.ad\n");
        assert_eq!(idx.rule_count(), 0);
        assert_eq!(idx.get_element_hiding_selectors("example.com"), Some(".ad".to_string()));
    }

    #[test]
    fn tags_gate_whether_a_tagged_rule_is_inert() {
        let mut idx = FilterIndex::new();
        idx.parse("tracker.js$tag=analytics\n");
        assert!(!idx.tag_exists("analytics"));
        let ctx = RequestContext {
            url: "https://cdn.example.com/tracker.js",
            site_domain: None,
            request_option: FilterOption::empty(),
        };
        let filter = &idx.filters[0];
        let req_bloom = crate::bloom::build_request_bloom(ctx.url);
        assert!(!filter.matches(&ctx, "cdn.example.com", &req_bloom, &idx.tags));
        idx.add_tag("analytics");
        assert!(filter.matches(&ctx, "cdn.example.com", &req_bloom, &idx.tags));
    }

    #[test]
    fn preserve_rules_retains_verbatim_source_line() {
        let mut idx = FilterIndex::new();
        assert!(idx.parse_with("/banner-ads/*\n", true));
        assert_eq!(idx.filters[0].rule_definition.as_deref(), Some("/banner-ads/*"));
    }

    #[test]
    fn parse_without_preserve_rules_leaves_rule_definition_empty() {
        let mut idx = FilterIndex::new();
        idx.parse("/banner-ads/*\n");
        assert!(idx.filters[0].rule_definition.is_none());
    }

    #[test]
    fn parse_with_returns_false_for_empty_input() {
        let mut idx = FilterIndex::new();
        assert!(!idx.parse_with("", true));
    }
}
