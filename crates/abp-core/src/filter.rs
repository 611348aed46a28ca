//! The parsed rule record and its per-request match predicate.

use std::borrow::Cow;
use std::sync::OnceLock;

use crate::fingerprint::{get_fingerprint, get_fingerprint_host_anchored};
use crate::types::{FilterOption, FilterType, RequestContext};
use crate::url::{get_host_position, is_at_separator};

/// A parsed filter-list rule.
///
/// String fields are `Cow<'a, str>`: an owned `String` when the record was
/// produced by [`crate::parser::parse_line`], a borrowed `&'a str` slice
/// into a deserialization buffer when loaded from a snapshot. `owned`
/// mirrors the spec's `borrowed_data` flag at whole-record granularity -
/// `owned == false` means every string slot here is a view into a buffer
/// this record does not keep alive itself.
#[derive(Debug, Clone)]
pub struct Filter<'a> {
    pub filter_type: FilterType,
    pub filter_option: FilterOption,
    pub anti_filter_option: FilterOption,
    pub data: Cow<'a, str>,
    pub host: Option<Cow<'a, str>>,
    pub domain_list: Option<Cow<'a, str>>,
    pub tag: Option<Cow<'a, str>>,
    pub rule_definition: Option<Cow<'a, str>>,
    pub owned: bool,
    regex: OnceLock<Option<regex::Regex>>,
}

impl<'a> Filter<'a> {
    pub fn new(
        filter_type: FilterType,
        filter_option: FilterOption,
        anti_filter_option: FilterOption,
        data: Cow<'a, str>,
        host: Option<Cow<'a, str>>,
        domain_list: Option<Cow<'a, str>>,
        tag: Option<Cow<'a, str>>,
        rule_definition: Option<Cow<'a, str>>,
        owned: bool,
    ) -> Self {
        Self {
            filter_type,
            filter_option,
            anti_filter_option,
            data,
            host,
            domain_list,
            tag,
            rule_definition,
            owned,
            regex: OnceLock::new(),
        }
    }

    /// Re-home this record's string slots onto a new buffer without
    /// re-parsing - the pointer-stealing merge described in the resource
    /// model: the caller constructs a fresh owned copy so it can outlive
    /// whatever buffer this record used to borrow from.
    pub fn into_owned(self) -> Filter<'static> {
        Filter {
            filter_type: self.filter_type,
            filter_option: self.filter_option,
            anti_filter_option: self.anti_filter_option,
            data: Cow::Owned(self.data.into_owned()),
            host: self.host.map(|h| Cow::Owned(h.into_owned())),
            domain_list: self.domain_list.map(|d| Cow::Owned(d.into_owned())),
            tag: self.tag.map(|t| Cow::Owned(t.into_owned())),
            rule_definition: self.rule_definition.map(|r| Cow::Owned(r.into_owned())),
            owned: true,
            regex: OnceLock::new(),
        }
    }

    /// The bloom-filter fingerprint for this rule's pattern, if one can be
    /// derived (see `fingerprint::get_fingerprint`). Regex rules and rules
    /// whose entire match condition is host-anchoring never yield one.
    pub fn fingerprint(&self) -> Option<&str> {
        if self.filter_type.contains(FilterType::REGEX) {
            return None;
        }
        if self.filter_type.contains(FilterType::HOST_ANCHORED) {
            let host_len = self.host.as_deref().map(str::len).unwrap_or(0);
            get_fingerprint_host_anchored(&self.data, host_len)
        } else {
            get_fingerprint(&self.data, 0)
        }
    }

    /// `$domain=` allow/deny list, parsed on demand. Each entry is
    /// `(negated, domain)`.
    fn domain_entries(&self) -> Vec<(bool, &str)> {
        match &self.domain_list {
            None => Vec::new(),
            Some(list) => list
                .split('|')
                .filter(|s| !s.is_empty())
                .map(|entry| match entry.strip_prefix('~') {
                    Some(rest) => (true, rest),
                    None => (false, entry),
                })
                .collect(),
        }
    }

    fn domain_list_is_all_positive(&self) -> bool {
        let entries = self.domain_entries();
        !entries.is_empty() && entries.iter().all(|(neg, _)| !neg)
    }

    fn domain_list_is_all_negated(&self) -> bool {
        let entries = self.domain_entries();
        !entries.is_empty() && entries.iter().all(|(neg, _)| *neg)
    }

    /// Routing classification used by `§4.1.2`: is this rule's entire match
    /// condition a positive or all-negated `domain=` list?
    pub fn domain_only_kind(&self) -> DomainOnlyKind {
        if self.domain_list_is_all_positive() {
            DomainOnlyKind::Positive
        } else if self.domain_list_is_all_negated() {
            DomainOnlyKind::Negative
        } else {
            DomainOnlyKind::Mixed
        }
    }

    /// Every domain named in this rule's `domain=` list (both positive and
    /// negated entries), used to populate the no-fingerprint domain hash
    /// sets at parse time.
    pub fn domain_list_domains(&self) -> Vec<&str> {
        self.domain_entries().into_iter().map(|(_, d)| d).collect()
    }

    fn domain_constraint_matches(&self, context_domain: Option<&str>) -> bool {
        let entries = self.domain_entries();
        if entries.is_empty() {
            return true;
        }
        let context_domain = match context_domain {
            Some(d) => d,
            None => return false,
        };
        let is_subdomain_of = |domain: &str| {
            context_domain == domain || context_domain.ends_with(&format!(".{domain}"))
        };

        let mut allowed = false;
        let mut has_positive = false;
        for (negated, domain) in &entries {
            if *negated {
                if is_subdomain_of(domain) {
                    return false;
                }
            } else {
                has_positive = true;
                if is_subdomain_of(domain) {
                    allowed = true;
                }
            }
        }
        !has_positive || allowed
    }

    fn tag_enabled(&self, tags: &crate::tags::TagRegistry) -> bool {
        match &self.tag {
            None => true,
            Some(t) => tags.is_enabled(t),
        }
    }

    fn option_matches(&self, request_option: FilterOption) -> bool {
        let mut required = self.filter_option;
        // A resource-type constraint is ignored entirely when the caller
        // supplied no resource-type bit at all (per §4.2.1).
        if required.intersects(FilterOption::RESOURCE_TYPES)
            && !request_option.intersects(FilterOption::RESOURCE_TYPES)
        {
            required.remove(FilterOption::RESOURCE_TYPES);
        }
        if (required.bits() & request_option.bits()) != required.bits() {
            return false;
        }
        if (self.anti_filter_option.bits() & request_option.bits()) != 0 {
            return false;
        }
        true
    }

    /// The per-filter match predicate (§4.2.1). `request_host` is the
    /// request URL's hostname (precomputed by the caller so every
    /// candidate in a scan shares the work of extracting it once).
    pub fn matches(
        &self,
        ctx: &RequestContext<'_>,
        request_host: &str,
        request_bloom: &crate::bloom::BloomFilter<Vec<u8>>,
        tags: &crate::tags::TagRegistry,
    ) -> bool {
        if !self.option_matches(ctx.request_option) {
            return false;
        }
        if !self.tag_enabled(tags) {
            return false;
        }
        if !self.domain_constraint_matches(ctx.site_domain) {
            return false;
        }

        if self.filter_type.contains(FilterType::HOST_ANCHORED) {
            if !self.host_matches(request_host) {
                return false;
            }
            if self.filter_type.contains(FilterType::HOST_ONLY) {
                return true;
            }
        }

        if self.filter_type.contains(FilterType::REGEX) {
            return self.regex_matches(ctx.url);
        }

        if !self.early_reject_via_bloom(request_bloom) {
            return false;
        }

        // A host-anchored rule's `data` still carries its own host as a
        // literal prefix (`parser.rs` never strips it); the body and its
        // match start position both need to skip past the *request's*
        // actual host, not position 0, or the body's first token is
        // compared against the URL scheme instead of the path.
        if self.filter_type.contains(FilterType::HOST_ANCHORED) {
            let body = self.pattern_body_after_host();
            let start_pos = get_host_position(ctx.url).map_or(0, |(_, end)| end);
            matches_pattern_body_from(body, ctx.url, self.filter_type, start_pos)
        } else {
            matches_pattern_body_from(&self.data, ctx.url, self.filter_type, 0)
        }
    }

    /// `self.data` with the rule's own literal host prefix removed, for
    /// host-anchored rules that carry a path/option body after the host.
    fn pattern_body_after_host(&self) -> &str {
        match &self.host {
            Some(h) => self.data.strip_prefix(h.as_ref()).unwrap_or(&self.data),
            None => &self.data,
        }
    }

    fn host_matches(&self, request_host: &str) -> bool {
        let host = match &self.host {
            Some(h) => h.as_ref(),
            None => return false,
        };
        if host.is_empty() {
            return true;
        }
        if request_host.len() < host.len() {
            return false;
        }
        if request_host.eq_ignore_ascii_case(host) {
            return true;
        }
        request_host.len() > host.len()
            && request_host[..request_host.len() - host.len()].ends_with('.')
            && request_host[request_host.len() - host.len()..].eq_ignore_ascii_case(host)
    }

    /// Cheap early-reject: every run of >=2 literal characters in the
    /// pattern body must appear as a 2-gram in the request's per-request
    /// bloom, or the pattern cannot possibly match.
    fn early_reject_via_bloom(&self, request_bloom: &crate::bloom::BloomFilter<Vec<u8>>) -> bool {
        let body: &str = if self.filter_type.contains(FilterType::HOST_ANCHORED) {
            self.pattern_body_after_host()
        } else {
            &self.data
        };
        for run in literal_runs(body) {
            if run.len() < 2 {
                continue;
            }
            let bytes = run.as_bytes();
            let mut any_present = false;
            for window in bytes.windows(2) {
                if request_bloom.contains(window) {
                    any_present = true;
                    break;
                }
            }
            if !any_present {
                return false;
            }
        }
        true
    }

    fn regex_matches(&self, url: &str) -> bool {
        let compiled = self.regex.get_or_init(|| regex::Regex::new(&self.data).ok());
        match compiled {
            Some(re) => re.is_match(url),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainOnlyKind {
    Positive,
    Negative,
    Mixed,
}

/// Split a pattern body into the runs of characters that are not `*`/`^`
/// wildcard metacharacters.
fn literal_runs(body: &str) -> impl Iterator<Item = &str> {
    body.split(|c| c == '*' || c == '^' || c == '|')
        .filter(|s| !s.is_empty())
}

/// Evaluate a non-regex pattern body against `url` per §4.2.1: `^` matches
/// a separator or end-of-string, `*` matches any run, `|` anchors start or
/// end. `start_pos` is the byte offset the body's left anchor (if any)
/// binds to - position 0 for ordinary patterns, or the offset just past
/// the request's host for a host-anchored rule's path/option body, since
/// `data` there no longer includes the host the caller already matched.
fn matches_pattern_body_from(data: &str, url: &str, filter_type: FilterType, start_pos: usize) -> bool {
    let url_lower = url.to_ascii_lowercase();
    let data_lower = data.to_ascii_lowercase();

    let mut body: &str = &data_lower;
    if filter_type.contains(FilterType::LEFT_ANCHORED) {
        // leading '|' was already stripped by the parser from `data`; body
        // is matched starting exactly at `start_pos`.
    }
    if filter_type.contains(FilterType::RIGHT_ANCHORED) {
        body = body.trim_end_matches('|');
    }

    let segments: Vec<&str> = body.split('*').collect();
    let left_anchored = filter_type.contains(FilterType::LEFT_ANCHORED)
        || filter_type.contains(FilterType::HOST_ANCHORED);
    let right_anchored = filter_type.contains(FilterType::RIGHT_ANCHORED);

    let mut pos = start_pos;
    let url_bytes = url_lower.as_bytes();

    for (i, raw_segment) in segments.iter().enumerate() {
        let is_first = i == 0;
        let is_last = i == segments.len() - 1;
        let segment = *raw_segment;

        if segment.is_empty() {
            continue;
        }

        // A segment may itself contain `^` separator assertions; walk it
        // token by token.
        let tokens: Vec<&str> = split_keep_caret(segment);
        for (j, token) in tokens.iter().enumerate() {
            if *token == "^" {
                if !is_at_separator(&url_lower, pos) {
                    return false;
                }
                continue;
            }
            if token.is_empty() {
                continue;
            }
            let anchor_here = is_first && j == 0 && left_anchored;
            if anchor_here {
                if !url_bytes[pos..].starts_with(token.as_bytes()) {
                    return false;
                }
                pos += token.len();
            } else {
                match url_lower[pos..].find(token) {
                    Some(found) => pos += found + token.len(),
                    None => return false,
                }
            }
        }

        if is_last && right_anchored && !tokens.last().map_or(true, |t| *t == "^") {
            if pos != url_bytes.len() {
                return false;
            }
        }
    }

    if left_anchored && segments.len() == 1 && segments[0].is_empty() {
        // Pattern is just `|` or empty after anchor stripping - matches
        // the start of the URL trivially.
    }

    true
}

fn split_keep_caret(segment: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, ch) in segment.char_indices() {
        if ch == '^' {
            if idx > start {
                out.push(&segment[start..idx]);
            }
            out.push("^");
            start = idx + 1;
        }
    }
    if start < segment.len() {
        out.push(&segment[start..]);
    }
    out
}
