//! Filter-list line lexer.
//!
//! `parse_line` classifies a single line of filter-list text into a
//! [`Filter`] record (or a `$badfilter` directive, or nothing at all for
//! comments/blank lines/dropped lines). Bucket routing and ancillary index
//! population happen one layer up, in [`crate::index::FilterIndex::parse`],
//! since that is where all the buckets live.

use std::borrow::Cow;

use log::{debug, warn};

use crate::filter::Filter;
use crate::types::{FilterOption, FilterType, MAX_LINE_LENGTH};
use crate::url::is_separator_char;

/// Outcome of lexing a single line.
pub enum ParseResult {
    /// Blank line or comment; not an error, just nothing to route.
    Skip,
    /// Oversized line or a rule with an unrecognized option; dropped.
    Dropped,
    /// `$badfilter` directive: retroactively disables a prior rule sharing
    /// the same pattern and domain list.
    BadFilter { pattern: String, domain_list: Option<String> },
    Rule(Filter<'static>),
}

pub fn parse_line(raw: &str) -> ParseResult {
    let line = raw.trim_end_matches(['\n', '\r']);
    if line.len() > MAX_LINE_LENGTH {
        warn!("dropping oversized filter line ({} bytes)", line.len());
        return ParseResult::Dropped;
    }
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ParseResult::Skip;
    }
    if trimmed.starts_with('!') || trimmed.starts_with('[') {
        return ParseResult::Skip;
    }
    if trimmed.starts_with("# ") {
        return ParseResult::Skip;
    }

    if let Some(idx) = trimmed.find("#@#") {
        return parse_cosmetic(trimmed, idx, 3, FilterType::ELEMENT_HIDING_EXCEPTION);
    }
    if let Some(idx) = trimmed.find("##") {
        return parse_cosmetic(trimmed, idx, 2, FilterType::ELEMENT_HIDING);
    }
    if let Some(idx) = trimmed.find("$$") {
        let domain_part = &trimmed[..idx];
        let data = &trimmed[idx + 2..];
        let domain_list = if domain_part.is_empty() {
            None
        } else {
            Some(Cow::Owned(domain_part.to_string()))
        };
        return ParseResult::Rule(Filter::new(
            FilterType::HTML_FILTERING,
            FilterOption::empty(),
            FilterOption::empty(),
            Cow::Owned(data.to_string()),
            None,
            domain_list,
            None,
            None,
            true,
        ));
    }

    parse_network_rule(trimmed)
}

fn parse_cosmetic(trimmed: &str, idx: usize, marker_len: usize, ty: FilterType) -> ParseResult {
    let domain_part = &trimmed[..idx];
    let selector = trimmed[idx + marker_len..].trim();
    if selector.is_empty() {
        return ParseResult::Dropped;
    }
    let domain_list = if domain_part.is_empty() {
        None
    } else {
        Some(Cow::Owned(domain_part.to_string()))
    };
    ParseResult::Rule(Filter::new(
        ty,
        FilterOption::empty(),
        FilterOption::empty(),
        Cow::Owned(selector.to_string()),
        None,
        domain_list,
        None,
        None,
        true,
    ))
}

fn parse_network_rule(trimmed: &str) -> ParseResult {
    let mut filter_type = FilterType::empty();
    let mut s = trimmed;

    if let Some(rest) = s.strip_prefix("@@") {
        filter_type |= FilterType::EXCEPTION;
        s = rest;
    }

    if s.starts_with('/') && s.len() > 1 {
        if let Some(result) = try_parse_regex(s, filter_type) {
            return result;
        }
    }

    let mut host: Option<String> = None;
    if let Some(rest) = s.strip_prefix("||") {
        filter_type |= FilterType::HOST_ANCHORED;
        let host_end = rest
            .bytes()
            .position(|b| is_separator_char(b) || b == b'$')
            .unwrap_or(rest.len());
        host = Some(rest[..host_end].to_string());
        s = rest;
        let _ = host_end;
    } else if let Some(rest) = s.strip_prefix('|') {
        filter_type |= FilterType::LEFT_ANCHORED;
        s = rest;
    }

    let dollar_pos = find_options_separator(s);
    let (pattern_text, options_str) = match dollar_pos {
        Some(pos) => (&s[..pos], Some(&s[pos + 1..])),
        None => (s, None),
    };

    let host_len = host.as_ref().map(String::len).unwrap_or(0);
    let body_after_host = &pattern_text[host_len..];
    let mut pattern_body = body_after_host;
    if pattern_body.ends_with('|') {
        filter_type |= FilterType::RIGHT_ANCHORED;
        pattern_body = &pattern_body[..pattern_body.len() - 1];
    }

    if filter_type.contains(FilterType::HOST_ANCHORED)
        && (pattern_body.is_empty() || pattern_body == "^")
    {
        filter_type |= FilterType::HOST_ONLY;
    }

    let mut filter_option = FilterOption::empty();
    let mut anti_filter_option = FilterOption::empty();
    let mut domain_list: Option<String> = None;
    let mut tag: Option<String> = None;
    let mut is_badfilter = false;

    if let Some(opts) = options_str {
        for token in opts.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let (negated, name) = match token.strip_prefix('~') {
                Some(rest) => (true, rest),
                None => (false, token),
            };
            if name == "badfilter" {
                is_badfilter = true;
                continue;
            }
            if let Some(eq) = name.find('=') {
                let key = &name[..eq];
                let value = &name[eq + 1..];
                match key {
                    "domain" => domain_list = Some(value.to_string()),
                    "tag" => tag = Some(value.to_string()),
                    "redirect" | "redirect-rule" | "csp" | "removeparam" => {
                        // Accepted but not consumed by the matcher.
                    }
                    _ => {
                        debug!("dropping rule with unsupported option '{key}'");
                        return ParseResult::Dropped;
                    }
                }
                continue;
            }
            match FilterOption::from_option_name(name) {
                Some(bit) if negated => anti_filter_option |= bit,
                Some(bit) => filter_option |= bit,
                None => {
                    debug!("dropping rule with unsupported option '{name}'");
                    return ParseResult::Dropped;
                }
            }
        }
    }

    if is_badfilter {
        return ParseResult::BadFilter {
            pattern: pattern_text.to_string(),
            domain_list,
        };
    }

    let data = pattern_text.to_string();
    build_filter_rule(
        filter_type,
        filter_option,
        anti_filter_option,
        data,
        host,
        domain_list,
        tag,
    )
}

fn build_filter_rule(
    filter_type: FilterType,
    filter_option: FilterOption,
    anti_filter_option: FilterOption,
    data: String,
    host: Option<String>,
    domain_list: Option<String>,
    tag: Option<String>,
) -> ParseResult {
    ParseResult::Rule(Filter::new(
        filter_type,
        filter_option,
        anti_filter_option,
        Cow::Owned(data),
        host.map(Cow::Owned),
        domain_list.map(Cow::Owned),
        tag.map(Cow::Owned),
        None,
        true,
    ))
}

/// Scan for the `$` that starts the options segment: the first `$` not
/// immediately part of a `$$` token (that case is handled earlier, by the
/// HTML-filtering branch, so by the time we get here a literal `$$` cannot
/// occur - this only needs to skip an escaped `\$`, which filter-list
/// syntax does not define, so any `$` here is the options separator).
fn find_options_separator(s: &str) -> Option<usize> {
    s.find('$')
}

fn try_parse_regex(s: &str, filter_type: FilterType) -> Option<ParseResult> {
    let dollar_pos = s[1..].find('$').map(|p| p + 1);
    let (body_with_slashes, options_str) = match dollar_pos {
        Some(pos) => (&s[..pos], Some(&s[pos + 1..])),
        None => (s, None),
    };
    if !body_with_slashes.ends_with('/') || body_with_slashes.len() < 2 {
        return None;
    }
    let body = &body_with_slashes[1..body_with_slashes.len() - 1];

    let mut filter_option = FilterOption::empty();
    let mut anti_filter_option = FilterOption::empty();
    let mut domain_list: Option<String> = None;
    let mut tag: Option<String> = None;

    if let Some(opts) = options_str {
        for token in opts.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let (negated, name) = match token.strip_prefix('~') {
                Some(rest) => (true, rest),
                None => (false, token),
            };
            if name == "badfilter" {
                // Regex badfilter directives are rare; treat as dropped
                // rather than threading a second return shape through here.
                return Some(ParseResult::Dropped);
            }
            if let Some(eq) = name.find('=') {
                let key = &name[..eq];
                let value = &name[eq + 1..];
                match key {
                    "domain" => domain_list = Some(value.to_string()),
                    "tag" => tag = Some(value.to_string()),
                    "redirect" | "redirect-rule" | "csp" | "removeparam" => {}
                    _ => return Some(ParseResult::Dropped),
                }
                continue;
            }
            match FilterOption::from_option_name(name) {
                Some(bit) if negated => anti_filter_option |= bit,
                Some(bit) => filter_option |= bit,
                None => return Some(ParseResult::Dropped),
            }
        }
    }

    Some(ParseResult::Rule(Filter::new(
        filter_type | FilterType::REGEX,
        filter_option,
        anti_filter_option,
        Cow::Owned(body.to_string()),
        None,
        domain_list.map(Cow::Owned),
        tag.map(Cow::Owned),
        None,
        true,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(line: &str) -> Filter<'static> {
        match parse_line(line) {
            ParseResult::Rule(f) => f,
            _ => panic!("expected a rule for {line:?}"),
        }
    }

    #[test]
    fn host_only_rule() {
        let f = rule("||example.com^");
        assert!(f.filter_type.contains(FilterType::HOST_ANCHORED));
        assert!(f.filter_type.contains(FilterType::HOST_ONLY));
        assert_eq!(f.host.as_deref(), Some("example.com"));
    }

    #[test]
    fn exception_host_only() {
        let f = rule("@@||example.com/whitelist^");
        assert!(f.filter_type.contains(FilterType::EXCEPTION));
        assert!(f.filter_type.contains(FilterType::HOST_ANCHORED));
        assert!(!f.filter_type.contains(FilterType::HOST_ONLY));
    }

    #[test]
    fn plain_pattern_rule() {
        let f = rule("/banner/*");
        assert_eq!(f.data.as_ref(), "/banner/*");
        assert!(!f.filter_type.contains(FilterType::HOST_ANCHORED));
    }

    #[test]
    fn domain_option_rule() {
        let f = rule("ads$domain=a.com|~sub.a.com");
        assert_eq!(f.data.as_ref(), "ads");
        assert_eq!(f.domain_list.as_deref(), Some("a.com|~sub.a.com"));
    }

    #[test]
    fn tag_option_rule() {
        let f = rule("tracker.js$tag=analytics");
        assert_eq!(f.tag.as_deref(), Some("analytics"));
    }

    #[test]
    fn badfilter_directive() {
        match parse_line("ads.js$badfilter") {
            ParseResult::BadFilter { pattern, domain_list } => {
                assert_eq!(pattern, "ads.js");
                assert_eq!(domain_list, None);
            }
            _ => panic!("expected a badfilter directive"),
        }
    }

    #[test]
    fn unsupported_option_drops_rule() {
        assert!(matches!(parse_line("ads$nonsense"), ParseResult::Dropped));
    }

    #[test]
    fn comment_and_blank_are_skipped() {
        assert!(matches!(parse_line("! a comment"), ParseResult::Skip));
        assert!(matches!(parse_line(""), ParseResult::Skip));
        assert!(matches!(parse_line("   "), ParseResult::Skip));
        assert!(matches!(parse_line("[Adblock Plus 2.0]"), ParseResult::Skip));
        assert!(matches!(parse_line("# a ublock comment"), ParseResult::Skip));
    }

    #[test]
    fn element_hiding_rule() {
        let f = rule("a.com##.promo");
        assert!(f.filter_type.contains(FilterType::ELEMENT_HIDING));
        assert_eq!(f.domain_list.as_deref(), Some("a.com"));
        assert_eq!(f.data.as_ref(), ".promo");
    }

    #[test]
    fn element_hiding_exception_rule() {
        let f = rule("#@#.ad-banner");
        assert!(f.filter_type.contains(FilterType::ELEMENT_HIDING_EXCEPTION));
        assert_eq!(f.domain_list, None);
        assert_eq!(f.data.as_ref(), ".ad-banner");
    }

    #[test]
    fn scriptlet_treated_as_element_hiding() {
        let f = rule("example.com##+js(abort-on-property-read, foo)");
        assert!(f.filter_type.contains(FilterType::ELEMENT_HIDING));
        assert_eq!(f.data.as_ref(), "+js(abort-on-property-read, foo)");
    }

    #[test]
    fn html_filtering_rule() {
        let f = rule("example.com$$script[tag=\"adsbygoogle\"]");
        assert!(f.filter_type.contains(FilterType::HTML_FILTERING));
        assert_eq!(f.domain_list.as_deref(), Some("example.com"));
    }

    #[test]
    fn regex_rule() {
        let f = rule("/ad[0-9]+\\.js/");
        assert!(f.filter_type.contains(FilterType::REGEX));
        assert_eq!(f.data.as_ref(), "ad[0-9]+\\.js");
    }

    #[test]
    fn oversized_line_is_dropped() {
        let long_line = "a".repeat(MAX_LINE_LENGTH + 10);
        assert!(matches!(parse_line(&long_line), ParseResult::Dropped));
    }
}
