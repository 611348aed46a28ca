//! Fingerprint oracle: extracts a canonical fixed-length literal substring
//! from a filter pattern, used as the bloom filter key for that rule.
//!
//! A fingerprint lets the matcher skip a bloom probe plus the linear
//! bucket scan entirely for the overwhelming majority of candidate rules
//! on every request.

/// Fingerprint length in bytes.
pub const FINGERPRINT_SIZE: usize = 6;

/// Substrings that are individually too common to make good bloom keys
/// (they would blow up the false-positive rate). Curated out-of-band from
/// bad-fingerprint diagnostics (see `bad_fingerprint` module); this is a
/// representative starting set, not a frozen contract.
const BAD_SUBSTRINGS: &[&str] = &["https:", "http:/", "www.", ".com/", "?utm_"];

/// Exact 6-byte fingerprints known to cause excessive bloom false
/// positives, rejected outright regardless of substring content.
const BAD_FINGERPRINTS: &[&str] = &["ad.js/", "/ad/ad", "google", "/pixel"];

/// Characters that cannot appear in a fingerprint: ABP's wildcard and
/// anchor metacharacters carry no literal meaning.
#[inline]
pub fn is_fingerprint_char(c: u8) -> bool {
    c != b'|' && c != b'*' && c != b'^'
}

fn has_bad_substring(window: &str) -> bool {
    BAD_SUBSTRINGS.iter().any(|bad| window.contains(bad))
}

fn is_bad_fingerprint(window: &str) -> bool {
    BAD_FINGERPRINTS.iter().any(|bad| bad.eq_ignore_ascii_case(window))
}

/// Extract the fingerprint from a pattern body, skipping any leading
/// `skip` bytes (used by host-anchored rules to skip past the host
/// prefix). Returns `None` if no qualifying window exists.
pub fn get_fingerprint(pattern: &str, skip: usize) -> Option<&str> {
    let bytes = pattern.as_bytes();
    if skip >= bytes.len() {
        return None;
    }
    let body = &bytes[skip..];
    if body.len() < FINGERPRINT_SIZE {
        return None;
    }

    let mut start = 0usize;
    while start + FINGERPRINT_SIZE <= body.len() {
        let window = &body[start..start + FINGERPRINT_SIZE];
        if window.iter().all(|&b| is_fingerprint_char(b)) {
            // SAFETY-free: pattern is guaranteed ASCII-range text for ABP
            // syntax, so any byte slice at a char boundary is valid UTF-8;
            // fingerprint chars are ASCII so we never split a multi-byte
            // sequence.
            if let Ok(candidate) = core::str::from_utf8(window) {
                if !has_bad_substring(candidate) && !is_bad_fingerprint(candidate) {
                    return Some(&pattern[skip + start..skip + start + FINGERPRINT_SIZE]);
                }
            }
        }
        start += 1;
    }
    None
}

/// Fingerprint derivable for a host-anchored rule: skip past the `host`
/// prefix length, falling back to the whole pattern if nothing valid is
/// found after the host.
pub fn get_fingerprint_host_anchored<'a>(pattern: &'a str, host_len: usize) -> Option<&'a str> {
    get_fingerprint(pattern, host_len).or_else(|| get_fingerprint(pattern, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_fingerprint_char() {
        assert!(is_fingerprint_char(b'a'));
        assert!(!is_fingerprint_char(b'|'));
        assert!(!is_fingerprint_char(b'*'));
        assert!(!is_fingerprint_char(b'^'));
    }

    #[test]
    fn test_simple_fingerprint() {
        let fp = get_fingerprint("banner-ads-here", 0);
        assert_eq!(fp, Some("banner"));
        assert_eq!(fp.unwrap().len(), FINGERPRINT_SIZE);
    }

    #[test]
    fn test_skips_metachars() {
        let fp = get_fingerprint("*banner*", 0).unwrap();
        assert!(fp.bytes().all(is_fingerprint_char));
    }

    #[test]
    fn test_too_short_has_no_fingerprint() {
        assert_eq!(get_fingerprint("ads", 0), None);
    }

    #[test]
    fn test_host_anchored_skips_host() {
        let pattern = "example.com/banner-ad";
        let fp = get_fingerprint_host_anchored(pattern, "example.com".len());
        assert_eq!(fp, Some("banner"));
    }

    #[test]
    fn test_host_anchored_falls_back_to_whole_pattern() {
        // host consumes the whole body, so no post-host window exists;
        // falling back to skip=0 should still find something if valid.
        let pattern = "short";
        let fp = get_fingerprint_host_anchored(pattern, pattern.len());
        assert_eq!(fp, None); // too short either way
    }
}
