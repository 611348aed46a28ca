//! Optional runtime diagnostics for bloom-filter false positives.
//!
//! When enabled, the matcher records - per request URL, once - the first
//! 6-byte fingerprint window that passed the bloom probe but then failed
//! the linear-scan bucket it pointed into. This never affects matching;
//! it exists purely so a filter-list maintainer can find rules whose
//! fingerprint is producing wasted bucket scans in production traffic.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct BadFingerprintLog {
    enabled: bool,
    seen: HashMap<String, String>,
}

impl BadFingerprintLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.seen.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record a false-positive fingerprint window for `url`, if diagnostics
    /// are enabled and none has been recorded for this URL yet.
    pub fn record(&mut self, url: &str, fingerprint: &str) {
        if !self.enabled {
            return;
        }
        self.seen
            .entry(url.to_string())
            .or_insert_with(|| fingerprint.to_string());
    }

    pub fn get(&self, url: &str) -> Option<&str> {
        self.seen.get(url).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_only_when_enabled() {
        let mut log = BadFingerprintLog::new();
        log.record("http://x.com/a", "ad.js/");
        assert!(log.is_empty());

        log.set_enabled(true);
        log.record("http://x.com/a", "ad.js/");
        assert_eq!(log.get("http://x.com/a"), Some("ad.js/"));
    }

    #[test]
    fn keeps_first_recorded_per_url() {
        let mut log = BadFingerprintLog::new();
        log.set_enabled(true);
        log.record("http://x.com/a", "first1");
        log.record("http://x.com/a", "second");
        assert_eq!(log.get("http://x.com/a"), Some("first1"));
    }
}
