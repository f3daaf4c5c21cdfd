//! Conditional-fetch freshness stamps.
//!
//! A [`FreshnessStamp`] is an opaque cache validator taken from a response's
//! headers. Comparing the stamp stored after the last import against the one
//! the server currently reports lets the orchestrator skip the download and
//! the whole diff for unchanged files.

use serde::{Deserialize, Serialize};

/// Validator header names, scanned in this fixed priority order. The first
/// one present with a non-empty trimmed value wins.
pub const VALIDATOR_PRIORITY: [&str; 2] = ["Last-Modified", "ETag"];

/// An opaque cache validator: a header name and its trimmed value.
///
/// Equality is structural; two stamps match only when both the validator
/// name and the value are identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessStamp {
    name: String,
    value: String,
}

impl FreshnessStamp {
    /// Build a stamp from a validator name and value. Returns `None` when
    /// the value is empty after trimming; absence is not an error.
    pub fn new(name: impl Into<String>, value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some(Self {
            name: name.into(),
            value: value.to_string(),
        })
    }

    /// Scan a response's header pairs for the best available validator.
    ///
    /// Header names are compared case-insensitively; the stamp keeps the
    /// canonical name from [`VALIDATOR_PRIORITY`].
    pub fn from_headers(headers: &[(String, String)]) -> Option<Self> {
        VALIDATOR_PRIORITY.iter().find_map(|candidate| {
            headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(candidate))
                .and_then(|(_, value)| Self::new(*candidate, value))
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// True only when both stamps are present and structurally equal.
    ///
    /// Absence on either side is always "changed", forcing a refetch rather
    /// than silently skipping one.
    pub fn is_unchanged(previous: Option<&FreshnessStamp>, current: Option<&FreshnessStamp>) -> bool {
        matches!((previous, current), (Some(p), Some(c)) if p == c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn last_modified_beats_etag() {
        let headers = pairs(&[
            ("ETag", "\"abc123\""),
            ("Last-Modified", "Tue, 04 Aug 2026 10:00:00 GMT"),
        ]);
        let stamp = FreshnessStamp::from_headers(&headers).unwrap();
        assert_eq!(stamp.name(), "Last-Modified");
        assert_eq!(stamp.value(), "Tue, 04 Aug 2026 10:00:00 GMT");
    }

    #[test]
    fn falls_back_to_etag_when_last_modified_is_blank() {
        let headers = pairs(&[("Last-Modified", "   "), ("etag", " \"abc123\" ")]);
        let stamp = FreshnessStamp::from_headers(&headers).unwrap();
        assert_eq!(stamp.name(), "ETag");
        assert_eq!(stamp.value(), "\"abc123\"");
    }

    #[test]
    fn no_validator_headers_yields_no_stamp() {
        let headers = pairs(&[("Content-Type", "text/vcard")]);
        assert_eq!(FreshnessStamp::from_headers(&headers), None);
    }

    #[test]
    fn header_name_matching_is_case_insensitive() {
        let headers = pairs(&[("last-modified", "Mon, 03 Aug 2026 09:00:00 GMT")]);
        let stamp = FreshnessStamp::from_headers(&headers).unwrap();
        assert_eq!(stamp.name(), "Last-Modified");
    }

    #[test]
    fn unchanged_requires_both_sides_present_and_equal() {
        let a = FreshnessStamp::new("ETag", "\"v1\"");
        let b = FreshnessStamp::new("ETag", "\"v1\"");
        let c = FreshnessStamp::new("ETag", "\"v2\"");
        let d = FreshnessStamp::new("Last-Modified", "\"v1\"");

        assert!(FreshnessStamp::is_unchanged(a.as_ref(), b.as_ref()));
        assert!(!FreshnessStamp::is_unchanged(a.as_ref(), c.as_ref()));
        // Same value under a different validator name is still a change.
        assert!(!FreshnessStamp::is_unchanged(a.as_ref(), d.as_ref()));
        assert!(!FreshnessStamp::is_unchanged(None, b.as_ref()));
        assert!(!FreshnessStamp::is_unchanged(a.as_ref(), None));
        assert!(!FreshnessStamp::is_unchanged(None, None));
    }
}
