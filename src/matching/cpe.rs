//! CPE matching.
//!
//! Both CPE 2.2 URIs (`cpe:/a:vendor:product:1.0`) and CPE 2.3 formatted
//! strings are compared in 2.3 form with all eleven attribute slots present.

use super::traits::{ComponentMatcher, MatchStrategy};
use crate::model::ComponentView;

const CPE23_PREFIX: &str = "cpe:2.3:";
const CPE22_PREFIX: &str = "cpe:/";
const ATTRIBUTE_SLOTS: usize = 11;
/// Index of the version attribute in the full `:`-split 2.3 string
const VERSION_INDEX: usize = 5;

/// Normalize a CPE to lowercase 2.3 form padded with `*` to 11 attributes.
///
/// Strings that are neither 2.2 nor 2.3 CPEs are only trimmed and lowercased.
#[must_use]
pub fn normalize_cpe(cpe: &str) -> String {
    let lower = cpe.trim().to_lowercase();

    let attributes: Vec<String> = if let Some(rest) = lower.strip_prefix(CPE23_PREFIX) {
        rest.split(':').map(str::to_string).collect()
    } else if let Some(rest) = lower.strip_prefix(CPE22_PREFIX) {
        rest.split(':')
            .map(|a| if a.is_empty() { "*".to_string() } else { a.to_string() })
            .collect()
    } else {
        return lower;
    };

    let mut padded = attributes;
    padded.truncate(ATTRIBUTE_SLOTS);
    while padded.len() < ATTRIBUTE_SLOTS {
        padded.push("*".to_string());
    }
    format!("{CPE23_PREFIX}{}", padded.join(":"))
}

/// Replace the version attribute of a normalized 2.3 CPE with `*`.
#[must_use]
pub fn wildcard_cpe_version(normalized: &str) -> String {
    if !normalized.starts_with(CPE23_PREFIX) {
        return normalized.to_string();
    }
    let mut parts: Vec<&str> = normalized.split(':').collect();
    if let Some(version) = parts.get_mut(VERSION_INDEX) {
        *version = "*";
    }
    parts.join(":")
}

/// Matches components whose CPEs are equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpeMatcher {
    ignore_version: bool,
}

impl CpeMatcher {
    #[must_use]
    pub const fn new(ignore_version: bool) -> Self {
        Self { ignore_version }
    }

    fn comparable(&self, cpe: &str) -> String {
        let normalized = normalize_cpe(cpe);
        if self.ignore_version {
            wildcard_cpe_version(&normalized)
        } else {
            normalized
        }
    }
}

impl ComponentMatcher for CpeMatcher {
    fn is_match(&self, a: &dyn ComponentView, b: &dyn ComponentView) -> bool {
        match (a.cpe(), b.cpe()) {
            (Some(ca), Some(cb)) => {
                let (ca, cb) = (self.comparable(ca), self.comparable(cb));
                !ca.is_empty() && ca == cb
            }
            _ => false,
        }
    }

    fn confidence(&self, a: &dyn ComponentView, b: &dyn ComponentView) -> u8 {
        if self.is_match(a, b) {
            MatchStrategy::Cpe.base_confidence()
        } else {
            0
        }
    }

    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Cpe
    }

    fn name(&self) -> &'static str {
        "CpeMatcher"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::cyclonedx::Component;

    fn with_cpe(cpe: &str) -> Component {
        let mut c = Component::new("library", "openssl");
        c.cpe = Some(cpe.to_string());
        c
    }

    #[test]
    fn test_cpe22_converts_to_23() {
        assert_eq!(
            normalize_cpe("cpe:/a:OpenSSL:openssl:1.1.1"),
            "cpe:2.3:a:openssl:openssl:1.1.1:*:*:*:*:*:*:*"
        );
        assert_eq!(
            normalize_cpe("cpe:2.3:a:openssl:openssl:1.1.1:*:*:*:*:*:*:*"),
            "cpe:2.3:a:openssl:openssl:1.1.1:*:*:*:*:*:*:*"
        );
    }

    #[test]
    fn test_22_and_23_match() {
        let a = with_cpe("cpe:/a:openssl:openssl:1.1.1");
        let b = with_cpe("cpe:2.3:a:openssl:openssl:1.1.1:*:*:*:*:*:*:*");
        let matcher = CpeMatcher::new(false);
        assert!(matcher.is_match(&a, &b));
        assert_eq!(matcher.confidence(&a, &b), 90);
    }

    #[test]
    fn test_ignore_version() {
        let a = with_cpe("cpe:2.3:a:openssl:openssl:1.1.1:*:*:*:*:*:*:*");
        let b = with_cpe("cpe:2.3:a:openssl:openssl:3.0.0:*:*:*:*:*:*:*");
        assert!(!CpeMatcher::new(false).is_match(&a, &b));
        assert!(CpeMatcher::new(true).is_match(&a, &b));
    }

    #[test]
    fn test_wildcard_version_slot() {
        assert_eq!(
            wildcard_cpe_version("cpe:2.3:a:v:p:2.0:*:*:*:*:*:*:*"),
            "cpe:2.3:a:v:p:*:*:*:*:*:*:*:*"
        );
    }
}
