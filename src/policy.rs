//! Pluggable hostname allow/deny policy.
//!
//! Evaluated against the hostname alone, before any DNS lookup. An
//! `includes` match always admits a hostname and takes precedence over
//! `excludes`; with no rules configured, every hostname is admitted and the
//! address classification remains the only gate.

use regex::RegexSet;

/// Hostname allow/deny rules
#[derive(Debug, Clone, Default)]
pub struct HostPolicy {
    /// Hostnames matching this set are always admitted
    pub includes: Option<RegexSet>,
    /// Hostnames matching this set are denied, unless also included
    pub excludes: Option<RegexSet>,
}

impl HostPolicy {
    #[inline]
    fn is_includes_match(&self, hostname: &str) -> bool {
        matches!(self.includes, Some(ref set) if set.is_match(hostname))
    }

    #[inline]
    fn is_excludes_match(&self, hostname: &str) -> bool {
        matches!(self.excludes, Some(ref set) if set.is_match(hostname))
    }

    /// Whether the given hostname is denied by this policy
    #[must_use]
    pub fn is_denied(&self, hostname: &str) -> bool {
        if self.is_includes_match(hostname) {
            // Includes take precedence over excludes
            return false;
        }
        self.is_excludes_match(hostname)
    }
}

#[cfg(test)]
mod tests {
    use regex::RegexSet;

    use super::*;

    #[test]
    fn empty_policy_admits_everything() {
        let policy = HostPolicy::default();
        assert!(!policy.is_denied("example.com"));
        assert!(!policy.is_denied("internal.corp"));
    }

    #[test]
    fn excludes_deny_matching_hostnames() {
        let policy = HostPolicy {
            excludes: Some(RegexSet::new([r"\.corp$", r"^internal\."]).unwrap()),
            ..HostPolicy::default()
        };

        assert!(policy.is_denied("intranet.corp"));
        assert!(policy.is_denied("internal.example.com"));
        assert!(!policy.is_denied("example.com"));
    }

    #[test]
    fn includes_take_precedence_over_excludes() {
        let policy = HostPolicy {
            includes: Some(RegexSet::new([r"^api\.partner\.corp$"]).unwrap()),
            excludes: Some(RegexSet::new([r"\.corp$"]).unwrap()),
        };

        assert!(!policy.is_denied("api.partner.corp"));
        assert!(policy.is_denied("db.partner.corp"));
    }
}
