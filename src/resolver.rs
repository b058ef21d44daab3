//! Target resolution and validation.
//!
//! A target is resolved exactly once, every candidate address is validated,
//! and a single address is pinned for the connection. Re-resolving at
//! request time would let an attacker answer the validation lookup safely
//! and the connection lookup unsafely (DNS rebinding), so the pinned address
//! is the only one the executor ever sees.

use std::net::IpAddr;

use async_trait::async_trait;
use tokio::net::lookup_host;
use url::{Host, Url};

use crate::classifier::{classify, is_loopback_spelling};
use crate::policy::HostPolicy;
use crate::types::{RejectReason, ResolvedTarget};

/// Resolves a URL to a validated, pinned target.
///
/// A trait so that embedders and tests can swap in their own resolution
/// (e.g. a static table); production code uses [`DnsResolver`].
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Resolve and validate `url`, pinning one address.
    ///
    /// # Errors
    ///
    /// Returns a [`RejectReason`] when the target must not be contacted.
    async fn resolve(&self, url: &Url) -> Result<ResolvedTarget, RejectReason>;
}

impl std::fmt::Debug for dyn Resolve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Resolve")
    }
}

/// System-DNS backed resolver with hostname policy enforcement
#[derive(Debug, Clone, Default)]
pub struct DnsResolver {
    policy: HostPolicy,
}

impl DnsResolver {
    /// Create a resolver enforcing the given hostname policy
    #[must_use]
    pub const fn new(policy: HostPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Resolve for DnsResolver {
    async fn resolve(&self, url: &Url) -> Result<ResolvedTarget, RejectReason> {
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(RejectReason::SchemeNotAllowed);
        }

        // The denylist runs on the raw host string before anything else, so
        // no lookup ever happens for a loopback spelling. The url crate has
        // already normalized alternate numeric encodings (0x7f.0.0.1, 127.1,
        // 2130706433) down to 127.0.0.1 at parse time.
        let host_str = url.host_str().ok_or(RejectReason::MissingHostname)?;
        if is_loopback_spelling(host_str) {
            return Err(RejectReason::LoopbackSpelling);
        }
        if self.policy.is_denied(host_str) {
            return Err(RejectReason::DeniedByPolicy);
        }

        let port = url
            .port_or_known_default()
            .ok_or(RejectReason::SchemeNotAllowed)?;

        let (hostname, pinned_ip) = match url.host().ok_or(RejectReason::MissingHostname)? {
            // Literal addresses skip DNS and are classified directly
            Host::Ipv4(ip) => (host_str.to_string(), validate_literal(IpAddr::V4(ip))?),
            Host::Ipv6(ip) => (host_str.to_string(), validate_literal(IpAddr::V6(ip))?),
            Host::Domain(domain) => {
                // Exactly one lookup, covering both address families
                let addrs = lookup_host((domain, port)).await.map_err(|e| {
                    log::debug!("dns lookup for {domain} failed: {e}");
                    RejectReason::DnsError
                })?;
                let candidates: Vec<IpAddr> = addrs.map(|addr| addr.ip()).collect();
                let pinned = validate_candidates(domain, &candidates)?;
                (domain.to_string(), pinned)
            }
        };

        Ok(ResolvedTarget {
            hostname,
            pinned_ip,
            port,
            scheme: scheme.to_string(),
        })
    }
}

fn validate_literal(ip: IpAddr) -> Result<IpAddr, RejectReason> {
    let class = classify(ip);
    if class.is_public() {
        Ok(ip)
    } else {
        Err(RejectReason::DisallowedIp(class))
    }
}

/// Validate the complete DNS answer set and pin the first address.
///
/// A single disallowed candidate rejects the whole target. Skipping the bad
/// address and connecting to another would let an attacker register one safe
/// and one unsafe record and race the consumer.
fn validate_candidates(hostname: &str, candidates: &[IpAddr]) -> Result<IpAddr, RejectReason> {
    if candidates.is_empty() {
        return Err(RejectReason::NoAddresses);
    }
    for &ip in candidates {
        let class = classify(ip);
        if !class.is_public() {
            log::warn!("{hostname} resolved to a {class} address, rejecting target");
            return Err(RejectReason::DisallowedIp(class));
        }
    }
    Ok(candidates[0])
}
