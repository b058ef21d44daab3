use std::fmt;
use std::net::{IpAddr, SocketAddr};

use url::Url;

/// A validated target with a single pinned address.
///
/// Created exactly once per job by the resolver. The pinned address is what
/// the executor literally connects to; the hostname survives only for the
/// `Host` header and TLS server-name verification. It is never handed back
/// to name resolution, which is the core anti-rebinding invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Hostname as it appeared in the job URL
    pub hostname: String,
    /// The one address validation selected for the connection
    pub pinned_ip: IpAddr,
    /// Effective port (explicit, or the scheme default)
    pub port: u16,
    /// `http` or `https`
    pub scheme: String,
}

impl ResolvedTarget {
    /// The literal connection target
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.pinned_ip, self.port)
    }

    /// Whether this target requires a TLS connection
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.scheme == "https"
    }

    /// Rebuild the request URL with the pinned IP in place of the hostname,
    /// preserving path and query. IPv6 addresses come out bracketed.
    #[must_use]
    pub fn pinned_url(&self, original: &Url) -> Url {
        let mut url = original.clone();
        // Cannot fail: http(s) URLs always take a host
        url.set_ip_host(self.pinned_ip)
            .expect("http(s) URL refused an IP host");
        url
    }

    /// The `Host` header value for virtual-hosting correctness: the original
    /// hostname, with the port attached when it is not the scheme default.
    #[must_use]
    pub fn host_header(&self) -> String {
        let default_port = if self.is_https() { 443 } else { 80 };
        if self.port == default_port {
            self.hostname.clone()
        } else {
            format!("{}:{}", self.hostname, self.port)
        }
    }
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.hostname, self.socket_addr())
    }
}
