//! IP address classification for egress decisions.
//!
//! Every candidate address a target resolves to is put into exactly one
//! [`IpClass`]. Only [`IpClass::Public`] addresses are eligible for an
//! outbound connection; everything else rejects the whole target.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::types::RejectReason;

/// Hostname spellings that always mean the local host.
///
/// Textual alternate encodings of `127.0.0.1` (octal, hex, shortened,
/// decimal) bypass naive string comparison but not numeric parsing, so they
/// are denied as strings before any DNS lookup happens.
static LOOPBACK_SPELLINGS: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "::1",
    "0.0.0.0",
    "::",
    "0177.0.0.1",
    "0x7f.0.0.1",
    "127.1",
    "2130706433",
];

/// The scope of an IP address, as far as egress safety is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum IpClass {
    /// Globally routable; the only class eligible for egress
    #[strum(serialize = "public")]
    Public,
    /// RFC 1918 (IPv4) or unique local `fc00::/7` (IPv6)
    #[strum(serialize = "private")]
    Private,
    /// `127.0.0.0/8` or `::1`
    #[strum(serialize = "loopback")]
    Loopback,
    /// Link-local scope outside the cloud-metadata ranges
    #[strum(serialize = "link-local")]
    LinkLocal,
    /// `240.0.0.0/4`, including the broadcast address
    #[strum(serialize = "reserved")]
    Reserved,
    /// `224.0.0.0/4` or `ff00::/8`
    #[strum(serialize = "multicast")]
    Multicast,
    /// `0.0.0.0` or `::`
    #[strum(serialize = "unspecified")]
    Unspecified,
    /// Cloud instance-metadata ranges: `169.254.0.0/16` (AWS/Azure/GCP),
    /// `fd00:ec2::/32` (AWS IPv6), `fe80::/10`
    #[strum(serialize = "cloud metadata")]
    CloudMetadata,
}

impl IpClass {
    /// Whether an address of this class may be connected to
    #[inline]
    #[must_use]
    pub const fn is_public(self) -> bool {
        matches!(self, IpClass::Public)
    }
}

/// Classify an address into its [`IpClass`].
///
/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are classified as their
/// embedded IPv4 address, so `::ffff:127.0.0.1` is still [`IpClass::Loopback`].
#[must_use]
pub fn classify(ip: IpAddr) -> IpClass {
    match ip {
        IpAddr::V4(v4) => classify_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => classify_v4(v4),
            None => classify_v6(v6),
        },
    }
}

/// Classify a textual address literal.
///
/// # Errors
///
/// Returns [`RejectReason::InvalidIpLiteral`] if the input does not parse as
/// an IPv4 or IPv6 address. A malformed literal is never treated as public.
pub fn classify_str(input: &str) -> Result<IpClass, RejectReason> {
    input
        .parse::<IpAddr>()
        .map(classify)
        .map_err(|_| RejectReason::InvalidIpLiteral(input.to_string()))
}

/// Whether the given hostname is a known spelling of the local host.
///
/// Case-insensitive and tolerant of the bracketed IPv6 notation that
/// `Url::host_str` yields (`[::1]`).
#[must_use]
pub fn is_loopback_spelling(hostname: &str) -> bool {
    let hostname = hostname
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_ascii_lowercase();
    LOOPBACK_SPELLINGS.contains(&hostname.as_str())
}

// The cloud-metadata check runs before the plain link-local predicates:
// 169.254.169.254 must surface as "cloud metadata", not "link-local".
fn classify_v4(ip: Ipv4Addr) -> IpClass {
    if ip.is_unspecified() {
        IpClass::Unspecified
    } else if ip.is_loopback() {
        IpClass::Loopback
    } else if ip.is_link_local() {
        // 169.254.0.0/16 doubles as the instance-metadata range on
        // AWS, Azure and GCP
        IpClass::CloudMetadata
    } else if ip.is_private() {
        IpClass::Private
    } else if ip.is_multicast() {
        IpClass::Multicast
    } else if ip.octets()[0] >= 240 {
        IpClass::Reserved
    } else {
        IpClass::Public
    }
}

fn classify_v6(ip: Ipv6Addr) -> IpClass {
    let segments = ip.segments();
    if ip.is_unspecified() {
        IpClass::Unspecified
    } else if ip.is_loopback() {
        IpClass::Loopback
    } else if segments[0] == 0xfd00 && segments[1] == 0x0ec2 {
        // fd00:ec2::/32, the AWS IPv6 metadata endpoint
        IpClass::CloudMetadata
    } else if (segments[0] & 0xffc0) == 0xfe80 {
        // fe80::/10 covers the IPv6 flavor of the metadata service
        IpClass::CloudMetadata
    } else if ip.is_unique_local() {
        IpClass::Private
    } else if ip.is_multicast() {
        IpClass::Multicast
    } else {
        IpClass::Public
    }
}
