use http::StatusCode;
use thiserror::Error;

use crate::classifier::IpClass;

/// Why a target was refused before any request was attempted.
///
/// Rendered inside the `request not allowed: <reason>` error string, so the
/// `Display` output is part of the wire vocabulary and must stay stable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RejectReason {
    /// The URL in the job payload could not be parsed
    #[error("invalid url")]
    InvalidUrl,
    /// Only `http` and `https` targets may be contacted
    #[error("scheme not allowed")]
    SchemeNotAllowed,
    /// The URL carries no hostname
    #[error("missing hostname")]
    MissingHostname,
    /// The hostname is a known spelling of the local host
    /// (see [`crate::classifier::is_loopback_spelling`])
    #[error("loopback address not allowed")]
    LoopbackSpelling,
    /// The hostname was denied by the configured [`crate::HostPolicy`]
    #[error("hostname denied by policy")]
    DeniedByPolicy,
    /// The address literal could not be parsed; unknown is unsafe
    #[error("invalid ip literal: {0}")]
    InvalidIpLiteral(String),
    /// The DNS lookup failed or timed out. Fail closed: a transient DNS
    /// failure is a rejection here, retry policy belongs to the queue layer.
    #[error("dns resolution failed")]
    DnsError,
    /// The DNS lookup succeeded but returned no addresses
    #[error("dns returned no addresses")]
    NoAddresses,
    /// At least one candidate address fell into a disallowed class
    #[error("resolved to {0} IP")]
    DisallowedIp(IpClass),
}

/// Everything that can terminate a job short of a 2xx/4xx/5xx response.
///
/// The `Display` output is the fixed error vocabulary written into the
/// [`JobResult`](crate::JobResult); it deliberately never contains resolved
/// addresses, exception text, or anything else from the transport layer.
#[derive(Error, Debug, Clone, PartialEq, Eq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[non_exhaustive]
pub enum JobError {
    /// The job payload was not a well-formed job description
    #[error("invalid payload")]
    InvalidPayload,
    /// The job payload carried no URL
    #[error("missing url")]
    MissingUrl,
    /// The per-domain sliding window is exhausted
    #[error("rate limit exceeded")]
    RateLimitExceeded,
    /// Target validation refused the request
    #[error("request not allowed: {0}")]
    NotAllowed(#[from] RejectReason),
    /// Outbound requests are switched off for this worker
    #[error("external requests disabled")]
    ExternalRequestsDisabled,
    /// The target answered with a 3xx; the redirect was not followed
    #[error("redirects not allowed")]
    RedirectsNotAllowed(StatusCode),
    /// The streamed body exceeded the response-size ceiling
    #[error("response too large")]
    ResponseTooLarge,
    /// Certificate verification failed during the TLS handshake
    #[error("ssl verification failed")]
    SslVerificationFailed,
    /// Any other network or protocol failure after a legitimate attempt
    #[error("request failed")]
    RequestFailed,
}

impl JobError {
    /// Whether this is a policy/validation rejection: no attempt was made,
    /// or the attempt was discarded (redirects). Rejections feed the
    /// blocked-requests counter; failures do not.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            JobError::InvalidPayload
                | JobError::MissingUrl
                | JobError::RateLimitExceeded
                | JobError::NotAllowed(_)
                | JobError::ExternalRequestsDisabled
                | JobError::RedirectsNotAllowed(_)
        )
    }

    /// Whether this is a network/protocol failure after a legitimate attempt
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        !self.is_rejection()
    }

    /// Stable snake_case label for the blocked-requests counter
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        self.into()
    }

    /// The HTTP status code attached to this error, if any
    #[must_use]
    pub const fn status_code(&self) -> Option<StatusCode> {
        match self {
            JobError::RedirectsNotAllowed(code) => Some(*code),
            _ => None,
        }
    }
}
