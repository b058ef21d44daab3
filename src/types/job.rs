use std::collections::HashMap;
use std::time::Duration;

use http::Method;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use url::Url;

use super::JobError;

/// Default request timeout in seconds when the job does not supply one
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Raw wire shape of a job payload as pushed by the queue
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawJob {
    url: Option<String>,
    method: Option<String>,
    headers: Option<HashMap<String, String>>,
    timeout: Option<u64>,
}

/// A validated job description.
///
/// Built by a single fallible parse step ([`JobDescription::parse`]), which
/// is the sole source of `invalid payload` and `missing url` rejections.
/// Immutable once constructed.
#[derive(Debug, Clone)]
pub struct JobDescription {
    /// The target URL as supplied by the submitter
    pub url: Url,
    /// HTTP method, `GET` when unspecified
    pub method: Method,
    /// Additional request headers
    pub headers: HeaderMap,
    /// Requested timeout; clamped to a hard maximum before use
    pub timeout: Duration,
}

impl JobDescription {
    /// Parse and validate a JSON job payload.
    ///
    /// # Errors
    ///
    /// - [`JobError::InvalidPayload`] for malformed JSON, unknown fields,
    ///   unparsable methods or header names/values
    /// - [`JobError::MissingUrl`] when the `url` field is absent or empty
    /// - `request not allowed: invalid url` when the URL does not parse
    pub fn parse(payload: &str) -> Result<Self, JobError> {
        let raw: RawJob = serde_json::from_str(payload).map_err(|e| {
            log::debug!("rejecting malformed job payload: {e}");
            JobError::InvalidPayload
        })?;
        Self::from_raw(raw)
    }

    /// Like [`JobDescription::parse`], for payloads that arrive pre-parsed
    /// from the queue transport.
    ///
    /// # Errors
    ///
    /// Same as [`JobDescription::parse`].
    pub fn from_value(payload: serde_json::Value) -> Result<Self, JobError> {
        let raw: RawJob =
            serde_json::from_value(payload).map_err(|_| JobError::InvalidPayload)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawJob) -> Result<Self, JobError> {
        let url = match raw.url {
            Some(url) if !url.is_empty() => url,
            _ => return Err(JobError::MissingUrl),
        };
        let url = Url::parse(&url)
            .map_err(|_| JobError::from(super::RejectReason::InvalidUrl))?;

        let method = match raw.method {
            Some(method) => Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|_| JobError::InvalidPayload)?,
            None => Method::GET,
        };

        let mut headers = HeaderMap::new();
        for (name, value) in raw.headers.unwrap_or_default() {
            let name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|_| JobError::InvalidPayload)?;
            let value = HeaderValue::from_str(&value).map_err(|_| JobError::InvalidPayload)?;
            headers.insert(name, value);
        }

        let timeout = Duration::from_secs(raw.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS));

        Ok(Self {
            url,
            method,
            headers,
            timeout,
        })
    }
}
