//! Request execution against a pinned target.
//!
//! The executor never resolves a hostname. Plain-HTTP requests go to a URL
//! rebuilt around the pinned IP with the original hostname restored in the
//! `Host` header; HTTPS requests keep the original URL but override the
//! client's address book with the pinned socket address, so SNI and
//! certificate verification still run against the hostname while the socket
//! connects to the validated address.

use std::error::Error as _;
use std::time::{Duration, Instant};

use futures::StreamExt;
use http::header;
use reqwest::redirect;

use crate::types::{JobDescription, JobError, JobResult, ResolvedTarget};

/// Default ceiling on streamed response bytes, 10 MiB
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 10 * 1024 * 1024;
/// Hard maximum a job-supplied timeout is clamped to, 30 seconds
pub const MAX_TIMEOUT: Duration = Duration::from_secs(30);
/// Default user agent, `fetchguard/<PKG_VERSION>`
pub const DEFAULT_USER_AGENT: &str = concat!("fetchguard/", env!("CARGO_PKG_VERSION"));

/// Executes requests against resolved targets under strict limits
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    max_response_bytes: u64,
    max_timeout: Duration,
    user_agent: String,
}

impl RequestExecutor {
    /// Create an executor with the given response-size ceiling and timeout cap
    #[must_use]
    pub const fn new(max_response_bytes: u64, max_timeout: Duration, user_agent: String) -> Self {
        Self {
            max_response_bytes,
            max_timeout,
            user_agent,
        }
    }

    /// Clamp a job-supplied timeout to the configured hard maximum
    #[must_use]
    pub fn clamp_timeout(&self, requested: Duration) -> Duration {
        requested.min(self.max_timeout)
    }

    /// Execute the job's request against the pinned target.
    ///
    /// Redirects are never followed, TLS verification cannot be disabled,
    /// and the body is abandoned the moment it exceeds the size ceiling.
    ///
    /// # Errors
    ///
    /// - [`JobError::RedirectsNotAllowed`] on any 3xx response
    /// - [`JobError::ResponseTooLarge`] when the streamed body passes the ceiling
    /// - [`JobError::SslVerificationFailed`] on certificate errors
    /// - [`JobError::RequestFailed`] on timeouts and other transport failures
    pub async fn execute(
        &self,
        target: &ResolvedTarget,
        job: &JobDescription,
    ) -> Result<JobResult, JobError> {
        let timeout = self.clamp_timeout(job.timeout);
        let started = Instant::now();

        let builder = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .user_agent(&self.user_agent)
            .gzip(true);

        // Both arms connect to the pinned address; neither triggers DNS.
        let (builder, url) = if target.is_https() {
            (
                builder.resolve_to_addrs(&target.hostname, &[target.socket_addr()]),
                job.url.clone(),
            )
        } else {
            (builder, target.pinned_url(&job.url))
        };

        let client = builder.build().map_err(|e| {
            log::warn!("failed to build request client for {target}: {e}");
            JobError::RequestFailed
        })?;

        let mut request = client
            .request(job.method.clone(), url)
            .headers(job.headers.clone());
        if !target.is_https() && !job.headers.contains_key(header::HOST) {
            request = request.header(header::HOST, target.host_header());
        }

        let response = request.send().await.map_err(|e| classify_send_error(&e, target))?;
        let status = response.status();

        if status.is_redirection() {
            log::warn!("{target} answered {status}, refusing to follow redirect");
            return Err(JobError::RedirectsNotAllowed(status));
        }

        // Enforce the ceiling while streaming, not after a full read, so an
        // endless body cannot exhaust memory.
        let mut content_length: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                log::debug!("body stream from {target} failed: {e}");
                JobError::RequestFailed
            })?;
            content_length += chunk.len() as u64;
            if content_length > self.max_response_bytes {
                log::warn!(
                    "{target} exceeded the response ceiling of {} bytes, aborting",
                    self.max_response_bytes
                );
                return Err(JobError::ResponseTooLarge);
            }
        }

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(JobResult::success(
            status.as_u16(),
            elapsed_ms,
            content_length,
        ))
    }
}

impl Default for RequestExecutor {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_RESPONSE_BYTES,
            MAX_TIMEOUT,
            DEFAULT_USER_AGENT.to_string(),
        )
    }
}

// Surface TLS-verification failures distinctly, everything else collapses
// into the generic failure so no transport internals leak into job results.
fn classify_send_error(err: &reqwest::Error, target: &ResolvedTarget) -> JobError {
    if is_tls_error(err) {
        log::warn!("certificate verification failed for {target}");
        return JobError::SslVerificationFailed;
    }
    if err.is_timeout() {
        log::debug!("request to {target} timed out");
    } else {
        log::debug!("request to {target} failed: {err}");
    }
    JobError::RequestFailed
}

// reqwest does not expose the TLS backend's error type, so walk the source
// chain and look for certificate language from either backend.
fn is_tls_error(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string().to_lowercase();
        if text.contains("certificate") || text.contains("ssl") || text.contains("tls") {
            return true;
        }
        source = inner.source();
    }
    false
}
