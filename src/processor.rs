//! Job orchestration.
//!
//! A job moves through `received → rate_checked → resolved → executed` and
//! ends as success, rejected (policy/validation said no, or the attempt was
//! discarded), or failed (a legitimate attempt the target refused). Every
//! rejection increments the blocked counter with its reason and hostname.

use std::sync::Arc;
use std::time::{Duration, Instant};

use regex::RegexSet;
use tokio::time::timeout;
use typed_builder::TypedBuilder;

use crate::executor::{
    DEFAULT_MAX_RESPONSE_BYTES, DEFAULT_USER_AGENT, MAX_TIMEOUT, RequestExecutor,
};
use crate::observe;
use crate::policy::HostPolicy;
use crate::ratelimit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW, DomainKey, RateLimiter};
use crate::resolver::{DnsResolver, Resolve};
use crate::types::{JobDescription, JobError, JobResult, RejectReason};

/// Builder for [`JobProcessor`].
///
/// All fields have production defaults; a bare
/// `ProcessorBuilder::builder().build().processor()` yields a worker-ready
/// processor.
#[derive(TypedBuilder, Debug)]
#[builder(field_defaults(default, setter(into)))]
pub struct ProcessorBuilder {
    /// Hostnames matching this set are always admitted by the policy.
    ///
    /// This has higher precedence over [`ProcessorBuilder::excludes`], but
    /// never bypasses address classification.
    includes: Option<RegexSet>,
    /// Hostnames matching this set are denied, unless they also match
    /// [`ProcessorBuilder::includes`].
    excludes: Option<RegexSet>,
    /// Kill switch for all outbound requests. When `false`, jobs are
    /// rejected after validation with `external requests disabled`.
    #[builder(default = true)]
    allow_external_requests: bool,
    /// Sliding-window length for per-domain rate limiting.
    #[builder(default = DEFAULT_WINDOW)]
    rate_limit_window: Duration,
    /// Admissions per domain per window.
    #[builder(default = DEFAULT_MAX_REQUESTS)]
    max_requests_per_window: usize,
    /// Ceiling on streamed response bytes.
    #[builder(default = DEFAULT_MAX_RESPONSE_BYTES)]
    max_response_bytes: u64,
    /// Hard cap that job-supplied timeouts are clamped to.
    #[builder(default = MAX_TIMEOUT)]
    max_timeout: Duration,
    /// User agent sent with every request.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,
    /// Replacement resolver, mainly for tests and embedders with their own
    /// name resolution. Defaults to [`DnsResolver`] with the configured
    /// hostname policy.
    resolver: Option<Arc<dyn Resolve>>,
}

impl Default for ProcessorBuilder {
    #[must_use]
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ProcessorBuilder {
    /// Instantiate a [`JobProcessor`].
    #[must_use]
    pub fn processor(self) -> JobProcessor {
        let resolver = self.resolver.unwrap_or_else(|| {
            Arc::new(DnsResolver::new(HostPolicy {
                includes: self.includes,
                excludes: self.excludes,
            }))
        });

        JobProcessor {
            limiter: RateLimiter::new(self.rate_limit_window, self.max_requests_per_window),
            resolver,
            executor: RequestExecutor::new(
                self.max_response_bytes,
                self.max_timeout,
                self.user_agent,
            ),
            allow_external_requests: self.allow_external_requests,
        }
    }
}

/// Processes job descriptions pulled from the external queue.
///
/// Shared across worker tasks; the rate limiter's per-domain windows are the
/// only mutable state crossing job boundaries.
#[derive(Debug)]
pub struct JobProcessor {
    limiter: RateLimiter,
    resolver: Arc<dyn Resolve>,
    executor: RequestExecutor,
    allow_external_requests: bool,
}

impl JobProcessor {
    /// Process one JSON job payload to completion.
    ///
    /// Never panics and never errors at the call site: every outcome,
    /// including malformed input, comes back as a [`JobResult`].
    pub async fn process(&self, payload: &str) -> JobResult {
        self.process_parsed(JobDescription::parse(payload)).await
    }

    /// Like [`JobProcessor::process`], for payloads that arrive pre-parsed
    /// from the queue transport.
    pub async fn process_value(&self, payload: serde_json::Value) -> JobResult {
        self.process_parsed(JobDescription::from_value(payload)).await
    }

    async fn process_parsed(&self, parsed: Result<JobDescription, JobError>) -> JobResult {
        let started = Instant::now();
        observe::record_job_received();

        let (result, hostname) = match self.run(parsed).await {
            Ok((result, hostname)) => (result, hostname),
            Err((err, hostname)) => {
                if err.is_rejection() {
                    log::warn!(
                        "job for {} rejected: {err}",
                        hostname.as_deref().unwrap_or("<unknown>")
                    );
                    observe::record_blocked(
                        err.metric_label(),
                        hostname.as_deref().unwrap_or("unknown"),
                    );
                } else {
                    log::debug!(
                        "job for {} failed: {err}",
                        hostname.as_deref().unwrap_or("<unknown>")
                    );
                }
                (JobResult::from(err), hostname)
            }
        };

        observe::record_job_duration(started.elapsed());
        log::debug!(
            "processed job for {} in {:?}",
            hostname.as_deref().unwrap_or("<unknown>"),
            started.elapsed()
        );
        result
    }

    // The state machine proper. The hostname travels alongside both arms so
    // the caller can label metrics without re-parsing the payload.
    async fn run(
        &self,
        parsed: Result<JobDescription, JobError>,
    ) -> Result<(JobResult, Option<String>), (JobError, Option<String>)> {
        // received → rejected: malformed payload, missing URL
        let job = parsed.map_err(|e| (e, None))?;

        let domain = DomainKey::try_from(&job.url)
            .map_err(|reason| (JobError::from(reason), None))?;
        let hostname = Some(domain.as_str().to_string());

        // received → rate_checked; admission counts even if the job later
        // times out
        if !self.limiter.allow(&domain) {
            return Err((JobError::RateLimitExceeded, hostname));
        }

        // rate_checked → resolved; resolution respects the clamped timeout,
        // and an expired lookup is a rejection like any other DNS failure
        let resolve_timeout = self.executor.clamp_timeout(job.timeout);
        let target = match timeout(resolve_timeout, self.resolver.resolve(&job.url)).await {
            Err(_) => return Err((JobError::from(RejectReason::DnsError), hostname)),
            Ok(Err(reason)) => return Err((JobError::from(reason), hostname)),
            Ok(Ok(target)) => target,
        };

        // resolved → rejected: worker-level kill switch
        if !self.allow_external_requests {
            return Err((JobError::ExternalRequestsDisabled, hostname));
        }

        // resolved → executed → success | failed
        match self.executor.execute(&target, &job).await {
            Ok(result) => Ok((result, hostname)),
            Err(err) => Err((err, hostname)),
        }
    }
}
