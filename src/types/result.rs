use serde::Serialize;

use super::JobError;

/// Outcome of a processed job, in the shape the result store expects.
///
/// Exactly one of the success fields or `error` is populated; redirect
/// rejections additionally surface the status code that was not followed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct JobResult {
    /// HTTP status code of a completed request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Wall-clock duration of the request in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    /// Number of body bytes streamed from the target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    /// Rejection or failure, drawn from the fixed error vocabulary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    /// A successful request
    #[must_use]
    pub const fn success(status_code: u16, elapsed_ms: u64, content_length: u64) -> Self {
        Self {
            status_code: Some(status_code),
            elapsed_ms: Some(elapsed_ms),
            content_length: Some(content_length),
            error: None,
        }
    }

    /// Whether this result carries an error
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<&JobError> for JobResult {
    fn from(err: &JobError) -> Self {
        Self {
            status_code: err.status_code().map(|code| code.as_u16()),
            elapsed_ms: None,
            content_length: None,
            error: Some(err.to_string()),
        }
    }
}

impl From<JobError> for JobResult {
    fn from(err: JobError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn success_serializes_without_error_field() {
        let json = serde_json::to_value(JobResult::success(200, 132, 5120)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status_code": 200, "elapsed_ms": 132, "content_length": 5120})
        );
    }

    #[test]
    fn error_serializes_without_success_fields() {
        let json = serde_json::to_value(JobResult::from(JobError::RateLimitExceeded)).unwrap();
        assert_eq!(json, serde_json::json!({"error": "rate limit exceeded"}));
    }

    #[test]
    fn redirect_error_carries_status_code() {
        let json = serde_json::to_value(JobResult::from(JobError::RedirectsNotAllowed(
            StatusCode::FOUND,
        )))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status_code": 302, "error": "redirects not allowed"})
        );
    }
}
