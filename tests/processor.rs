//! End-to-end processor scenarios: full jobs in, wire-shaped results out.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use fetchguard::{
    JobResult, ProcessorBuilder, RejectReason, Resolve, ResolvedTarget,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Resolver stub that pins every hostname to a fixed address, standing in
/// for a DNS answer that validated cleanly.
struct PinnedResolver(SocketAddr);

#[async_trait]
impl Resolve for PinnedResolver {
    async fn resolve(&self, url: &Url) -> Result<ResolvedTarget, RejectReason> {
        Ok(ResolvedTarget {
            hostname: url
                .host_str()
                .ok_or(RejectReason::MissingHostname)?
                .to_string(),
            pinned_ip: self.0.ip(),
            port: self.0.port(),
            scheme: url.scheme().to_string(),
        })
    }
}

fn pinned_processor(server: &MockServer) -> fetchguard::JobProcessor {
    let resolver: Arc<dyn Resolve> = Arc::new(PinnedResolver(*server.address()));
    ProcessorBuilder::builder()
        .resolver(resolver)
        .build()
        .processor()
}

fn job_url(server: &MockServer, path: &str) -> String {
    format!("http://upstream.test:{}{path}", server.address().port())
}

#[tokio::test]
async fn successful_job_reports_status_elapsed_and_length() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello world"))
        .mount(&server)
        .await;

    let processor = pinned_processor(&server);
    let payload = json!({"url": job_url(&server, "/get"), "timeout": 5}).to_string();
    let result = processor.process(&payload).await;

    assert_eq!(result.status_code, Some(200));
    assert_eq!(result.content_length, Some(11));
    assert!(result.elapsed_ms.is_some());
    assert_eq!(result.error, None);
}

#[tokio::test]
async fn metadata_ip_job_is_rejected_with_exact_error() {
    // Real resolver: a literal metadata address needs no DNS
    let processor = ProcessorBuilder::default().processor();
    let result = processor
        .process(r#"{"url": "http://169.254.169.254/latest/meta-data/"}"#)
        .await;

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"error": "request not allowed: resolved to cloud metadata IP"})
    );
}

#[tokio::test]
async fn loopback_spellings_are_rejected_without_resolution() {
    let processor = ProcessorBuilder::default().processor();
    for host in [
        "localhost",
        "127.0.0.1",
        "[::1]",
        "0.0.0.0",
        "0177.0.0.1",
        "0x7f.0.0.1",
        "127.1",
        "2130706433",
    ] {
        let payload = json!({"url": format!("http://{host}/admin")}).to_string();
        let result = processor.process(&payload).await;
        assert_eq!(
            result.error.as_deref(),
            Some("request not allowed: loopback address not allowed"),
            "host {host} should have been denied"
        );
    }
}

#[tokio::test]
async fn eleventh_job_to_the_same_domain_hits_the_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let processor = pinned_processor(&server);
    let payload = json!({"url": job_url(&server, "/ping")}).to_string();

    for i in 0..10 {
        let result = processor.process(&payload).await;
        assert_eq!(result.status_code, Some(200), "job {i} should be admitted");
    }
    let result = processor.process(&payload).await;
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"error": "rate limit exceeded"})
    );
}

#[tokio::test]
async fn redirect_is_surfaced_and_location_is_never_contacted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/redir"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "http://169.254.169.254/"),
        )
        .mount(&server)
        .await;

    let processor = pinned_processor(&server);
    let payload = json!({"url": job_url(&server, "/redir")}).to_string();
    let result = processor.process(&payload).await;

    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"status_code": 301, "error": "redirects not allowed"})
    );
}

#[tokio::test]
async fn oversized_response_is_cut_off() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64 * 1024]))
        .mount(&server)
        .await;

    let resolver: Arc<dyn Resolve> = Arc::new(PinnedResolver(*server.address()));
    let processor = ProcessorBuilder::builder()
        .resolver(resolver)
        .max_response_bytes(1024u64)
        .build()
        .processor();

    let payload = json!({"url": job_url(&server, "/big")}).to_string();
    let result = processor.process(&payload).await;
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"error": "response too large"})
    );
}

#[tokio::test]
async fn kill_switch_rejects_after_validation() {
    let server = MockServer::start().await;
    let resolver: Arc<dyn Resolve> = Arc::new(PinnedResolver(*server.address()));
    let processor = ProcessorBuilder::builder()
        .resolver(resolver)
        .allow_external_requests(false)
        .build()
        .processor();

    let payload = json!({"url": job_url(&server, "/get")}).to_string();
    let result = processor.process(&payload).await;
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"error": "external requests disabled"})
    );
}

#[tokio::test]
async fn policy_excluded_hostname_is_rejected() {
    let processor = ProcessorBuilder::builder()
        .excludes(regex::RegexSet::new([r"\.corp$"]).unwrap())
        .build()
        .processor();

    let result = processor
        .process(r#"{"url": "http://intranet.corp/wiki"}"#)
        .await;
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"error": "request not allowed: hostname denied by policy"})
    );
}

#[tokio::test]
async fn malformed_payloads_never_crash_the_worker() {
    let processor = ProcessorBuilder::default().processor();

    assert_eq!(
        processor.process("definitely not json").await,
        JobResult::from(fetchguard::JobError::InvalidPayload)
    );
    assert_eq!(
        serde_json::to_value(processor.process(r#"{"method": "GET"}"#).await).unwrap(),
        json!({"error": "missing url"})
    );
    assert_eq!(
        processor
            .process_value(json!({"url": "http://example.com", "timeout": "soon"}))
            .await,
        JobResult::from(fetchguard::JobError::InvalidPayload)
    );
}
