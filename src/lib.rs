//! `fetchguard` is the outbound HTTP egress guard for a background job
//! worker: given a job description containing a target URL, it decides
//! whether the target is safe to contact, resolves it to a pinned IP exactly
//! once, executes the request under strict limits, and returns a bounded
//! result — while resisting SSRF, DNS rebinding, redirect-based escape, and
//! cloud-metadata access.
//!
//! "Hello world" example:
//! ```no_run
//! use fetchguard::ProcessorBuilder;
//!
//! #[tokio::main]
//! async fn main() {
//!     let processor = ProcessorBuilder::default().processor();
//!     let result = processor
//!         .process(r#"{"url": "http://example.com/get", "timeout": 5}"#)
//!         .await;
//!     println!("{}", serde_json::to_string(&result).unwrap());
//! }
//! ```
//!
//! For finer control, build the processor yourself:
//! ```no_run
//! use fetchguard::ProcessorBuilder;
//! use regex::RegexSet;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let processor = ProcessorBuilder::builder()
//!     .excludes(RegexSet::new([r"\.internal$"]).unwrap())
//!     .max_requests_per_window(5usize)
//!     .build()
//!     .processor();
//! # let _ = processor;
//! # }
//! ```
//!
//! The queue transport, result persistence, and metrics scraping are
//! external collaborators: the processor consumes one JSON payload per call
//! and hands back a [`JobResult`]; metrics go through the `metrics` facade.

pub mod classifier;
mod executor;
mod policy;
mod processor;
mod ratelimit;
mod resolver;
mod types;

pub mod observe;

pub use classifier::IpClass;
pub use executor::{
    DEFAULT_MAX_RESPONSE_BYTES, DEFAULT_USER_AGENT, MAX_TIMEOUT, RequestExecutor,
};
pub use policy::HostPolicy;
pub use processor::{JobProcessor, ProcessorBuilder};
pub use ratelimit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW, DomainKey, RateLimiter};
pub use resolver::{DnsResolver, Resolve};
pub use types::*;
