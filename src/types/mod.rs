#![allow(unreachable_pub)]

mod error;
mod job;
mod result;
mod target;

pub use error::{JobError, RejectReason};
pub use job::{DEFAULT_TIMEOUT_SECS, JobDescription};
pub use result::JobResult;
pub use target::ResolvedTarget;

/// The fetchguard `Result` type
pub type Result<T> = std::result::Result<T, crate::JobError>;
