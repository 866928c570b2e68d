//! Utility modules for the M3U Aggregator

pub mod jitter;
pub mod retry;
pub mod url;

pub use jitter::generate_jitter_percent;
pub use retry::{with_retry, RetryConfig, RetryFailure, RetryOutcome, Retryable};
pub use url::UrlUtils;
