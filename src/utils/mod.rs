//! Utility modules supporting the PMC client.
//!
//! - [`HttpClient`]: reqwest client with explicit timeouts and status mapping
//! - [`Throttle`]: fixed pauses after batched and single-item requests
//! - [`RetryConfig`] / [`with_retry`]: opt-in retry of transient failures
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use citation_graph::utils::{with_retry, RetryConfig};
//! use citation_graph::sources::SourceError;
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let config = RetryConfig::default().max_attempts(3);
//! let body = with_retry(config, || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod http;
mod retry;
mod throttle;

pub use http::HttpClient;
pub use retry::{with_retry, RetryConfig, TransientError};
pub use throttle::Throttle;
