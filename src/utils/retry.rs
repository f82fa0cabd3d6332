//! Opt-in retry with exponential backoff for transient transport failures.

use std::time::Duration;
use tokio::time::sleep;

use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts, including the first; 1 means no retry
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

impl RetryConfig {
    /// A single attempt, errors surface immediately
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Delay before retry number `retry` (1-based).
    ///
    /// A multiplier below 1 (or NaN) is treated as 1.
    fn delay_for(&self, retry: u32) -> Duration {
        let multiplier = self.backoff_multiplier.max(1.0);
        let secs = self.initial_delay.as_secs_f64()
            * multiplier.powf(f64::from(retry.saturating_sub(1)));
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Transient errors that may succeed on a later attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TransientError {
    /// Connection, timeout or body read failure
    Transport,
    /// Too many requests (429)
    TooManyRequests,
    /// Server error (5xx)
    ServerError,
}

impl TransientError {
    /// Classify a [`SourceError`]; `None` means the error is permanent
    pub fn from_source_error(err: &SourceError) -> Option<Self> {
        match err {
            SourceError::Transport(_) => Some(TransientError::Transport),
            SourceError::Status { status, .. } if *status == 429 => {
                Some(TransientError::TooManyRequests)
            }
            SourceError::Status { status, .. } if (500..600).contains(status) => {
                Some(TransientError::ServerError)
            }
            _ => None,
        }
    }
}

/// Execute an async operation, retrying transient failures per `config`
pub async fn with_retry<T, F, Fut>(config: RetryConfig, mut operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::info!("Request succeeded on attempt {}", attempts);
                }
                return Ok(result);
            }
            Err(error) => {
                let transient = match TransientError::from_source_error(&error) {
                    Some(transient) => transient,
                    None => return Err(error),
                };

                if attempts >= config.max_attempts {
                    if config.max_attempts > 1 {
                        tracing::warn!("Request failed after {} attempts: {}", attempts, error);
                    }
                    return Err(error);
                }

                let delay = config.delay_for(attempts);
                tracing::debug!(
                    "Transient error on attempt {}: {:?}, retrying in {:?}",
                    attempts,
                    transient,
                    delay
                );
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn fast_config(attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts: attempts,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_disabled_retry_makes_one_attempt() {
        let call_count = Rc::new(RefCell::new(0));

        let result: Result<(), SourceError> = {
            let call_count = call_count.clone();
            with_retry(RetryConfig::default(), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Err(SourceError::Transport("connection refused".to_string()))
                }
            })
        }
        .await;

        assert!(matches!(result, Err(SourceError::Transport(_))));
        assert_eq!(*call_count.borrow(), 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let call_count = Rc::new(RefCell::new(0));

        let result = {
            let call_count = call_count.clone();
            with_retry(fast_config(4), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    if *call_count.borrow() < 3 {
                        Err(SourceError::Status {
                            status: 503,
                            endpoint: "elink".to_string(),
                        })
                    } else {
                        Ok("linked")
                    }
                }
            })
        }
        .await;

        assert_eq!(result.unwrap(), "linked");
        assert_eq!(*call_count.borrow(), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let call_count = Rc::new(RefCell::new(0));

        let result: Result<(), SourceError> = {
            let call_count = call_count.clone();
            with_retry(fast_config(5), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Err(SourceError::MalformedResponse("no records".to_string()))
                }
            })
        }
        .await;

        assert!(matches!(result, Err(SourceError::MalformedResponse(_))));
        assert_eq!(*call_count.borrow(), 1);
    }

    #[test]
    fn test_transient_error_detection() {
        let status = |status| SourceError::Status {
            status,
            endpoint: "idconv".to_string(),
        };

        assert_eq!(
            TransientError::from_source_error(&status(429)),
            Some(TransientError::TooManyRequests)
        );
        assert_eq!(
            TransientError::from_source_error(&status(502)),
            Some(TransientError::ServerError)
        );
        assert!(TransientError::from_source_error(&status(404)).is_none());
        assert!(
            TransientError::from_source_error(&SourceError::InvalidArgument("x".into())).is_none()
        );
    }

    #[test]
    fn test_negative_multiplier_does_not_shrink_delay() {
        let config = RetryConfig {
            backoff_multiplier: -2.0,
            ..fast_config(3)
        };
        assert_eq!(config.delay_for(1), Duration::from_millis(5));
        assert_eq!(config.delay_for(2), Duration::from_millis(5));

        let config = RetryConfig {
            backoff_multiplier: f64::NAN,
            ..fast_config(3)
        };
        assert_eq!(config.delay_for(3), Duration::from_millis(5));
    }

    #[test]
    fn test_backoff_is_bounded() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        };
        assert_eq!(config.delay_for(1), Duration::from_secs(1));
        assert_eq!(config.delay_for(2), Duration::from_secs(2));
        assert_eq!(config.delay_for(3), Duration::from_secs(4));
        assert_eq!(config.delay_for(4), Duration::from_secs(5));
    }
}
