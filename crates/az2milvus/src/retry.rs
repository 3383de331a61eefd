//! Retry with exponential backoff for connector calls.
//!
//! Azure AI Search throttles with HTTP 429/503 and Milvus proxies return
//! transient 5xx under load. Extraction, counting and inserts go through
//! [`with_retry`]; everything else fails on the first error.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any delay.
    pub max_delay: Duration,
    /// Growth factor between retries.
    pub backoff_multiplier: f64,
    /// Add up to 25% jitter.
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Default backoff with the given retry budget.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// No retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Delay before retry number `attempt` (1-based). Zero for attempt 0.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());

        let delay = if self.add_jitter {
            capped + capped * 0.25 * rand_jitter()
        } else {
            capped
        };
        Duration::from_secs_f64(delay)
    }

    /// Delay before retrying `error`: the server's hint for rate limits,
    /// else the backoff schedule.
    #[must_use]
    pub fn delay_for_error(&self, attempt: u32, error: &Error) -> Duration {
        match error {
            Error::RateLimit(secs) if *secs > 0 => {
                Duration::from_secs(*secs).min(self.max_delay.max(Duration::from_secs(1)))
            }
            _ => self.delay_for_attempt(attempt),
        }
    }
}

/// Pseudo-random value in `[0, 1)` from the clock.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos % 1000) / 1000.0
}

fn transient_message(msg: &str) -> bool {
    const PATTERNS: &[&str] = &[
        "429",
        "rate limit",
        "too many requests",
        "timeout",
        "timed out",
        "connection refused",
        "connection reset",
        "temporar",
        "500",
        "502",
        "503",
        "504",
        "internal server error",
        "bad gateway",
        "service unavailable",
    ];
    let msg = msg.to_lowercase();
    PATTERNS.iter().any(|p| msg.contains(p))
}

/// Returns true when the error may succeed on a later attempt.
#[must_use]
pub fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::RateLimit(_) | Error::Io(_) => true,
        Error::Http(e) => e.is_timeout() || e.is_connect() || transient_message(&e.to_string()),
        Error::SourceConnection(msg)
        | Error::DestinationConnection(msg)
        | Error::Extraction(msg)
        | Error::Loading(msg) => transient_message(msg),
        Error::Config(_)
        | Error::Authentication(_)
        | Error::NotConnected(_)
        | Error::Checkpoint(_)
        | Error::CheckpointLocked { .. }
        | Error::Cancelled
        | Error::Json(_)
        | Error::Yaml(_) => false,
    }
}

/// Runs `operation`, retrying retryable errors up to `config.max_retries` times.
///
/// # Errors
///
/// Returns the first non-retryable error, or the last error once retries run out.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation_name: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(operation = operation_name, retries = attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < config.max_retries && is_retryable_error(&e) => {
                attempt += 1;
                let delay = config.delay_for_error(attempt, &e);
                warn!(
                    operation = operation_name,
                    attempt,
                    max_retries = config.max_retries,
                    ?delay,
                    error = %e,
                    "Retrying after transient error"
                );
                sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
