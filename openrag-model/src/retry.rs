use openrag_core::OpenRagError;
use std::{fmt::Display, future::Future, time::Duration};

/// Bounded exponential backoff shared by model transports and structured
/// output calls.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub enabled: bool,
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f32,
    /// Upper bound on a single attempt. Callers wrap each attempt with it;
    /// `None` lets an attempt run indefinitely.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            attempt_timeout: None,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub fn with_backoff_multiplier(mut self, backoff_multiplier: f32) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }

    #[must_use]
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = Some(attempt_timeout);
        self
    }

    /// Total number of attempts the loop may make, first try included.
    pub fn max_attempts(&self) -> u32 {
        if self.enabled { self.max_retries.saturating_add(1) } else { 1 }
    }
}

#[must_use]
pub fn is_retryable_status_code(status_code: u16) -> bool {
    matches!(status_code, 408 | 429 | 500 | 502 | 503 | 504)
}

/// Fragments of transport and server error messages that indicate a
/// transient failure.
const TRANSIENT_MARKERS: &[&str] = &[
    "408",
    "429",
    "500",
    "502",
    "503",
    "504",
    "RATE LIMIT",
    "TOO MANY REQUESTS",
    "UNAVAILABLE",
    "TIMEOUT",
    "TIMED OUT",
    "CONNECTION REFUSED",
    "CONNECTION RESET",
    "RETRYABLE",
];

/// Whether an error message names a transient failure. Messages that
/// explicitly say "non-retryable" never match.
#[must_use]
pub fn is_retryable_error_message(message: &str) -> bool {
    let upper = message.to_ascii_uppercase();
    if upper.contains("NON-RETRYABLE") {
        return false;
    }
    TRANSIENT_MARKERS.iter().any(|marker| upper.contains(marker))
}

#[must_use]
pub fn is_retryable_model_error(error: &OpenRagError) -> bool {
    match error {
        OpenRagError::Model(message) => is_retryable_error_message(message),
        _ => false,
    }
}

fn next_retry_delay(current: Duration, retry_config: &RetryConfig) -> Duration {
    if current >= retry_config.max_delay {
        return retry_config.max_delay;
    }

    let multiplier = retry_config.backoff_multiplier.max(1.0) as f64;
    let scaled = Duration::from_secs_f64(current.as_secs_f64() * multiplier);
    scaled.min(retry_config.max_delay)
}

/// Runs `operation` until it succeeds, fails with an error `classify_error`
/// rejects, or `max_retries` retries have been spent. The last error is
/// returned unchanged.
pub async fn execute_with_retry<T, E, Op, Fut, Classify>(
    retry_config: &RetryConfig,
    classify_error: Classify,
    mut operation: Op,
) -> Result<T, E>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Classify: Fn(&E) -> bool,
    E: Display,
{
    if !retry_config.enabled {
        return operation().await;
    }

    let mut attempt: u32 = 0;
    let mut delay = retry_config.initial_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < retry_config.max_retries && classify_error(&error) => {
                attempt += 1;
                tracing::warn!(
                    attempt = attempt,
                    max_retries = retry_config.max_retries,
                    delay_ms = delay.as_millis(),
                    error = %error,
                    "Request failed with retryable error; retrying"
                );
                tokio::time::sleep(delay).await;
                delay = next_retry_delay(delay, retry_config);
            }
            Err(error) => return Err(error),
        }
    }
}
