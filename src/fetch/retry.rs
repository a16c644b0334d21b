//! Retry policy and the injectable clock used for every blocking wait.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::utils::constants::{
    DEFAULT_BACKOFF_BASE, DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_TIMEOUT_RETRY_DELAY_MS, MAX_BACKOFF_SECS,
};

/// Upper bound on any single wait.
pub const MAX_BACKOFF: Duration = Duration::from_secs(MAX_BACKOFF_SECS);

/// Backoff strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed { delay: Duration },
    /// `unit * base^attempt`, with `attempt` starting at 0, capped at [`MAX_BACKOFF`].
    Exponential { base: f64, unit: Duration },
}

impl Backoff {
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay.min(MAX_BACKOFF),
            Self::Exponential { base, unit } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let secs = unit.as_secs_f64() * base.powi(exponent);
                Duration::try_from_secs_f64(secs)
                    .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
            }
        }
    }
}

/// Retry budget and waits applied by [`RateLimitedFetcher`](super::RateLimitedFetcher).
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per lookup, including the first.
    pub max_attempts: u32,
    /// Wait after a 429 response.
    pub rate_limit_backoff: Backoff,
    /// Wait after a request timeout.
    pub timeout_backoff: Backoff,
    /// Per-attempt request timeout.
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_backoff: Backoff::Exponential {
                base: DEFAULT_BACKOFF_BASE,
                unit: Duration::from_secs(1),
            },
            timeout_backoff: Backoff::Fixed {
                delay: Duration::from_millis(DEFAULT_TIMEOUT_RETRY_DELAY_MS),
            },
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff_base(mut self, base: f64) -> Self {
        self.rate_limit_backoff = Backoff::Exponential {
            base,
            unit: Duration::from_secs(1),
        };
        self
    }

    pub fn with_timeout_delay(mut self, delay: Duration) -> Self {
        self.timeout_backoff = Backoff::Fixed { delay };
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        self.rate_limit_backoff.delay(attempt)
    }

    pub fn timeout_delay(&self, attempt: u32) -> Duration {
        self.timeout_backoff.delay(attempt)
    }

    pub fn is_last_attempt(&self, attempt: u32) -> bool {
        attempt + 1 >= self.max_attempts
    }
}

/// Clock abstraction for blocking waits. Tests substitute a recorder.
pub trait Sleeper: Send + Sync {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(tokio::time::sleep(duration))
    }
}
