use std::ops::ControlFlow;
use std::time::Duration;

use quanta::Clock;

use crate::ConfigError;
use crate::FixedWindow;
use crate::LeakyBucket;
use crate::Reason;
use crate::SlidingLog;
use crate::Strategy;
use crate::TokenBucket;

/// Immutable parameters for one of the limiting algorithms.
///
/// A [`crate::Registry`] builds one [`Limiter`] per client key from a single config.
#[derive(Debug, Clone, PartialEq)]
pub enum LimiterConfig {
    FixedWindow { limit: usize, window: Duration },
    SlidingLog { limit: usize, window: Duration },
    /// `rate` is in units drained per second.
    LeakyBucket { capacity: usize, rate: u64 },
    /// `rate` is in tokens added per second.
    TokenBucket { rate: f64, burst: usize },
}

impl LimiterConfig {
    /// Short algorithm name, used for logs and metric attributes.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FixedWindow { .. } => "fixed_window",
            Self::SlidingLog { .. } => "sliding_log",
            Self::LeakyBucket { .. } => "leaky_bucket",
            Self::TokenBucket { .. } => "token_bucket",
        }
    }

    /// Checks the parameters without building a limiter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::FixedWindow { limit, window } => FixedWindow::validate(limit, window),
            Self::SlidingLog { limit, window } => SlidingLog::validate(limit, window),
            Self::LeakyBucket { capacity, rate } => LeakyBucket::validate(capacity, rate),
            Self::TokenBucket { rate, burst } => TokenBucket::validate(rate, burst),
        }
    }

    /// Builds a fresh limiter that reads time from `clock`.
    pub fn build(&self, clock: &Clock) -> Result<Limiter, ConfigError> {
        self.validate()?;
        Ok(self.instantiate(clock))
    }

    /// Builds a limiter from parameters that have already passed [`Self::validate`].
    pub(crate) fn instantiate(&self, clock: &Clock) -> Limiter {
        let clock = clock.clone();
        match *self {
            Self::FixedWindow { limit, window } => {
                Limiter::FixedWindow(FixedWindow::unchecked(limit, window, clock))
            }
            Self::SlidingLog { limit, window } => {
                Limiter::SlidingLog(SlidingLog::unchecked(limit, window, clock))
            }
            Self::LeakyBucket { capacity, rate } => {
                Limiter::LeakyBucket(LeakyBucket::unchecked(capacity, rate, clock))
            }
            Self::TokenBucket { rate, burst } => {
                Limiter::TokenBucket(TokenBucket::unchecked(rate, burst, clock))
            }
        }
    }

    /// 7 requests per 10 seconds.
    pub fn default_fixed_window() -> Self {
        Self::FixedWindow {
            limit: 7,
            window: Duration::from_secs(10),
        }
    }

    /// 3 requests per trailing 5 seconds.
    pub fn default_sliding_log() -> Self {
        Self::SlidingLog {
            limit: 3,
            window: Duration::from_secs(5),
        }
    }

    /// Capacity 5, draining 2 per second.
    pub fn default_leaky_bucket() -> Self {
        Self::LeakyBucket {
            capacity: 5,
            rate: 2,
        }
    }

    /// 2 tokens per second, bursts of 5.
    pub fn default_token_bucket() -> Self {
        Self::TokenBucket {
            rate: 2.0,
            burst: 5,
        }
    }
}

/// Any one of the limiting algorithms.
#[derive(Debug)]
pub enum Limiter {
    FixedWindow(FixedWindow),
    SlidingLog(SlidingLog),
    LeakyBucket(LeakyBucket),
    TokenBucket(TokenBucket),
}

impl Strategy for Limiter {
    #[inline]
    fn process(&self) -> ControlFlow<Reason> {
        match self {
            Self::FixedWindow(s) => s.process(),
            Self::SlidingLog(s) => s.process(),
            Self::LeakyBucket(s) => s.process(),
            Self::TokenBucket(s) => s.process(),
        }
    }
}
