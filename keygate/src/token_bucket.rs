use std::ops::ControlFlow;
use std::time::Duration;

use parking_lot::Mutex;
use quanta::Clock;
use quanta::Instant;
use tracing::trace;

use super::Reason;
use super::Strategy;
use crate::error::ConfigError;
use crate::error::positive;

/// A bucket that refills continuously at `rate` tokens per second up to `burst`.
///
/// The bucket starts full. Every check advances the refill clock, whether or not a
/// token is taken.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    burst: usize,
    state: Mutex<TokenState>,
    clock: Clock,
}

#[derive(Debug)]
struct TokenState {
    tokens: f64,
    last_update: Instant,
}

impl Strategy for TokenBucket {
    fn process(&self) -> ControlFlow<Reason> {
        let mut state = self.state.lock();
        let now = self.clock.now();

        let elapsed = now.saturating_duration_since(state.last_update);
        state.tokens = (state.tokens + elapsed.as_secs_f64() * self.rate).min(self.burst as f64);
        state.last_update = now;
        trace!(tokens = state.tokens, "tokens available");

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(Reason::Overloaded {
                retry_after: self.time_to_token(state.tokens),
            })
        }
    }
}

impl TokenBucket {
    /// Creates a new `TokenBucket` strategy.
    ///
    /// # Arguments
    ///
    /// * `rate` - Tokens added per second. Zero means the bucket never refills.
    /// * `burst` - The maximum number of tokens held, and the initial fill.
    pub fn new(rate: f64, burst: usize) -> Result<Self, ConfigError> {
        Self::with_clock(rate, burst, Clock::new())
    }

    pub fn with_clock(rate: f64, burst: usize, clock: Clock) -> Result<Self, ConfigError> {
        Self::validate(rate, burst)?;
        Ok(Self::unchecked(rate, burst, clock))
    }

    pub(crate) fn validate(rate: f64, burst: usize) -> Result<(), ConfigError> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(ConfigError::Invalid {
                field: "rate",
                value: rate,
            });
        }
        positive("burst", burst as u64)
    }

    pub(crate) fn unchecked(rate: f64, burst: usize, clock: Clock) -> Self {
        let last_update = clock.now();

        Self {
            rate,
            burst,
            state: Mutex::new(TokenState {
                tokens: burst as f64,
                last_update,
            }),
            clock,
        }
    }

    /// Tokens available as of the last check.
    pub fn tokens(&self) -> f64 {
        self.state.lock().tokens
    }

    fn time_to_token(&self, tokens: f64) -> Duration {
        if self.rate == 0.0 {
            return Duration::MAX;
        }
        Duration::try_from_secs_f64((1.0 - tokens) / self.rate).unwrap_or(Duration::MAX)
    }
}
