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

/// A queue of fixed capacity that drains at a constant rate.
///
/// Leaks are whole units: `floor(elapsed * rate)`. The leak clock only moves when at
/// least one unit leaks, so sub-unit progress accumulates across checks, but the
/// fractional remainder of a leak is dropped once it happens.
#[derive(Debug)]
pub struct LeakyBucket {
    capacity: usize,
    rate: u64,
    state: Mutex<BucketState>,
    clock: Clock,
}

#[derive(Debug)]
struct BucketState {
    level: usize,
    last_leak: Instant,
}

impl LeakyBucket {
    /// Creates a new `LeakyBucket` strategy.
    ///
    /// # Arguments
    ///
    /// * `capacity` - The number of requests the queue can hold.
    /// * `rate` - The number of requests drained per second.
    pub fn new(capacity: usize, rate: u64) -> Result<Self, ConfigError> {
        Self::with_clock(capacity, rate, Clock::new())
    }

    pub fn with_clock(capacity: usize, rate: u64, clock: Clock) -> Result<Self, ConfigError> {
        Self::validate(capacity, rate)?;
        Ok(Self::unchecked(capacity, rate, clock))
    }

    pub(crate) fn validate(capacity: usize, rate: u64) -> Result<(), ConfigError> {
        positive("capacity", capacity as u64)?;
        positive("rate", rate)
    }

    pub(crate) fn unchecked(capacity: usize, rate: u64, clock: Clock) -> Self {
        let last_leak = clock.now();

        Self {
            capacity,
            rate,
            state: Mutex::new(BucketState {
                level: 0,
                last_leak,
            }),
            clock,
        }
    }

    /// Current queue level.
    pub fn level(&self) -> usize {
        self.state.lock().level
    }
}

impl Strategy for LeakyBucket {
    fn process(&self) -> ControlFlow<Reason> {
        let mut state = self.state.lock();
        let now = self.clock.now();

        let elapsed = now.saturating_duration_since(state.last_leak);
        let leaked = (elapsed.as_secs_f64() * self.rate as f64) as u64;
        if leaked > 0 {
            trace!(leaked, level = state.level, "leaking");
            let leaked = usize::try_from(leaked).unwrap_or(usize::MAX);
            state.level = state.level.saturating_sub(leaked);
            state.last_leak = now;
        }

        if state.level < self.capacity {
            state.level += 1;
            ControlFlow::Continue(())
        } else {
            let per_unit = Duration::from_secs_f64(1.0 / self.rate as f64);
            ControlFlow::Break(Reason::Overloaded {
                retry_after: per_unit.saturating_sub(elapsed),
            })
        }
    }
}
