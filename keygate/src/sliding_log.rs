use std::collections::VecDeque;
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
use crate::error::positive_duration;

/// A Sliding Window Log implementation.
///
/// Keeps the exact arrival time of every admitted request still inside the trailing
/// window. A record whose age equals the window is already expired. The cost of a
/// check is proportional to the number of records that expire during it.
#[derive(Debug)]
pub struct SlidingLog {
    limit: usize,
    window: Duration,
    /// Admission timestamps, oldest first
    log: Mutex<VecDeque<Instant>>,
    clock: Clock,
}

impl SlidingLog {
    pub fn new(limit: usize, window: Duration) -> Result<Self, ConfigError> {
        Self::with_clock(limit, window, Clock::new())
    }

    pub fn with_clock(limit: usize, window: Duration, clock: Clock) -> Result<Self, ConfigError> {
        Self::validate(limit, window)?;
        Ok(Self::unchecked(limit, window, clock))
    }

    pub(crate) fn validate(limit: usize, window: Duration) -> Result<(), ConfigError> {
        positive("limit", limit as u64)?;
        positive_duration("window", window)
    }

    pub(crate) fn unchecked(limit: usize, window: Duration, clock: Clock) -> Self {
        Self {
            limit,
            window,
            log: Mutex::new(VecDeque::new()),
            clock,
        }
    }

    /// Number of requests currently recorded in the window.
    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }
}

impl Strategy for SlidingLog {
    #[inline]
    fn process(&self) -> ControlFlow<Reason> {
        let mut log = self.log.lock();
        let now = self.clock.now();

        while let Some(oldest) = log.front() {
            let age = now.saturating_duration_since(*oldest);
            if age >= self.window {
                trace!(?age, "expired request discarded");
                log.pop_front();
            } else {
                break;
            }
        }
        trace!(
            logged = log.len(),
            remaining = self.limit.saturating_sub(log.len()),
            "sliding log state"
        );

        if log.len() < self.limit {
            log.push_back(now);
            ControlFlow::Continue(())
        } else {
            // The log is full, so it has an oldest entry
            let retry_after = log
                .front()
                .map(|oldest| {
                    self.window
                        .saturating_sub(now.saturating_duration_since(*oldest))
                })
                .unwrap_or_default();
            ControlFlow::Break(Reason::Overloaded { retry_after })
        }
    }
}
