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

/// A simple window-based limiter.
///
/// Counts admitted requests until the current window ends. The first check at or
/// after the end of a window starts a fresh one anchored at that check, so windows
/// drift rather than follow a fixed epoch. It is susceptible to "boundary bursts"
/// where double the limit is allowed in a short period spanning two windows.
#[derive(Debug)]
pub struct FixedWindow {
    limit: usize,
    window: Duration,
    state: Mutex<WindowState>,
    clock: Clock,
}

#[derive(Debug)]
struct WindowState {
    count: usize,
    /// `None` when the window is too long to end within the clock's range
    window_end: Option<Instant>,
}

impl Strategy for FixedWindow {
    fn process(&self) -> ControlFlow<Reason> {
        let mut state = self.state.lock();
        let now = self.clock.now();

        if state.window_end.is_some_and(|end| now >= end) {
            state.count = 0;
            state.window_end = now.checked_add(self.window);
        }
        trace!(
            count = state.count,
            remaining = self.limit - state.count,
            "fixed window state"
        );

        if state.count < self.limit {
            state.count += 1;
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(Reason::Overloaded {
                retry_after: state
                    .window_end
                    .map_or(Duration::MAX, |end| end.saturating_duration_since(now)),
            })
        }
    }
}

impl FixedWindow {
    /// Creates a new `FixedWindow` strategy.
    ///
    /// # Arguments
    ///
    /// * `limit` - The maximum number of requests allowed within a single window.
    /// * `window` - The duration of the fixed time window.
    pub fn new(limit: usize, window: Duration) -> Result<Self, ConfigError> {
        Self::with_clock(limit, window, Clock::new())
    }

    /// Creates a new `FixedWindow` reading time from `clock`.
    pub fn with_clock(limit: usize, window: Duration, clock: Clock) -> Result<Self, ConfigError> {
        Self::validate(limit, window)?;
        Ok(Self::unchecked(limit, window, clock))
    }

    pub(crate) fn validate(limit: usize, window: Duration) -> Result<(), ConfigError> {
        positive("limit", limit as u64)?;
        positive_duration("window", window)
    }

    pub(crate) fn unchecked(limit: usize, window: Duration, clock: Clock) -> Self {
        let window_end = clock.now().checked_add(window);

        Self {
            limit,
            window,
            state: Mutex::new(WindowState {
                count: 0,
                window_end,
            }),
            clock,
        }
    }

    /// Requests admitted in the current window.
    pub fn count(&self) -> usize {
        self.state.lock().count
    }
}
