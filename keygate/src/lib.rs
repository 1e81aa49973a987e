//! # keygate
//!
//! `keygate` provides per-key request admission control.
//!
//! Every caller is identified by a client key (typically its network address). The
//! [`Registry`] lazily creates one rate limiter per key and each limiter independently
//! decides whether a request is admitted.
//!
//! ## Key Concepts
//!
//! * **Strategy Trait**: A unified interface for the limiting algorithms. Every
//!   algorithm answers a single question, [`Strategy::allow`].
//! * **Serialized State**: Each limiter guards its state with its own lock. The whole
//!   read, decide, update sequence of a check runs under that lock and never blocks on
//!   anything else.
//! * **Lazy Evaluation**: Windows, leaks and refills are recalculated at the moment of
//!   the request, eliminating the need for background worker threads or timers.
//! * **Injected Clock**: All time comes from a [`Clock`], so tests can drive time with
//!   [`Clock::mock`] instead of sleeping.
//!
//! ## Algorithms
//!
//! | Algorithm | Parameters |
//! |---|---|
//! | [`FixedWindow`] | limit, window |
//! | [`SlidingLog`] | limit, window |
//! | [`LeakyBucket`] | capacity, rate (units/sec) |
//! | [`TokenBucket`] | rate (tokens/sec), burst |
//!
//! ## Example
//!
//! ```rust
//! use keygate::LimiterConfig;
//! use keygate::Registry;
//! use keygate::Strategy;
//! use std::time::Duration;
//!
//! let config = LimiterConfig::FixedWindow {
//!     limit: 100,
//!     window: Duration::from_secs(60),
//! };
//! let registry = Registry::new(config).expect("valid config");
//!
//! if registry.get_or_create("10.0.0.1").allow() {
//!     // Request allowed
//! }
//! ```
//!
//! ## Limitations
//!
//! The clock is assumed to be monotonic. If it ever runs backwards, elapsed time is
//! treated as zero and admission decisions are otherwise unspecified.

use std::fmt::Debug;
use std::ops::ControlFlow;
use std::time::Duration;

mod config;
mod error;
mod fixed_window;
mod leaky_bucket;
mod registry;
mod sliding_log;
mod token_bucket;

pub use config::Limiter;
pub use config::LimiterConfig;
pub use error::ConfigError;
pub use fixed_window::FixedWindow;
pub use leaky_bucket::LeakyBucket;
pub use quanta::Clock;
pub use quanta::Mock;
pub use registry::Registry;
pub use sliding_log::SlidingLog;
pub use token_bucket::TokenBucket;

/// Reasons why a request might be rejected by a strategy.
#[derive(Debug, PartialEq)]
pub enum Reason {
    Overloaded { retry_after: Duration },
}

/// The core trait for all rate-limiting algorithms.
///
/// Strategies must be `Send` and `Sync` to allow sharing across thread boundaries
/// via `Arc`.
pub trait Strategy: Debug + Send + Sync {
    /// Attempts to admit a single request.
    ///
    /// A rejection carries a hint of how long the caller should wait before the
    /// next attempt can succeed. Rejections never consume capacity.
    fn process(&self) -> ControlFlow<Reason>;

    /// Returns `true` if the request is admitted.
    fn allow(&self) -> bool {
        self.process().is_continue()
    }
}
