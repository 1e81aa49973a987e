use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use parking_lot::RwLock;
use quanta::Clock;
use quanta::Instant;
use tracing::debug;

use crate::ConfigError;
use crate::Limiter;
use crate::LimiterConfig;
use crate::Strategy;

/// Maps client keys to their limiters.
///
/// The first check for an unseen key creates its limiter from the registry's config;
/// every later lookup of that key returns the same instance. The map lock only covers
/// the lookup or insert. Admission checks run afterwards under the limiter's own lock,
/// so unrelated keys never wait on each other.
///
/// Entries live until [`Registry::sweep`] reclaims them; nothing is evicted otherwise.
#[derive(Debug)]
pub struct Registry {
    config: LimiterConfig,
    clock: Clock,
    anchor: Instant,
    entries: RwLock<HashMap<String, Entry>>,
}

#[derive(Debug)]
struct Entry {
    limiter: Arc<Limiter>,
    /// Nanoseconds from the registry anchor to the latest lookup
    last_seen: AtomicU64,
}

impl Entry {
    fn touch(&self, now: u64) {
        self.last_seen.fetch_max(now, Ordering::Relaxed);
    }
}

impl Registry {
    /// Creates an empty registry whose limiters read the system clock.
    pub fn new(config: LimiterConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Clock::new())
    }

    /// Creates an empty registry whose limiters all read time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns the first invalid parameter of `config`.
    pub fn with_clock(config: LimiterConfig, clock: Clock) -> Result<Self, ConfigError> {
        config.validate()?;
        let anchor = clock.now();
        Ok(Self {
            config,
            clock,
            anchor,
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the limiter for `key`, creating it on first sight.
    ///
    /// Concurrent first lookups of the same key all receive the same instance.
    pub fn get_or_create(&self, key: &str) -> Arc<Limiter> {
        let now = self.elapsed();

        if let Some(entry) = self.entries.read().get(key) {
            entry.touch(now);
            return Arc::clone(&entry.limiter);
        }

        let mut entries = self.entries.write();
        // Another caller may have inserted between the two locks
        let entry = entries.entry(key.to_owned()).or_insert_with(|| {
            debug!(key, algorithm = self.config.name(), "creating limiter");
            Entry {
                limiter: Arc::new(self.config.instantiate(&self.clock)),
                last_seen: AtomicU64::new(now),
            }
        });
        entry.touch(now);
        Arc::clone(&entry.limiter)
    }

    /// Looks up the limiter for `key` and asks it to admit one request.
    pub fn check(&self, key: &str) -> bool {
        self.get_or_create(key).allow()
    }

    /// Removes entries not looked up for at least `idle`.
    ///
    /// Entries still held by a caller are kept. Returns the number removed.
    pub fn sweep(&self, idle: Duration) -> usize {
        let now = self.elapsed();
        let idle = u64::try_from(idle.as_nanos()).unwrap_or(u64::MAX);

        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| {
            let last_seen = entry.last_seen.load(Ordering::Relaxed);
            now.saturating_sub(last_seen) < idle || Arc::strong_count(&entry.limiter) > 1
        });
        let removed = before - entries.len();

        if removed > 0 {
            debug!(removed, remaining = entries.len(), "swept idle limiters");
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    fn elapsed(&self) -> u64 {
        self.clock
            .now()
            .saturating_duration_since(self.anchor)
            .as_nanos() as u64
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use super::*;

    fn fixed(limit: usize) -> LimiterConfig {
        LimiterConfig::FixedWindow {
            limit,
            window: Duration::from_secs(8),
        }
    }

    #[test]
    fn it_rejects_invalid_config() {
        assert_eq!(
            Registry::new(fixed(0)).unwrap_err(),
            ConfigError::NotPositive { field: "limit" }
        );
    }

    #[test]
    fn it_returns_the_same_instance_per_key() {
        let registry = Registry::new(fixed(5)).unwrap();

        let a = registry.get_or_create("10.0.0.1");
        let b = registry.get_or_create("10.0.0.1");
        let c = registry.get_or_create("10.0.0.2");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_keys_are_independent() {
        let (clock, mock) = Clock::mock();
        let registry = Registry::with_clock(fixed(5), clock).unwrap();

        for _ in 0..5 {
            assert!(registry.check("a"));
        }
        assert!(!registry.check("a"));
        assert!(registry.check("b"));

        mock.increment(Duration::from_secs(8));
        assert!(registry.check("a"));
    }

    #[test]
    fn test_concurrent_first_access_creates_one_instance() {
        let registry = Arc::new(Registry::new(fixed(1_000)).unwrap());
        let callers = 32;
        let barrier = Arc::new(Barrier::new(callers));

        let handles: Vec<_> = (0..callers)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.get_or_create("shared")
                })
            })
            .collect();

        let limiters: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(limiters.iter().all(|l| Arc::ptr_eq(l, &limiters[0])));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_checks_share_one_budget() {
        let registry = Arc::new(
            Registry::new(LimiterConfig::TokenBucket {
                rate: 0.0,
                burst: 10,
            })
            .unwrap(),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || (0..10).filter(|_| registry.check("hot")).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 10);
    }

    #[test]
    fn test_sweep_removes_idle_keys() {
        let (clock, mock) = Clock::mock();
        let registry = Registry::with_clock(fixed(5), clock).unwrap();

        registry.check("old");
        mock.increment(Duration::from_secs(30));
        registry.check("fresh");
        mock.increment(Duration::from_secs(10));

        assert_eq!(registry.sweep(Duration::from_secs(40)), 1);
        assert!(!registry.contains("old"));
        assert!(registry.contains("fresh"));
        assert_eq!(registry.sweep(Duration::from_secs(40)), 0);
    }

    #[test]
    fn test_sweep_keeps_held_limiters() {
        let (clock, mock) = Clock::mock();
        let registry = Registry::with_clock(fixed(5), clock).unwrap();

        let held = registry.get_or_create("held");
        mock.increment(Duration::from_secs(60));

        assert_eq!(registry.sweep(Duration::from_secs(1)), 0);
        drop(held);
        assert_eq!(registry.sweep(Duration::from_secs(1)), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sweep_with_huge_threshold_keeps_recent_keys() {
        let (clock, mock) = Clock::mock();
        let registry = Registry::with_clock(fixed(5), clock).unwrap();

        registry.check("recent");
        mock.increment(Duration::from_secs(1));

        let idle = Duration::from_nanos(u64::MAX) + Duration::from_nanos(1);
        assert_eq!(registry.sweep(idle), 0);
        assert!(registry.contains("recent"));
    }

    #[test]
    fn test_swept_key_starts_fresh() {
        let (clock, mock) = Clock::mock();
        let registry = Registry::with_clock(fixed(1), clock).unwrap();

        assert!(registry.check("k"));
        assert!(!registry.check("k"));

        mock.increment(Duration::from_secs(2));
        registry.sweep(Duration::from_secs(1));

        // Still inside the old window, but the old state is gone
        assert!(registry.check("k"));
    }
}
