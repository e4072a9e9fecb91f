//! Fixed-window request rate limiting
//!
//! Counts requests per client key inside a fixed window. State is local to
//! this process: several instances behind a load balancer each count
//! separately, so the effective limit is multiplied by the instance count.
//! A shared store with atomic increment-and-expire is needed for a global
//! limit.
//!
//! The number of tracked keys is bounded. When the map is full, expired
//! windows are swept first, then the window closest to expiry is evicted.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Time source for the limiter
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Request admitted; `remaining` more fit in the current window
    Allow { remaining: u32 },
    /// Limit reached; the window resets after `retry_after`
    Deny { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allow { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    count: u32,
    reset_at: Instant,
}

/// Per-key fixed-window counter
pub struct FixedWindowLimiter<K, C = SystemClock> {
    limit: u32,
    window: Duration,
    max_tracked_keys: usize,
    clock: C,
    records: Mutex<HashMap<K, WindowRecord>>,
}

impl<K> FixedWindowLimiter<K, SystemClock>
where
    K: Eq + Hash + Clone,
{
    /// Create a limiter admitting `limit` requests per `window` per key
    pub fn new(limit: u32, window: Duration, max_tracked_keys: usize) -> Self {
        Self::with_clock(limit, window, max_tracked_keys, SystemClock)
    }
}

impl<K, C> FixedWindowLimiter<K, C>
where
    K: Eq + Hash + Clone,
    C: Clock,
{
    /// Create a limiter with a custom time source.
    ///
    /// A zero `limit` or `max_tracked_keys` is raised to 1.
    pub fn with_clock(limit: u32, window: Duration, max_tracked_keys: usize, clock: C) -> Self {
        Self {
            limit: limit.max(1),
            window,
            max_tracked_keys: max_tracked_keys.max(1),
            clock,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a request for `key` and decide whether to admit it
    pub fn check(&self, key: &K) -> RateDecision {
        let now = self.clock.now();
        let mut records = self.records.lock();

        if let Some(record) = records.get_mut(key) {
            if now > record.reset_at {
                *record = WindowRecord {
                    count: 1,
                    reset_at: now + self.window,
                };
                return RateDecision::Allow {
                    remaining: self.limit - 1,
                };
            }
            if record.count < self.limit {
                record.count += 1;
                return RateDecision::Allow {
                    remaining: self.limit - record.count,
                };
            }
            return RateDecision::Deny {
                retry_after: record.reset_at.saturating_duration_since(now),
            };
        }

        if records.len() >= self.max_tracked_keys {
            self.make_room(&mut records, now);
        }
        records.insert(
            key.clone(),
            WindowRecord {
                count: 1,
                reset_at: now + self.window,
            },
        );
        RateDecision::Allow {
            remaining: self.limit - 1,
        }
    }

    /// Requests counted for `key` in its current window (0 if expired or
    /// untracked)
    pub fn current_count(&self, key: &K) -> u32 {
        let now = self.clock.now();
        self.records
            .lock()
            .get(key)
            .filter(|record| now <= record.reset_at)
            .map(|record| record.count)
            .unwrap_or(0)
    }

    /// Forget a key, e.g. after a successful login
    pub fn reset(&self, key: &K) {
        self.records.lock().remove(key);
    }

    /// Drop every expired window. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| now <= record.reset_at);
        before - records.len()
    }

    /// Number of keys currently tracked (expired windows included until swept)
    pub fn tracked_keys(&self) -> usize {
        self.records.lock().len()
    }

    fn make_room(&self, records: &mut HashMap<K, WindowRecord>, now: Instant) {
        records.retain(|_, record| now <= record.reset_at);
        if records.len() < self.max_tracked_keys {
            return;
        }

        let oldest = records
            .iter()
            .min_by_key(|(_, record)| record.reset_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            warn!(
                "Rate limiter full ({} keys), evicting the window closest to expiry",
                self.max_tracked_keys
            );
            records.remove(&key);
        }
    }
}

/// Periodically sweep expired windows on the tokio runtime
pub fn spawn_sweeper<K, C>(limiter: Arc<FixedWindowLimiter<K, C>>, interval: Duration) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + 'static,
    C: Clock + 'static,
{
    let interval = interval.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.sweep_expired();
            if removed > 0 {
                debug!("Swept {} expired rate limit windows", removed);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestClock {
        now: Mutex<Instant>,
    }

    impl TestClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Instant::now()),
            })
        }

        fn advance(&self, d: Duration) {
            *self.now.lock() += d;
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            *self.now.lock()
        }
    }

    #[test]
    fn test_limit_then_deny() {
        let clock = TestClock::new();
        let limiter = FixedWindowLimiter::with_clock(3, Duration::from_millis(1000), 100, clock.clone());

        let decisions: Vec<bool> = (0..4).map(|_| limiter.check(&"k").is_allowed()).collect();
        assert_eq!(decisions, vec![true, true, true, false]);

        clock.advance(Duration::from_millis(1001));
        assert_eq!(limiter.check(&"k"), RateDecision::Allow { remaining: 2 });
    }

    #[test]
    fn test_boundary_instant_still_in_window() {
        let clock = TestClock::new();
        let limiter = FixedWindowLimiter::with_clock(1, Duration::from_millis(1000), 100, clock.clone());
        assert!(limiter.check(&1).is_allowed());
        clock.advance(Duration::from_millis(1000));
        assert_eq!(
            limiter.check(&1),
            RateDecision::Deny {
                retry_after: Duration::ZERO
            }
        );
    }

    #[test]
    fn test_retry_after() {
        let clock = TestClock::new();
        let limiter = FixedWindowLimiter::with_clock(1, Duration::from_secs(60), 100, clock.clone());
        limiter.check(&"ip");
        clock.advance(Duration::from_secs(15));
        assert_eq!(
            limiter.check(&"ip"),
            RateDecision::Deny {
                retry_after: Duration::from_secs(45)
            }
        );
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60), 100);
        assert!(limiter.check(&"a").is_allowed());
        assert!(limiter.check(&"b").is_allowed());
        assert!(!limiter.check(&"a").is_allowed());
        assert_eq!(limiter.current_count(&"a"), 1);
        limiter.reset(&"a");
        assert!(limiter.check(&"a").is_allowed());
    }

    #[test]
    fn test_capacity_sweeps_expired_first() {
        let clock = TestClock::new();
        let limiter = FixedWindowLimiter::with_clock(5, Duration::from_millis(100), 2, clock.clone());
        limiter.check(&"old");
        clock.advance(Duration::from_millis(50));
        limiter.check(&"newer");
        clock.advance(Duration::from_millis(60));
        // "old" has expired, "newer" has not
        limiter.check(&"third");
        assert_eq!(limiter.tracked_keys(), 2);
        assert_eq!(limiter.current_count(&"newer"), 1);
        assert_eq!(limiter.current_count(&"old"), 0);
    }

    #[test]
    fn test_capacity_evicts_closest_to_expiry() {
        let clock = TestClock::new();
        let limiter = FixedWindowLimiter::with_clock(5, Duration::from_secs(60), 2, clock.clone());
        limiter.check(&"first");
        clock.advance(Duration::from_secs(1));
        limiter.check(&"second");
        limiter.check(&"third");
        assert_eq!(limiter.tracked_keys(), 2);
        assert_eq!(limiter.current_count(&"first"), 0);
        assert_eq!(limiter.current_count(&"second"), 1);
        assert_eq!(limiter.current_count(&"third"), 1);
    }

    #[test]
    fn test_sweep_expired() {
        let clock = TestClock::new();
        let limiter = FixedWindowLimiter::with_clock(5, Duration::from_millis(10), 100, clock.clone());
        for key in 0..10 {
            limiter.check(&key);
        }
        clock.advance(Duration::from_millis(11));
        limiter.check(&99);
        assert_eq!(limiter.sweep_expired(), 10);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_zero_limit_raised_to_one() {
        let limiter = FixedWindowLimiter::new(0, Duration::from_secs(1), 0);
        assert_eq!(limiter.limit(), 1);
        assert!(limiter.check(&"x").is_allowed());
        assert!(!limiter.check(&"x").is_allowed());
    }

    #[tokio::test]
    async fn test_sweeper_removes_expired_windows() {
        let limiter = Arc::new(FixedWindowLimiter::new(5, Duration::from_millis(5), 100));
        limiter.check(&"k");
        let handle = spawn_sweeper(limiter.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(limiter.tracked_keys(), 0);
        handle.abort();
    }
}
