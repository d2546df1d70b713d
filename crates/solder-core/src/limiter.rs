//! Per-actor admission control.
//!
//! Every actor gets an independent token bucket: `rate_burst` tokens of
//! capacity, refilled continuously at `rate_per_sec` tokens per second.
//! [`RateLimiter::admit`] is the single entry point: it never blocks and
//! never queues; a denied event is simply dropped by the caller.
//!
//! Buckets are created lazily the first time an actor is seen. The registry
//! never evicts: the actor population of one bot is small enough that the
//! map is allowed to grow for the life of the process, and
//! [`tracked_users`](RateLimiter::tracked_users) makes the size observable.
//!
//! Time comes from [`tokio::time::Instant`], so the paused test clock drives
//! refill deterministically under `#[tokio::test(start_paused = true)]`;
//! outside tests it is the monotonic system clock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;

/// One actor's bucket. Tokens are fractional so refill accrues smoothly
/// between admissions.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    refreshed: Instant,
}

impl TokenBucket {
    /// A full bucket: a new actor gets its whole burst immediately.
    fn full(burst: u32, now: Instant) -> Self {
        Self {
            tokens: f64::from(burst),
            refreshed: now,
        }
    }

    fn try_take(&mut self, now: Instant, burst: u32, per_sec: f64) -> bool {
        let elapsed = now.saturating_duration_since(self.refreshed);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * per_sec).min(f64::from(burst));
        // A stale clock read must not rewind the baseline; that would credit
        // the same interval twice.
        self.refreshed = self.refreshed.max(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared registry of per-actor token buckets.
///
/// Cloning is cheap and all clones admit against the same buckets.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<i64, TokenBucket>>>,
    burst: u32,
    per_sec: f64,
}

impl RateLimiter {
    /// Creates a registry where each actor may burst `burst` admissions and
    /// regains one admission every `1 / per_sec` seconds.
    pub fn new(burst: u32, per_sec: f64) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            burst,
            per_sec,
        }
    }

    /// Takes one token from the actor's bucket if available.
    ///
    /// Creates the bucket on first sight of the actor; concurrent first
    /// calls for one actor converge on a single bucket behind the map lock.
    pub fn admit(&self, user_id: i64) -> bool {
        let mut buckets = self.buckets.lock();
        // Clock reads are ordered by the lock, so each bucket sees
        // monotone time.
        let now = Instant::now();
        let bucket = buckets
            .entry(user_id)
            .or_insert_with(|| TokenBucket::full(self.burst, now));
        bucket.try_take(now, self.burst, self.per_sec)
    }

    /// Number of actors currently holding a bucket.
    pub fn tracked_users(&self) -> usize {
        self.buckets.lock().len()
    }
}
