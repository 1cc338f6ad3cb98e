use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Fixed-window request limiter keyed by a normalised string (email, username).
pub struct KeyedRateLimiter {
    /// key -> (count, window_start)
    entries: DashMap<String, (u32, Instant)>,
    limit: u32,
    window: Duration,
}

impl KeyedRateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            limit,
            window,
        }
    }

    /// Count one request. Returns Err with retry-after seconds once the window is full.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        let now = Instant::now();

        let mut entry = self.entries.entry(key.to_lowercase()).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > self.window {
            *count = 1;
            *start = now;
            return Ok(());
        }

        if *count >= self.limit {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(self.window.as_secs().saturating_sub(elapsed));
        }

        *count += 1;
        Ok(())
    }

    /// Remove stale entries older than the given duration.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, (_, start)| now.duration_since(*start) < max_age);
    }
}

/// Per-username login brute force limiter.
pub struct LoginRateLimiter {
    /// username -> (failed_count, window_start)
    entries: DashMap<String, (u32, Instant)>,
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginRateLimiter {
    const MAX_FAILURES: u32 = 5;
    const WINDOW: Duration = Duration::from_secs(15 * 60);

    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Check if login attempt is allowed. 5 failures per 15 minutes.
    /// Does NOT increment the counter; call `record_failure()` on invalid password.
    pub fn check(&self, username: &str) -> Result<(), u64> {
        let now = Instant::now();

        let Some(entry) = self.entries.get(&username.to_lowercase()) else {
            return Ok(());
        };

        let (count, start) = entry.value();

        if now.duration_since(*start) > Self::WINDOW {
            return Ok(());
        }

        if *count >= Self::MAX_FAILURES {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(Self::WINDOW.as_secs().saturating_sub(elapsed));
        }

        Ok(())
    }

    pub fn record_failure(&self, username: &str) {
        let now = Instant::now();

        let mut entry = self.entries.entry(username.to_lowercase()).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > Self::WINDOW {
            *count = 1;
            *start = now;
        } else {
            *count += 1;
        }
    }

    pub fn clear(&self, username: &str) {
        self.entries.remove(&username.to_lowercase());
    }

    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, (_, start)| now.duration_since(*start) < max_age);
    }
}
