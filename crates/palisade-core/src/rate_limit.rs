//! Per-caller sliding-window rate limiting.
//!
//! One bucket per caller key. A bucket counts requests since its window
//! started; once the window ages out the bucket resets in place. Expired
//! buckets are dropped lazily on access, plus a full sweep whenever the
//! map outgrows a soft cap.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Bucket-count soft cap; a sweep of expired buckets runs past this.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: u32,
    window_start: Instant,
}

/// Sliding-window request counter keyed by caller.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: HashMap<String, Bucket>,
}

impl RateLimiter {
    /// Creates an empty limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one request for `key` and reports whether the caller is
    /// over its budget for the current window.
    pub fn check(&mut self, key: &str, max_requests: u32, window: Duration) -> bool {
        self.check_at(key, max_requests, window, Instant::now())
    }

    fn check_at(&mut self, key: &str, max_requests: u32, window: Duration, now: Instant) -> bool {
        if self.buckets.len() > SWEEP_THRESHOLD {
            self.sweep(window, now);
        }

        let bucket = self.buckets.entry(key.to_string()).or_insert(Bucket {
            count: 0,
            window_start: now,
        });
        if now.duration_since(bucket.window_start) >= window {
            bucket.count = 0;
            bucket.window_start = now;
        }
        bucket.count = bucket.count.saturating_add(1);
        bucket.count > max_requests
    }

    fn sweep(&mut self, window: Duration, now: Instant) {
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.window_start) < window);
    }

    /// Number of live buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True when no bucket exists.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
