//! Per-client request limiter

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Sliding-window limiter keyed by client address
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    limit: usize,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            window,
            limit,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request from `key`; `false` once the window is full
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut hits = self.hits.lock();

        // Forget clients with no recent traffic so the map stays bounded
        if hits.len() > 10_000 {
            let window = self.window;
            hits.retain(|_, q| q.back().is_some_and(|last| now.duration_since(*last) <= window));
        }

        let queue = hits.entry(key.to_string()).or_default();
        while let Some(&front) = queue.front() {
            if now.duration_since(front) >= self.window {
                queue.pop_front();
            } else {
                break;
            }
        }

        if queue.len() < self.limit {
            queue.push_back(now);
            true
        } else {
            false
        }
    }
}
