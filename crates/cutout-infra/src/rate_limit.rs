//! Sliding-window rate limiter
//!
//! Keeps, per client key, the instants of the requests admitted within the last
//! window. A request is admitted while fewer than `max_requests` instants remain after
//! pruning; rejected requests are not recorded.
//!
//! State is sharded by key hash so that concurrent requests from different clients
//! rarely contend on the same lock. Each key's window is updated under its shard lock,
//! which makes check-and-record atomic per key.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default upper bound on tracked keys per shard before idle keys are evicted inline.
const DEFAULT_MAX_KEYS_PER_SHARD: usize = 10_000;

type Shard = Mutex<HashMap<String, VecDeque<Instant>>>;

pub struct RateLimiter {
    shards: Vec<Shard>,
    max_requests: u32,
    window: Duration,
    max_keys_per_shard: usize,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("shards", &self.shards.len())
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .finish()
    }
}

impl RateLimiter {
    /// Create a limiter with 16 shards
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_shards(max_requests, window, 16)
    }

    /// Create a limiter with a custom shard count (clamped to at least 1)
    pub fn with_shards(max_requests: u32, window: Duration, shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self {
            shards,
            max_requests,
            window,
            max_keys_per_shard: DEFAULT_MAX_KEYS_PER_SHARD,
        }
    }

    pub fn with_max_keys_per_shard(mut self, max_keys_per_shard: usize) -> Self {
        self.max_keys_per_shard = max_keys_per_shard.max(1);
        self
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn shard_for(&self, key: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Admit or reject one request for `key`.
    ///
    /// Returns the number of requests still allowed in the current window, or how long
    /// until the oldest recorded request leaves the window.
    pub async fn check(&self, key: &str) -> Result<u32, Duration> {
        let now = Instant::now();
        let window = self.window;
        let mut entries = self.shard_for(key).lock().await;

        if entries.len() >= self.max_keys_per_shard && !entries.contains_key(key) {
            entries.retain(|_, hits| {
                prune(hits, now, window);
                !hits.is_empty()
            });

            if entries.len() >= self.max_keys_per_shard {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, hits)| hits.back().copied())
                    .map(|(k, _)| k.clone());
                if let Some(evicted) = oldest {
                    entries.remove(&evicted);
                    tracing::debug!(
                        evicted_key = %evicted,
                        "Evicted least recently active rate limit key"
                    );
                }
            }
        }

        let hits = entries.entry(key.to_string()).or_default();
        prune(hits, now, window);

        if (hits.len() as u64) < u64::from(self.max_requests) {
            hits.push_back(now);
            Ok(self.max_requests - hits.len() as u32)
        } else {
            let retry_after = hits
                .front()
                .map(|oldest| (*oldest + window).saturating_duration_since(now))
                .unwrap_or(window);
            Err(retry_after)
        }
    }

    /// Drop keys with no requests left in the window. Returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        for shard in &self.shards {
            let mut entries = shard.lock().await;
            let before = entries.len();
            entries.retain(|_, hits| {
                prune(hits, now, self.window);
                !hits.is_empty()
            });
            removed += before - entries.len();
        }

        if removed > 0 {
            tracing::debug!(
                keys_removed = removed,
                "Cleaned up idle rate limit keys across all shards"
            );
        }

        removed
    }

    /// Number of keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.lock().await.len();
        }
        total
    }
}

/// Remove instants that have left the window ending at `now`.
fn prune(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = hits.front() {
        if now.saturating_duration_since(*oldest) >= window {
            hits.pop_front();
        } else {
            break;
        }
    }
}
