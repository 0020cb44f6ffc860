//! Time-bounded public key cache.
//!
//! Entries are written whole and never mutated in place. Lookups never
//! suspend: the map sits behind a `std::sync::RwLock` that is only held for
//! the duration of a `HashMap` operation.

use crate::metrics;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default time-to-live for cached public keys (24 hours).
pub const DEFAULT_KEY_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default interval between sweeps of expired entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

struct CachedKey {
    pem: String,
    expires_at: Instant,
}

/// Key id to PEM cache with a fixed TTL.
pub struct KeyCache {
    entries: RwLock<HashMap<String, CachedKey>>,
    ttl: Duration,
}

impl KeyCache {
    /// Create an empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Entry time-to-live.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a key. Expired entries count as misses.
    #[must_use]
    pub fn get(&self, key_id: &str) -> Option<String> {
        let now = Instant::now();
        let hit = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries
                .get(key_id)
                .filter(|entry| entry.expires_at > now)
                .map(|entry| entry.pem.clone())
        };

        metrics::record_key_cache_lookup(hit.is_some());
        if hit.is_some() {
            tracing::debug!(target: "asap.keys.cache", key_id = %key_id, "Key cache hit");
        }
        hit
    }

    /// Store a key, replacing any existing entry and resetting its TTL.
    pub fn insert(&self, key_id: &str, pem: String) {
        let entry = CachedKey {
            pem,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key_id.to_string(), entry);
    }

    /// Remove expired entries, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn a background task that sweeps expired entries every `interval`
    /// until `cancel_token` is cancelled.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::debug!(
                target: "asap.keys.cache",
                interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
                "Starting key cache sweeper"
            );

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = self.sweep();
                        if removed > 0 {
                            tracing::debug!(target: "asap.keys.cache", removed, "Swept expired keys");
                        }
                    }
                    () = cancel_token.cancelled() => {
                        tracing::debug!(target: "asap.keys.cache", "Key cache sweeper stopped");
                        break;
                    }
                }
            }
        })
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_CACHE_TTL)
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish()
    }
}
