// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate limiter for contact submissions.
//!
//! Each identifier (normalized sender email) gets `max_requests` submissions
//! per window. The window starts with the first request and is replaced, not
//! extended, once it has elapsed. Because the window is fixed, a sender can
//! land up to twice the limit across a window boundary.
//!
//! State lives behind [`RateLimitStore`] so an external key-value store can
//! replace the in-process [`MemoryStore`]. Expired entries are swept
//! opportunistically during checks, at most once per sweep interval.

use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitConfig;
use crate::i18n::{self, Lang};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Counter for one identifier's current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.reset_at
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Submissions left in the current window
    pub remaining: u32,
    /// When the current window ends
    pub reset_at: DateTime<Utc>,
    /// Time until a refused sender may try again
    pub retry_after: Option<Duration>,
    /// Human-readable refusal, with the wait in minutes
    pub message: Option<String>,
}

/// Storage for rate limit entries.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<RateLimitEntry>;

    async fn set(&self, key: &str, entry: RateLimitEntry);

    /// Delete every entry whose window has elapsed at `now`. Returns the
    /// number of entries removed.
    async fn sweep(&self, now: DateTime<Utc>) -> usize;

    async fn len(&self) -> usize;
}

/// In-process store. Not shared between instances.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, RateLimitEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.read().await.get(key).copied()
    }

    async fn set(&self, key: &str, entry: RateLimitEntry) {
        self.entries.write().await.insert(key.to_string(), entry);
    }

    async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Rate limit key for a sender: the trimmed, lowercased email.
///
/// Differently-cased spellings of one address share a bucket.
pub fn identifier(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Thread-safe fixed-window rate limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    /// Time of the last sweep. Held for the whole check so the
    /// read-check-write on an entry cannot interleave.
    gate: Mutex<DateTime<Utc>>,
}

impl RateLimiter {
    pub fn new(
        config: RateLimitConfig,
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let started = clock.now();
        Self {
            config,
            store,
            clock,
            gate: Mutex::new(started),
        }
    }

    /// Limiter over a fresh [`MemoryStore`] and the system clock.
    pub fn in_memory(config: RateLimitConfig) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()), Arc::new(SystemClock))
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count one request against `identifier` and decide whether it may pass.
    ///
    /// `identifier` must already be normalized with [`identifier`].
    pub async fn check(&self, identifier: &str, lang: Lang) -> RateLimitDecision {
        let mut last_sweep = self.gate.lock().await;
        let now = self.clock.now();

        if now - *last_sweep > seconds(self.config.sweep_interval_secs) {
            *last_sweep = now;
            let removed = self.store.sweep(now).await;
            if removed > 0 {
                debug!(removed, "Swept expired rate limit entries");
            }
        }

        let max = self.config.max_requests;
        match self.store.get(identifier).await {
            Some(entry) if !entry.is_expired(now) => {
                if entry.count >= max {
                    let retry_after = (entry.reset_at - now).to_std().unwrap_or_default();
                    warn!(
                        retry_after_secs = retry_after.as_secs(),
                        "Contact rate limit exceeded"
                    );
                    return RateLimitDecision {
                        allowed: false,
                        remaining: 0,
                        reset_at: entry.reset_at,
                        retry_after: Some(retry_after),
                        message: Some(retry_message(lang, retry_after)),
                    };
                }

                let count = entry.count + 1;
                self.store
                    .set(
                        identifier,
                        RateLimitEntry {
                            count,
                            reset_at: entry.reset_at,
                        },
                    )
                    .await;
                debug!(identifier, count, "Rate limit counter incremented");
                RateLimitDecision {
                    allowed: true,
                    remaining: max - count,
                    reset_at: entry.reset_at,
                    retry_after: None,
                    message: None,
                }
            }
            _ => {
                let reset_at = now + seconds(self.config.window_secs);
                self.store
                    .set(identifier, RateLimitEntry { count: 1, reset_at })
                    .await;
                debug!(identifier, %reset_at, "Rate limit window opened");
                RateLimitDecision {
                    allowed: true,
                    remaining: max.saturating_sub(1),
                    reset_at,
                    retry_after: None,
                    message: None,
                }
            }
        }
    }

    /// Remove expired entries now, regardless of the sweep interval.
    pub async fn sweep_expired(&self) -> usize {
        let mut last_sweep = self.gate.lock().await;
        let now = self.clock.now();
        *last_sweep = now;
        self.store.sweep(now).await
    }

    /// Number of identifiers currently tracked.
    pub async fn tracked(&self) -> usize {
        self.store.len().await
    }
}

fn seconds(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX / 1000))
}

/// "Try again in N minutes", N = ceil(ceil(seconds) / 60).
fn retry_message(lang: Lang, retry_after: Duration) -> String {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    let minutes = secs.div_ceil(60);
    if minutes == 1 {
        i18n::t(lang, "ratelimit.retry.one").to_string()
    } else {
        i18n::format(lang, "ratelimit.retry.many", &[("minutes", &minutes.to_string())])
    }
}
