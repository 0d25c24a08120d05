// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// Snapshot entries live for five minutes.
pub const SNAPSHOT_TTL_SECS: u64 = 300;
/// Rate batches and the section config are refreshed hourly.
pub const RATE_TTL_SECS: u64 = 3600;
pub const CONFIG_TTL_SECS: u64 = 3600;

/// Time source injected into every cache so tests can drive expiry with a
/// manual clock.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Deterministic clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<u64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, secs: u64) {
        if let Ok(mut now) = self.now.lock() {
            *now += secs;
        }
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> u64 {
        self.now.lock().map(|n| *n).unwrap_or(0)
    }
}

/// Process-wide memo table with a fixed TTL per cache.
///
/// Writers race benignly: two concurrent misses for the same key both
/// compute the same idempotent value and the last write wins. There is no
/// per-key lock on purpose.
pub struct TtlCache<V: Clone> {
    ttl_secs: u64,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, (u64, V)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        TtlCache {
            ttl_secs,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_system_clock(ttl_secs: u64) -> Self {
        Self::new(ttl_secs, Arc::new(SystemClock))
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now_secs();
        let entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some((expires_at, value)) if *expires_at > now => Some(value.clone()),
            _ => None,
        }
    }

    pub fn insert(&self, key: &str, value: V) {
        let expires_at = self.clock.now_secs() + self.ttl_secs;
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (expires_at, value));
        }
    }

    /// Hits return the stored value verbatim; on miss the builder runs and
    /// its result is stored. Builder failures are returned without being
    /// cached.
    pub fn get_or_build<E>(
        &self,
        key: &str,
        build: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(hit) = self.get(key) {
            debug!("cache hit for {}", key);
            return Ok(hit);
        }
        let value = build()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn invalidate(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    /// Coarse bulk invalidation for ledger-mutating events: computing which
    /// keys a posting affects would require account-to-dashboard dependency
    /// tracking, so the whole namespace goes.
    pub fn invalidate_all(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            let n = entries.len();
            entries.clear();
            debug!("invalidated {} cached entries", n);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
