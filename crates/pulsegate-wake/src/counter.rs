//! The shared counter store (spec §6): atomic increment/decrement backing
//! the wake guardrails' day/pair buckets and the channel bridge's
//! distributed lock. Modeled as a trait so a real deployment can swap in
//! Redis without touching the gate logic; ships one in-process
//! `dashmap`-backed implementation so the workspace runs standalone
//! (SPEC_FULL.md §0), following the teacher's pattern of shipping a real
//! default for every external collaborator it names as a trait.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment `key` and return the new value. Creates the
    /// key at 1 if absent, with no TTL until `expire` is called.
    async fn incr(&self, key: &str) -> i64;
    /// Atomically decrement `key`. No-op if the key does not exist.
    async fn decr(&self, key: &str);
    /// Apply (or replace) a TTL on `key`, in seconds.
    async fn expire(&self, key: &str, seconds: u64);
    /// Current value, or `None` if the key does not exist or has expired.
    async fn get(&self, key: &str) -> Option<i64>;
    /// Set `key` to `value` with a TTL in one atomic call, overwriting any
    /// existing value. Used to refresh a lock this instance already
    /// holds.
    async fn setex(&self, key: &str, seconds: u64, value: &str);
    /// Atomic "set if absent or expired", analogous to Redis `SET key
    /// value EX seconds NX`. Returns whether `key` was claimed.
    async fn try_acquire(&self, key: &str, value: &str, seconds: u64) -> bool;
    /// Atomic release-if-owner: delete `key` only if its current value
    /// equals `owner_token` (spec §6 "`eval(script, keys, args)` for
    /// atomic release-if-owner lock deletion"). Returns whether the key
    /// was deleted.
    async fn release_if_owner(&self, key: &str, owner_token: &str) -> bool;
}

struct Entry {
    value: i64,
    expires_at: Option<Instant>,
}

struct LockEntry {
    token: String,
    expires_at: Option<Instant>,
}

/// `dashmap`-backed default implementation, matching the in-process
/// collaborator style described in SPEC_FULL.md §0.
pub struct InMemoryCounterStore {
    entries: DashMap<String, Mutex<Entry>>,
    lock_tokens: DashMap<String, Mutex<LockEntry>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            lock_tokens: DashMap::new(),
        }
    }

    fn is_live(entry: &Entry) -> bool {
        entry.expires_at.map(|at| Instant::now() < at).unwrap_or(true)
    }
}

impl Default for InMemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn incr(&self, key: &str) -> i64 {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(Entry { value: 0, expires_at: None }));
        let mut guard = entry.lock().unwrap();
        if !Self::is_live(&guard) {
            guard.value = 0;
            guard.expires_at = None;
        }
        guard.value += 1;
        guard.value
    }

    async fn decr(&self, key: &str) {
        if let Some(entry) = self.entries.get(key) {
            let mut guard = entry.lock().unwrap();
            if Self::is_live(&guard) {
                guard.value -= 1;
            }
        }
    }

    async fn expire(&self, key: &str, seconds: u64) {
        if let Some(entry) = self.entries.get(key) {
            let mut guard = entry.lock().unwrap();
            guard.expires_at = Some(Instant::now() + Duration::from_secs(seconds));
        }
    }

    async fn get(&self, key: &str) -> Option<i64> {
        let entry = self.entries.get(key)?;
        let guard = entry.lock().unwrap();
        if Self::is_live(&guard) {
            Some(guard.value)
        } else {
            None
        }
    }

    async fn setex(&self, key: &str, seconds: u64, value: &str) {
        self.lock_tokens.insert(
            key.to_string(),
            Mutex::new(LockEntry {
                token: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(seconds)),
            }),
        );
    }

    async fn try_acquire(&self, key: &str, value: &str, seconds: u64) -> bool {
        let entry = self
            .lock_tokens
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(LockEntry { token: String::new(), expires_at: None }));
        let mut guard = entry.lock().unwrap();
        let live = guard.expires_at.map(|at| Instant::now() < at).unwrap_or(false);
        if live {
            return false;
        }
        guard.token = value.to_string();
        guard.expires_at = Some(Instant::now() + Duration::from_secs(seconds));
        true
    }

    async fn release_if_owner(&self, key: &str, owner_token: &str) -> bool {
        let Some(entry) = self.lock_tokens.get(key) else {
            return false;
        };
        let guard = entry.lock().unwrap();
        let live = guard.expires_at.map(|at| Instant::now() < at).unwrap_or(true);
        let matches = live && guard.token == owner_token;
        drop(guard);
        if matches {
            drop(entry);
            self.lock_tokens.remove(key);
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn increment_then_check_then_rollback() {
        let store = InMemoryCounterStore::new();
        let v1 = store.incr("wakes:a:2026-01-01").await;
        assert_eq!(v1, 1);
        store.decr("wakes:a:2026-01-01").await;
        assert_eq!(store.get("wakes:a:2026-01-01").await, Some(0));
    }

    #[tokio::test]
    async fn expire_zeroes_value_after_ttl_elapses() {
        let store = InMemoryCounterStore::new();
        store.incr("k").await;
        store.expire("k", 0).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(store.get("k").await, None);
        // A subsequent incr starts a fresh bucket.
        assert_eq!(store.incr("k").await, 1);
    }

    #[tokio::test]
    async fn release_if_owner_requires_matching_token() {
        let store = InMemoryCounterStore::new();
        store.setex("lock:telegram", 60, "owner-a").await;
        assert!(!store.release_if_owner("lock:telegram", "owner-b").await);
        assert!(store.release_if_owner("lock:telegram", "owner-a").await);
        assert!(!store.release_if_owner("lock:telegram", "owner-a").await);
    }

    #[tokio::test]
    async fn try_acquire_is_exclusive_until_released_or_expired() {
        let store = InMemoryCounterStore::new();
        assert!(store.try_acquire("lock:discord", "owner-a", 60).await);
        assert!(!store.try_acquire("lock:discord", "owner-b", 60).await);
        assert!(store.release_if_owner("lock:discord", "owner-a").await);
        assert!(store.try_acquire("lock:discord", "owner-b", 60).await);
    }
}
