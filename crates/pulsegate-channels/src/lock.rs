use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use pulsegate_wake::CounterStore;

const MAX_ACQUIRE_ATTEMPTS: u32 = 5;
const ACQUIRE_BACKOFF_STEP: Duration = Duration::from_secs(2);

/// Single-writer lock keyed by channel name (spec §4.8): before
/// initialising the provider connection, acquire this lock so only one
/// process instance owns the socket; refresh its TTL periodically and
/// release it on shutdown. Instances that do not hold the lock still run
/// their RPC listener.
pub struct ChannelLock {
    store: Arc<dyn CounterStore>,
    key: String,
    token: String,
    ttl_seconds: u64,
}

impl ChannelLock {
    pub fn new(store: Arc<dyn CounterStore>, channel: &str, ttl_seconds: u64) -> Self {
        Self {
            store,
            key: format!("lock:channel:{channel}"),
            token: Uuid::now_v7().to_string(),
            ttl_seconds,
        }
    }

    /// Up to 5 acquisition retries with linear back-off, so a crashed
    /// predecessor's heartbeat TTL can expire before we give up.
    pub async fn acquire(&self) -> bool {
        for attempt in 1..=MAX_ACQUIRE_ATTEMPTS {
            if self.store.try_acquire(&self.key, &self.token, self.ttl_seconds).await {
                info!(key = %self.key, attempt, "channel lock acquired");
                return true;
            }
            if attempt < MAX_ACQUIRE_ATTEMPTS {
                sleep(ACQUIRE_BACKOFF_STEP * attempt).await;
            }
        }
        warn!(key = %self.key, "could not acquire channel lock after retries");
        false
    }

    /// Refresh this lock's TTL. Call on a periodic interval while held.
    pub async fn refresh(&self) {
        self.store.setex(&self.key, self.ttl_seconds, &self.token).await;
    }

    pub async fn release(&self) {
        self.store.release_if_owner(&self.key, &self.token).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsegate_wake::InMemoryCounterStore;

    #[tokio::test]
    async fn second_instance_cannot_acquire_until_released() {
        let store: Arc<dyn CounterStore> = Arc::new(InMemoryCounterStore::new());
        let first = ChannelLock::new(store.clone(), "telegram", 60);
        let second = ChannelLock::new(store.clone(), "telegram", 60);

        assert!(first.acquire().await);
        assert!(!store.try_acquire("lock:channel:telegram", "someone-else", 60).await);

        first.release().await;
        assert!(second.acquire().await);
    }
}
