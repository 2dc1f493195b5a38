use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::models::StoreResult;

/// Keyed blob storage with idle-timeout expiry backing the per-session carts.
///
/// The contract offers no compare-and-swap; callers that need to avoid lost
/// updates must serialize their own read-modify-write cycles.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the blob stored under `key`, `None` if absent or expired
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, expiring after `ttl` without a further write
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()>;

    /// Delete the blob stored under `key`
    async fn remove(&self, key: &str) -> StoreResult<()>;

    /// Number of live entries
    async fn len(&self) -> StoreResult<usize>;
}

#[derive(Debug, Clone)]
struct Entry {
    payload: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Writes between sweeps of expired entries
const SWEEP_EVERY_WRITES: u64 = 64;

/// Process-local session store.
///
/// Expired entries are dropped lazily on read, on every count, and by a sweep
/// piggybacked on every `SWEEP_EVERY_WRITES`th write.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    writes: Arc<AtomicU64>,
}

fn retain_live(entries: &mut HashMap<String, Entry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    let purged = before - entries.len();
    if purged > 0 {
        debug!("Purged {} expired sessions", purged);
    }
    purged
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    #[instrument(skip(self), fields(session_key = %key))]
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.payload.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: evict unless a writer refreshed it in the meantime
        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(Instant::now()))
        {
            entries.remove(key);
            debug!("Session expired and evicted");
        }
        Ok(None)
    }

    #[instrument(skip(self, value), fields(session_key = %key, bytes = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> StoreResult<()> {
        let now = Instant::now();
        let entry = Entry {
            payload: value,
            expires_at: now + ttl,
        };
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), entry);

        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % SWEEP_EVERY_WRITES == 0 {
            retain_live(&mut entries, now);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(session_key = %key))]
    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn len(&self) -> StoreResult<usize> {
        let mut entries = self.entries.write().await;
        retain_live(&mut entries, Instant::now());
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(600);

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = InMemorySessionStore::new();

        assert_eq!(store.get("nobody").await.unwrap(), None);
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = InMemorySessionStore::new();

        store.set("S1", b"payload".to_vec(), TTL).await.unwrap();

        assert_eq!(store.get("S1").await.unwrap(), Some(b"payload".to_vec()));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = InMemorySessionStore::new();

        store.set("S1", b"first".to_vec(), TTL).await.unwrap();
        store.set("S1", b"second".to_vec(), TTL).await.unwrap();

        assert_eq!(store.get("S1").await.unwrap(), Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = InMemorySessionStore::new();

        store.set("S1", b"payload".to_vec(), TTL).await.unwrap();
        store.remove("S1").await.unwrap();
        store.remove("never-set").await.unwrap();

        assert_eq!(store.get("S1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_entry_reads_as_absent() {
        let store = InMemorySessionStore::new();

        store.set("S1", b"stale".to_vec(), Duration::ZERO).await.unwrap();

        assert_eq!(store.get("S1").await.unwrap(), None);
        assert_eq!(store.len().await.unwrap(), 0);
        // Lazily evicted on the read above
        assert!(store.entries.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_refreshes_expiry() {
        let store = InMemorySessionStore::new();

        store.set("S1", b"stale".to_vec(), Duration::ZERO).await.unwrap();
        store.set("S1", b"fresh".to_vec(), TTL).await.unwrap();

        assert_eq!(store.get("S1").await.unwrap(), Some(b"fresh".to_vec()));
    }

    #[tokio::test]
    async fn test_abandoned_sessions_are_reclaimed_by_writes() {
        let store = InMemorySessionStore::new();

        for i in 0..1000 {
            store
                .set(&format!("abandoned-{}", i), b"x".to_vec(), Duration::ZERO)
                .await
                .unwrap();
        }
        for _ in 0..100 {
            store.set("live", b"x".to_vec(), TTL).await.unwrap();
            store.get("live").await.unwrap();
        }

        assert_eq!(store.entries.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_len_reclaims_expired_entries() {
        let store = InMemorySessionStore::new();

        store.set("old-1", b"x".to_vec(), Duration::ZERO).await.unwrap();
        store.set("old-2", b"x".to_vec(), Duration::ZERO).await.unwrap();
        store.set("live", b"x".to_vec(), TTL).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(store.entries.read().await.len(), 1);
        assert!(store.get("live").await.unwrap().is_some());
    }
}
