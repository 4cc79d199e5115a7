//! In-process concurrent cache for `Timely`-policy entries (spec §3/§4.4).

use std::sync::Arc;

use moka::future::Cache;

use crate::jsonrpc::RPCRequest;

/// A cached response tied to the upstream block it was fetched against.
///
/// Valid while `now <= when + BLOCK_WINDOW_SECS` (spec §3): `when` is the
/// UTC-unix-seconds timestamp of the upstream block at fetch time, not wall
/// time at insert time — the two would usually agree, but correlating
/// against the block's own timestamp is what the spec asks for.
#[derive(Debug, Clone)]
pub struct EphemeralEntry {
    pub originating_request: RPCRequest,
    pub response: Vec<u8>,
    pub block_number: u64,
    pub when: i64,
}

/// ~12 seconds, one Ethereum block (spec §3/§4.4).
pub const BLOCK_WINDOW_SECS: i64 = 12;

impl EphemeralEntry {
    pub fn is_still_valid(&self, now: i64) -> bool {
        now <= self.when + BLOCK_WINDOW_SECS
    }
}

/// Concurrent `base64(fingerprint) -> EphemeralEntry` map.
///
/// Deliberately configured with **no** moka expiry policy: spec §4.4 requires
/// entries to persist until explicitly overwritten on the next miss-or-stale
/// lookup, not be evicted by the cache itself. `moka` here is only the
/// concurrency primitive, the way the teacher crate uses it elsewhere for a
/// TTL-evicting cache — validity is judged by the caller via
/// `EphemeralEntry::is_still_valid`.
#[derive(Clone)]
pub struct TimelyCache {
    inner: Cache<String, Arc<EphemeralEntry>>,
}

impl TimelyCache {
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().build(),
        }
    }

    pub async fn load(&self, key_b64: &str) -> Option<Arc<EphemeralEntry>> {
        self.inner.get(key_b64).await
    }

    pub async fn store(&self, key_b64: String, entry: Arc<EphemeralEntry>) {
        self.inner.insert(key_b64, entry).await;
    }

    /// Atomic read-then-replace is not required by spec §5 ("a lost race
    /// merely means the losing writer's fresher value may be discarded —
    /// tolerated because the window is <= 12s"), so `swap` is a plain
    /// overwrite, just like `store`.
    pub async fn swap(&self, key_b64: String, entry: Arc<EphemeralEntry>) {
        self.inner.insert(key_b64, entry).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for TimelyCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(when: i64) -> Arc<EphemeralEntry> {
        Arc::new(EphemeralEntry {
            originating_request: RPCRequest {
                jsonrpc: "2.0".to_string(),
                method: "eth_getBalance".to_string(),
                params: vec![],
                id: 1,
            },
            response: br#"{"jsonrpc":"2.0","id":1,"result":"0x1"}"#.to_vec(),
            block_number: 100,
            when,
        })
    }

    #[test]
    fn valid_at_exactly_the_window_edge() {
        assert!(entry(1000).is_still_valid(1012));
    }

    #[test]
    fn stale_one_second_past_the_window() {
        assert!(!entry(1000).is_still_valid(1013));
    }

    #[tokio::test]
    async fn load_miss_on_empty_cache() {
        let cache = TimelyCache::new();
        assert!(cache.load("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn store_then_load_round_trips() {
        let cache = TimelyCache::new();
        cache.store("key".to_string(), entry(1000)).await;
        let loaded = cache.load("key").await.unwrap();
        assert_eq!(loaded.block_number, 100);
    }

    #[tokio::test]
    async fn swap_overwrites_existing_entry() {
        let cache = TimelyCache::new();
        cache.store("key".to_string(), entry(1000)).await;
        cache.swap("key".to_string(), entry(2000)).await;
        let loaded = cache.load("key").await.unwrap();
        assert_eq!(loaded.when, 2000);
    }
}
