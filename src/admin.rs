//! Administrative reset of the persistent store (spec §4.7 `/cleanup`).

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::ProxyError;
use crate::kv::{KvStore, SledStore};

/// Wipes the entire KV store and reopens a fresh one in its place.
///
/// Takes a write guard on the same lock the `Engine` takes a read guard on
/// for every KV operation (spec §4.7: "serialized against in-flight engine
/// work"), so no request can observe a half-closed or half-reopened store.
pub struct Admin {
    kv: Arc<RwLock<Arc<dyn KvStore>>>,
    data_dir: PathBuf,
}

impl Admin {
    pub fn new(kv: Arc<RwLock<Arc<dyn KvStore>>>, data_dir: PathBuf) -> Self {
        Self { kv, data_dir }
    }

    /// Close the current store, delete its data directory, and reopen a
    /// brand-new empty one at the same path (spec §4.7 steps a-d).
    pub async fn cleanup(&self) -> Result<(), ProxyError> {
        let mut guard = self.kv.write().await;

        guard
            .close()
            .await
            .map_err(|e| ProxyError::Storage(e.to_string()))?;

        match tokio::fs::remove_dir_all(&self.data_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(error = %e, dir = %self.data_dir.display(), "cleanup: failed to remove data dir");
                return Err(ProxyError::Storage(e.to_string()));
            }
        }

        let fresh = SledStore::open(&self.data_dir)
            .await
            .map_err(|e| ProxyError::Storage(e.to_string()))?;
        *guard = Arc::new(fresh);

        info!(dir = %self.data_dir.display(), "cleanup: store reopened empty");
        Ok(())
    }
}
