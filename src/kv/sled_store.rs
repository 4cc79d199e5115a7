use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{KvError, KvStore};

/// BadgerDB's default GC interval, carried over from the original
/// (`badgerGCInterval` in `database/badger_wrapper.go`).
const COMPACTION_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Embedded, durable, namespaced KV store backed by `sled`.
///
/// `sled` is the Rust substitute for the original's embedded BadgerDB: both
/// are single-process, mmap-backed, log-structured stores with a background
/// compaction cycle. Physical keys are `namespace + "/" + key`
/// (`physical_key`), matching `badgerNamespaceKey` in the original so the
/// on-disk layout in spec §6 holds literally.
pub struct SledStore {
    db: sled::Db,
    data_dir: PathBuf,
    compaction: std::sync::Mutex<Option<(JoinHandle<()>, Arc<Notify>)>>,
}

fn physical_key(namespace: &str, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(namespace.len() + 1 + key.len());
    out.extend_from_slice(namespace.as_bytes());
    out.push(b'/');
    out.extend_from_slice(key);
    out
}

impl SledStore {
    /// Opens (creating if absent) the store at `data_dir` and starts the
    /// background compaction task.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, KvError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| KvError::Other(format!("create data dir: {e}")))?;

        let dir_for_open = data_dir.clone();
        let db = tokio::task::spawn_blocking(move || sled::open(&dir_for_open))
            .await
            .map_err(|e| KvError::Other(format!("join error opening store: {e}")))?
            .map_err(|e| KvError::Other(format!("open store: {e}")))?;

        let store = Self {
            db,
            data_dir,
            compaction: std::sync::Mutex::new(None),
        };
        store.spawn_compaction();
        Ok(store)
    }

    fn spawn_compaction(&self) {
        let db = self.db.clone();
        let shutdown = Arc::new(Notify::new());
        let shutdown_for_task = shutdown.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(COMPACTION_INTERVAL);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                tokio::select! {
                    _ = ticker.tick() => {},
                    _ = shutdown_for_task.notified() => return,
                }
                run_compaction(&db).await;
            }
        });

        *self.compaction.lock().expect("compaction lock poisoned") = Some((handle, shutdown));
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

async fn run_compaction(db: &sled::Db) {
    let db = db.clone();
    let result = tokio::task::spawn_blocking(move || db.flush()).await;
    match result {
        Ok(Ok(0)) => info!("kv compaction: nothing to rewrite"),
        Ok(Ok(bytes)) => tracing::debug!(bytes, "kv compaction flushed"),
        Ok(Err(e)) => warn!(error = %e, "kv compaction failed"),
        Err(e) => warn!(error = %e, "kv compaction task panicked"),
    }
}

#[async_trait]
impl KvStore for SledStore {
    async fn get(&self, namespace: &str, key: &[u8]) -> Result<Vec<u8>, KvError> {
        let db = self.db.clone();
        let pk = physical_key(namespace, key);
        let result = tokio::task::spawn_blocking(move || db.get(pk))
            .await
            .map_err(|e| KvError::Other(format!("join error: {e}")))?
            .map_err(|e| KvError::Other(e.to_string()))?;
        result.map(|v| v.to_vec()).ok_or(KvError::NotFound)
    }

    async fn insert(&self, namespace: &str, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        let db = self.db.clone();
        let pk = physical_key(namespace, key);
        let value = value.to_vec();
        let result = tokio::task::spawn_blocking(move || {
            db.compare_and_swap(pk, None::<&[u8]>, Some(value))
        })
        .await
        .map_err(|e| KvError::Other(format!("join error: {e}")))?
        .map_err(|e| KvError::Other(e.to_string()))?;

        match result {
            Ok(()) => {
                self.db
                    .flush_async()
                    .await
                    .map_err(|e| KvError::Other(format!("sync write flush: {e}")))?;
                Ok(())
            }
            Err(_compare_and_swap_error) => Err(KvError::AlreadyExists),
        }
    }

    async fn update(&self, namespace: &str, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        let db = self.db.clone();
        let pk = physical_key(namespace, key);
        let value = value.to_vec();
        tokio::task::spawn_blocking(move || db.insert(pk, value))
            .await
            .map_err(|e| KvError::Other(format!("join error: {e}")))?
            .map_err(|e| KvError::Other(e.to_string()))?;

        self.db
            .flush_async()
            .await
            .map_err(|e| KvError::Other(format!("sync write flush: {e}")))?;
        Ok(())
    }

    async fn has(&self, namespace: &str, key: &[u8]) -> Result<bool, KvError> {
        let db = self.db.clone();
        let pk = physical_key(namespace, key);
        tokio::task::spawn_blocking(move || db.contains_key(pk))
            .await
            .map_err(|e| KvError::Other(format!("join error: {e}")))?
            .map_err(|e| KvError::Other(e.to_string()))
    }

    async fn close(&self) -> Result<(), KvError> {
        if let Some((handle, shutdown)) =
            self.compaction.lock().expect("compaction lock poisoned").take()
        {
            shutdown.notify_one();
            handle.abort();
        }
        self.db
            .flush_async()
            .await
            .map_err(|e| KvError::Other(format!("close flush: {e}")))?;
        Ok(())
    }
}
