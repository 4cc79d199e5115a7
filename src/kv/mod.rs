pub mod sled_store;

pub use sled_store::SledStore;

use async_trait::async_trait;

/// Errors from the persistent KV store (spec §4.3/§7).
#[derive(Debug)]
pub enum KvError {
    /// No value for the given namespace/key.
    NotFound,
    /// `insert` was called for a key that already has a value.
    AlreadyExists,
    /// Anything else — surfaced as `ProxyError::Storage`.
    Other(String),
}

impl std::fmt::Display for KvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::AlreadyExists => write!(f, "key already exists"),
            Self::Other(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for KvError {}

/// Namespaced, durable byte-to-byte map (spec §4.3).
///
/// Physical keys are `namespace + "/" + key` (see `SledStore`). `insert`
/// fails with `KvError::AlreadyExists` if the key already has a value —
/// callers (the `Engine`) treat that as a benign race, never retrying or
/// overwriting.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, namespace: &str, key: &[u8]) -> Result<Vec<u8>, KvError>;
    async fn insert(&self, namespace: &str, key: &[u8], value: &[u8]) -> Result<(), KvError>;
    async fn update(&self, namespace: &str, key: &[u8], value: &[u8]) -> Result<(), KvError>;
    async fn has(&self, namespace: &str, key: &[u8]) -> Result<bool, KvError>;
    async fn close(&self) -> Result<(), KvError>;
}
