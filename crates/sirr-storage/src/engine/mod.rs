//! Storage engine implementations

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sirr_core::Result;
use tokio::sync::RwLock;
use tracing::debug;

/// A single key/value record as it crosses the storage boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    pub key: String,
    pub value: Bytes,
}

impl StorageEntry {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Build an entry whose value is the JSON serialization of `value`.
    pub fn from_json<T: Serialize>(key: impl Into<String>, value: &T) -> Result<Self> {
        let value = serde_json::to_vec(value)?;
        Ok(Self {
            key: key.into(),
            value: Bytes::from(value),
        })
    }

    /// Decode the value as JSON. Fields absent from the stored payload
    /// take whatever `#[serde(default)]` the target declares, which is how
    /// records written before a field existed stay readable.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.value)?)
    }
}

/// Key/value storage as the host exposes it to a backend mount.
///
/// The production engine lives in the host; implementations here exist for
/// tests and embedded use. No retries, no caching: one get or put per
/// call, consistency is the engine's problem.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch the entry stored at `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<StorageEntry>>;

    /// Store an entry under its key, replacing any previous value.
    async fn put(&self, entry: StorageEntry) -> Result<()>;
}

/// In-memory storage engine
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<StorageEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).map(|value| StorageEntry {
            key: key.to_string(),
            value: value.clone(),
        }))
    }

    async fn put(&self, entry: StorageEntry) -> Result<()> {
        debug!("Stored entry {} ({} bytes)", entry.key, entry.value.len());
        self.entries.write().await.insert(entry.key, entry.value);
        Ok(())
    }
}
