// src/services/store.rs
//! Keyed persistence for memoized fetches and saved snapshots.
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::error::StoreError;

pub const STATEMENT_HORIZON_SECS: i64 = 12 * 60 * 60;
pub const SYMBOL_HORIZON_SECS: i64 = 30 * 24 * 60 * 60;
pub const PROFILE_HORIZON_SECS: i64 = 7 * 24 * 60 * 60;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn set(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get(key).await?.is_some())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.read().await.contains_key(key))
    }
}

/// One JSON file per key under a directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!("File store ready at {}", root.display());
        Ok(FileStore { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{}.json", name))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        tokio::fs::write(self.path_for(key), bytes).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(self.path_for(key)).await?)
    }
}

#[derive(Serialize, Deserialize)]
struct Stamped<T> {
    stored_at: DateTime<Utc>,
    value: T,
}

/// Returns the stored value for `key` if younger than `horizon`, otherwise
/// computes, stores and returns a fresh one. Errors are never stored; a store
/// that cannot be read or written is logged and bypassed.
pub async fn memoize<T, E, F, Fut>(
    store: &dyn KeyValueStore,
    key: &str,
    horizon: Duration,
    compute: F,
) -> Result<T, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match store.get(key).await {
        Ok(Some(bytes)) => match serde_json::from_slice::<Stamped<T>>(&bytes) {
            Ok(stamped) if stamped.stored_at > Utc::now() - horizon => {
                debug!("Cache hit for {}", key);
                return Ok(stamped.value);
            }
            Ok(_) => info!("Cached {} is stale, refreshing", key),
            Err(e) => warn!("Discarding unreadable cache entry {}: {}", key, e),
        },
        Ok(None) => debug!("Cache miss for {}", key),
        Err(e) => warn!("Cache read failed for {}: {}", key, e),
    }

    let value = compute().await?;
    let stamped = Stamped {
        stored_at: Utc::now(),
        value,
    };
    match serde_json::to_vec(&stamped) {
        Ok(bytes) => {
            if let Err(e) = store.set(key, bytes).await {
                warn!("Cache write failed for {}: {}", key, e);
            }
        }
        Err(e) => warn!("Could not serialize {} for caching: {}", key, e),
    }
    Ok(stamped.value)
}
