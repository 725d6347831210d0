//! Local cache holding the draft, the remembered locations and the UI
//! settings, persisted as a single JSON snapshot.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::card::{Draft, Settings, Spinner};
use crate::core::location::{Location, default_locations};
use crate::error::CacheError;

/// Storage key of the persisted snapshot.
pub const SNAPSHOT_KEY: &str = "pincard-cache-persist";

/// Cache contents. Also used as a partial write, where `None` fields are
/// left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<Draft>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<Location>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

impl CacheData {
    /// Contents of a freshly seeded cache.
    pub fn defaults() -> Self {
        Self {
            draft: Some(Draft::default()),
            locations: Some(default_locations()),
            settings: Some(Settings::default()),
        }
    }

    pub fn draft(draft: Draft) -> Self {
        Self {
            draft: Some(draft),
            ..Self::default()
        }
    }

    pub fn locations(locations: Vec<Location>) -> Self {
        Self {
            locations: Some(locations),
            ..Self::default()
        }
    }

    pub fn spinner(spinner: Spinner) -> Self {
        Self {
            settings: Some(Settings { spinner }),
            ..Self::default()
        }
    }

    /// Merge by key: every field present in `partial` replaces ours.
    pub fn merge(&mut self, partial: CacheData) {
        if let Some(draft) = partial.draft {
            self.draft = Some(draft);
        }
        if let Some(locations) = partial.locations {
            self.locations = Some(locations);
        }
        if let Some(settings) = partial.settings {
            self.settings = Some(settings);
        }
    }
}

/// Durable key/value storage backing the cache snapshot.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn save(&self, key: &str, blob: &str) -> Result<(), CacheError>;
}

/// Stores each key as `<dir>/<key>.json`.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl SnapshotStorage for FileStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, CacheError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &str, blob: &str) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, blob).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl SnapshotStorage for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.get(key).await)
    }

    async fn save(&self, key: &str, blob: &str) -> Result<(), CacheError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

/// What readers of the cache see; missing parts read as defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheView {
    pub draft: Draft,
    pub locations: Vec<Location>,
}

/// The shared in-memory cache. Writes are last-writer-wins.
pub struct LocalCache {
    data: Mutex<CacheData>,
    storage: Arc<dyn SnapshotStorage>,
    key: String,
}

impl LocalCache {
    pub fn new(storage: Arc<dyn SnapshotStorage>, key: impl Into<String>) -> Self {
        Self {
            data: Mutex::new(CacheData::default()),
            storage,
            key: key.into(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), SNAPSHOT_KEY)
    }

    /// Load the persisted snapshot. Returns whether one existed; an
    /// unreadable snapshot is discarded and reported as absent.
    pub async fn restore(&self) -> Result<bool, CacheError> {
        let Some(blob) = self.storage.load(&self.key).await? else {
            log::info!("No cache snapshot under '{}'", self.key);
            return Ok(false);
        };
        match serde_json::from_str::<CacheData>(&blob) {
            Ok(data) => {
                *self.data.lock().await = data;
                log::info!("Restored cache snapshot '{}'", self.key);
                Ok(true)
            }
            Err(e) => {
                log::warn!("Discarding unreadable cache snapshot '{}': {}", self.key, e);
                Ok(false)
            }
        }
    }

    pub async fn read(&self) -> CacheView {
        let data = self.data.lock().await;
        CacheView {
            draft: data.draft.clone().unwrap_or_default(),
            locations: data.locations.clone().unwrap_or_default(),
        }
    }

    pub async fn snapshot(&self) -> CacheData {
        self.data.lock().await.clone()
    }

    pub async fn settings(&self) -> Settings {
        self.data.lock().await.settings.clone().unwrap_or_default()
    }

    pub async fn write(&self, partial: CacheData) {
        self.data.lock().await.merge(partial);
    }

    /// Drop everything held in memory. The persisted snapshot is only
    /// replaced by the next `persist`.
    pub async fn clear(&self) {
        *self.data.lock().await = CacheData::default();
    }

    pub async fn persist(&self) -> Result<(), CacheError> {
        let blob = serde_json::to_string(&*self.data.lock().await)?;
        self.storage.save(&self.key, &blob).await?;
        log::debug!("Persisted cache snapshot '{}' ({} bytes)", self.key, blob.len());
        Ok(())
    }
}
