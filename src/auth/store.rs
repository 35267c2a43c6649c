use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::tokens::TokenPair;
use crate::error::StoreError;

/// Storage key the token record lives under
pub const AUTH_TOKENS_KEY: &str = "authTokens";

/// File name of the key/value storage file inside the config directory
pub const STORAGE_FILE: &str = "storage.json";

/// Durable home of the access/refresh pair.
///
/// `load` never fails: missing or malformed data reads as "no session".
/// Callers must not cache the result; other processes may rewrite the record
/// at any time.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn save(&self, pair: &TokenPair) -> Result<(), StoreError>;
    async fn load(&self) -> Option<TokenPair>;
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Key/value JSON file holding the token record under a fixed key.
/// Other keys in the file are preserved on every write.
pub struct FileTokenStore {
    path: PathBuf,
    key: String,
}

static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    /// Store at `<dir>/storage.json` under the default key
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STORAGE_FILE), AUTH_TOKENS_KEY)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> Map<String, Value> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                tracing::warn!("Token storage {} unreadable: {}", self.path.display(), e);
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(entries)) => entries,
            Ok(_) | Err(_) => {
                tracing::warn!("Token storage {} is not a JSON object, ignoring", self.path.display());
                Map::new()
            }
        }
    }

    async fn write_entries(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Write-then-rename so a concurrent reader never sees a half-written file
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .path
            .with_extension(format!("json.{}.{}.tmp", std::process::id(), seq));
        let content = serde_json::to_string_pretty(entries)?;
        tokio::fs::write(&tmp, content).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn save(&self, pair: &TokenPair) -> Result<(), StoreError> {
        let mut entries = self.read_entries().await;
        entries.insert(self.key.clone(), serde_json::to_value(pair)?);
        self.write_entries(&entries).await
    }

    async fn load(&self) -> Option<TokenPair> {
        let entries = self.read_entries().await;
        decode_record(entries.get(&self.key)?)
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.read_entries().await;
        if entries.remove(&self.key).is_none() {
            return Ok(());
        }
        self.write_entries(&entries).await
    }
}

/// Accepts the record either as a JSON object or as a JSON-encoded string,
/// the shape browser storage leaves behind.
fn decode_record(value: &Value) -> Option<TokenPair> {
    let pair: TokenPair = match value {
        Value::String(raw) => serde_json::from_str(raw).ok()?,
        Value::Object(_) => serde_json::from_value(value.clone()).ok()?,
        _ => return None,
    };

    if pair.has_access() || pair.has_refresh() {
        Some(pair)
    } else {
        None
    }
}

/// Process-local store for tests and throwaway sessions
#[derive(Default)]
pub struct MemoryTokenStore {
    pair: Mutex<Option<TokenPair>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: TokenPair) -> Self {
        Self {
            pair: Mutex::new(Some(pair)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn save(&self, pair: &TokenPair) -> Result<(), StoreError> {
        *self.pair.lock().await = Some(pair.clone());
        Ok(())
    }

    async fn load(&self) -> Option<TokenPair> {
        self.pair.lock().await.clone()
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.pair.lock().await = None;
        Ok(())
    }
}
