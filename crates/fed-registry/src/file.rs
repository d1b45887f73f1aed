//! File-backed stores.
//!
//! Tokens are kept as a JSON snapshot (`id -> base64 bytes`) rewritten
//! atomically on every change. Revocations are an append-only log of
//! `token_type;id` lines.
//!
//! The revocation store keeps a local cache but re-reads the log tail on
//! every cache miss, so revocations appended by another process sharing
//! the file are observed on the next lookup.

use std::collections::{HashMap, HashSet};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;
use dashmap::DashMap;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::{RegistryError, RegistryResult};
use crate::store::{RevocationStore, TokenStore};

/// Token store persisted as a JSON snapshot file.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    tokens: Mutex<HashMap<String, Vec<u8>>>,
}

impl FileTokenStore {
    /// Opens the store, loading an existing snapshot if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be read or
    /// decoded.
    pub async fn open(path: impl Into<PathBuf>) -> RegistryResult<Self> {
        let path = path.into();
        let tokens = match fs::read(&path).await {
            Ok(raw) if raw.is_empty() => HashMap::new(),
            Ok(raw) => decode_snapshot(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), tokens = tokens.len(), "token snapshot loaded");
        Ok(Self {
            path,
            tokens: Mutex::new(tokens),
        })
    }

    /// Returns the snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, tokens: &HashMap<String, Vec<u8>>) -> RegistryResult<()> {
        let encoded: HashMap<&str, String> = tokens
            .iter()
            .map(|(id, bytes)| {
                (
                    id.as_str(),
                    base64::engine::general_purpose::STANDARD.encode(bytes),
                )
            })
            .collect();
        let json = serde_json::to_vec_pretty(&encoded)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &json).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn decode_snapshot(raw: &[u8]) -> RegistryResult<HashMap<String, Vec<u8>>> {
    let encoded: HashMap<String, String> = serde_json::from_slice(raw)?;
    encoded
        .into_iter()
        .map(|(id, text)| {
            base64::engine::general_purpose::STANDARD
                .decode(text)
                .map(|bytes| (id, bytes))
                .map_err(|e| RegistryError::Serialization(e.to_string()))
        })
        .collect()
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn find(&self, id: &str) -> RegistryResult<Option<Vec<u8>>> {
        Ok(self.tokens.lock().await.get(id).cloned())
    }

    async fn put(&self, id: &str, bytes: Vec<u8>) -> RegistryResult<bool> {
        let mut tokens = self.tokens.lock().await;
        if tokens.contains_key(id) {
            return Ok(false);
        }
        tokens.insert(id.to_string(), bytes);
        if let Err(e) = self.persist(&tokens).await {
            tokens.remove(id);
            return Err(e);
        }
        Ok(true)
    }

    async fn delete(&self, id: &str) -> RegistryResult<bool> {
        let mut tokens = self.tokens.lock().await;
        let Some(previous) = tokens.remove(id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&tokens).await {
            tokens.insert(id.to_string(), previous);
            return Err(e);
        }
        Ok(true)
    }
}

/// Revocation store persisted as an append-only log.
#[derive(Debug)]
pub struct FileRevocationStore {
    path: PathBuf,
    cache: DashMap<String, String>,
    /// Bytes of the log already folded into `cache`.
    offset: Mutex<u64>,
}

impl FileRevocationStore {
    /// Opens the store and loads the existing log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log exists but cannot be read.
    pub async fn open(path: impl Into<PathBuf>) -> RegistryResult<Self> {
        let store = Self {
            path: path.into(),
            cache: DashMap::new(),
            offset: Mutex::new(0),
        };
        {
            let mut offset = store.offset.lock().await;
            store.read_tail(&mut offset).await?;
        }
        tracing::debug!(
            path = %store.path.display(),
            revoked = store.cache.len(),
            "revocation log loaded"
        );
        Ok(store)
    }

    /// Returns the log path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Folds log lines written since `offset` into the cache.
    async fn read_tail(&self, offset: &mut u64) -> RegistryResult<()> {
        let mut file = match fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        file.seek(SeekFrom::Start(*offset)).await?;
        let mut tail = Vec::new();
        file.read_to_end(&mut tail).await?;

        // A line still being written by another process is left for later.
        let Some(last_newline) = tail.iter().rposition(|&b| b == b'\n') else {
            return Ok(());
        };
        let complete = &tail[..=last_newline];

        for line in String::from_utf8_lossy(complete).lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (token_type, id) = line.split_once(';').unwrap_or(("", line));
            self.cache
                .entry(id.to_string())
                .or_insert_with(|| token_type.to_string());
        }

        *offset += complete.len() as u64;
        Ok(())
    }
}

#[async_trait]
impl RevocationStore for FileRevocationStore {
    async fn contains(&self, id: &str) -> RegistryResult<bool> {
        if self.cache.contains_key(id) {
            return Ok(true);
        }
        let mut offset = self.offset.lock().await;
        self.read_tail(&mut offset).await?;
        Ok(self.cache.contains_key(id))
    }

    async fn add_revoked(&self, token_type: &str, id: &str) -> RegistryResult<bool> {
        if id.contains(['\n', ';']) || token_type.contains(['\n', ';']) {
            return Err(RegistryError::Storage(format!(
                "identifier not representable in revocation log: {id:?}"
            )));
        }

        let mut offset = self.offset.lock().await;
        self.read_tail(&mut offset).await?;
        if self.cache.contains_key(id) {
            return Ok(false);
        }

        let line = format!("{token_type};{id}\n");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.sync_data().await?;

        // Pick up our own line (and anything appended concurrently).
        self.read_tail(&mut offset).await?;
        self.cache
            .entry(id.to_string())
            .or_insert_with(|| token_type.to_string());
        Ok(true)
    }

    async fn list_revoked(&self) -> RegistryResult<HashSet<String>> {
        {
            let mut offset = self.offset.lock().await;
            self.read_tail(&mut offset).await?;
        }
        Ok(self.cache.iter().map(|e| e.key().clone()).collect())
    }
}
