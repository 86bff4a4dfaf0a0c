use crate::core::limits::{GuildLedger, LedgerError, LedgerStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// JSON-based ledger store. All guilds live in a single file:
/// { "guilds": { guild_id: GuildLedger } }
#[derive(Debug, Serialize, Deserialize, Default)]
struct JsonLedgerData {
    #[serde(default)]
    guilds: BTreeMap<u64, GuildLedger>,
}

pub struct JsonLedgerStore {
    path: PathBuf,
    // Held for writing across the file write, which serializes saves.
    cache: RwLock<JsonLedgerData>,
}

impl JsonLedgerStore {
    /// Open the file at `path`, or start empty if it does not exist yet.
    /// A file that exists but cannot be parsed is an error rather than being
    /// silently replaced.
    pub fn new(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                JsonLedgerData::default()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            JsonLedgerData::default()
        };

        Ok(Self {
            path,
            cache: RwLock::new(data),
        })
    }

    /// Write `data` through a temp file so a crash mid-write never leaves a
    /// truncated ledger behind.
    async fn persist(&self, data: &JsonLedgerData) -> Result<(), LedgerError> {
        let text = serde_json::to_string_pretty(data)
            .map_err(|e| LedgerError::Storage(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| LedgerError::Storage(e.to_string()))?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))
    }
}

#[async_trait]
impl LedgerStore for JsonLedgerStore {
    async fn load_guild(&self, guild_id: u64) -> Result<Option<GuildLedger>, LedgerError> {
        let cache = self.cache.read().await;
        Ok(cache.guilds.get(&guild_id).cloned())
    }

    /// The cache only keeps the new record once it is on disk.
    async fn save_guild(&self, ledger: &GuildLedger) -> Result<(), LedgerError> {
        let mut cache = self.cache.write().await;
        let previous = cache.guilds.insert(ledger.guild_id, ledger.clone());

        if let Err(e) = self.persist(&cache).await {
            match previous {
                Some(previous) => cache.guilds.insert(ledger.guild_id, previous),
                None => cache.guilds.remove(&ledger.guild_id),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn delete_guild(&self, guild_id: u64) -> Result<bool, LedgerError> {
        let mut cache = self.cache.write().await;
        let Some(previous) = cache.guilds.remove(&guild_id) else {
            return Ok(false);
        };

        if let Err(e) = self.persist(&cache).await {
            cache.guilds.insert(guild_id, previous);
            return Err(e);
        }
        Ok(true)
    }

    async fn guild_ids(&self) -> Result<Vec<u64>, LedgerError> {
        let cache = self.cache.read().await;
        Ok(cache.guilds.keys().copied().collect())
    }
}
