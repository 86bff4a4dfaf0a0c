use super::limits_models::GuildLedger;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Only the server owner can do that")]
    NotAuthorized,

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Persistence port for guild ledgers.
///
/// Stores only load and save whole guild records. Serializing the
/// read-modify-write around them is the service's job.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn load_guild(&self, guild_id: u64) -> Result<Option<GuildLedger>, LedgerError>;

    /// Insert or replace the guild record together with all of its user counters.
    async fn save_guild(&self, ledger: &GuildLedger) -> Result<(), LedgerError>;

    /// Returns whether a record existed.
    async fn delete_guild(&self, guild_id: u64) -> Result<bool, LedgerError>;

    async fn guild_ids(&self) -> Result<Vec<u64>, LedgerError>;
}

#[async_trait]
impl LedgerStore for Box<dyn LedgerStore> {
    async fn load_guild(&self, guild_id: u64) -> Result<Option<GuildLedger>, LedgerError> {
        (**self).load_guild(guild_id).await
    }

    async fn save_guild(&self, ledger: &GuildLedger) -> Result<(), LedgerError> {
        (**self).save_guild(ledger).await
    }

    async fn delete_guild(&self, guild_id: u64) -> Result<bool, LedgerError> {
        (**self).delete_guild(guild_id).await
    }

    async fn guild_ids(&self) -> Result<Vec<u64>, LedgerError> {
        (**self).guild_ids().await
    }
}
