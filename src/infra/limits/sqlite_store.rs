// SQLite-backed ledger store.
//
// Tables:
// - ledger_guilds: one row per guild (owner, bypass code, last reset date)
// - ledger_users: per-user daily counters, keyed by (guild_id, user_id)

use crate::core::limits::{GuildLedger, LedgerError, LedgerStore, UserCounter};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use std::collections::BTreeMap;
use std::path::Path;

fn storage_err(e: sqlx::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

pub struct SqliteLedgerStore {
    pool: Pool<Sqlite>,
}

impl SqliteLedgerStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let path_str = database_url.trim_start_matches("sqlite://");
        if !database_url.contains(":memory:") && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        let pool = SqlitePoolOptions::new().connect(&conn_str).await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_guilds (
                guild_id INTEGER PRIMARY KEY,
                owner_id INTEGER NOT NULL,
                bypass_token TEXT NOT NULL,
                reset_date TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ledger_users (
                guild_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                timeout_count INTEGER NOT NULL DEFAULT 0,
                kick_count INTEGER NOT NULL DEFAULT 0,
                ban_count INTEGER NOT NULL DEFAULT 0,
                token_consumed BOOLEAN NOT NULL DEFAULT 0,
                PRIMARY KEY (guild_id, user_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn load_guild(&self, guild_id: u64) -> Result<Option<GuildLedger>, LedgerError> {
        let row = sqlx::query(
            "SELECT owner_id, bypass_token, reset_date FROM ledger_guilds WHERE guild_id = ?",
        )
        .bind(guild_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let reset_date_str: String = row.get("reset_date");
        let reset_date = NaiveDate::parse_from_str(&reset_date_str, "%Y-%m-%d")
            .map_err(|e| LedgerError::Storage(format!("bad reset_date {reset_date_str:?}: {e}")))?;

        let user_rows = sqlx::query(
            r#"
            SELECT user_id, timeout_count, kick_count, ban_count, token_consumed
            FROM ledger_users
            WHERE guild_id = ?
            "#,
        )
        .bind(guild_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let mut users = BTreeMap::new();
        for row in user_rows {
            users.insert(
                row.get::<i64, _>("user_id") as u64,
                UserCounter {
                    timeout: row.get::<i64, _>("timeout_count") as u32,
                    kick: row.get::<i64, _>("kick_count") as u32,
                    ban: row.get::<i64, _>("ban_count") as u32,
                    token_consumed: row.get("token_consumed"),
                },
            );
        }

        Ok(Some(GuildLedger {
            guild_id,
            owner_id: row.get::<i64, _>("owner_id") as u64,
            bypass_token: row.get("bypass_token"),
            reset_date,
            users,
        }))
    }

    async fn save_guild(&self, ledger: &GuildLedger) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        sqlx::query(
            r#"
            INSERT INTO ledger_guilds (guild_id, owner_id, bypass_token, reset_date)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                owner_id = excluded.owner_id,
                bypass_token = excluded.bypass_token,
                reset_date = excluded.reset_date
            "#,
        )
        .bind(ledger.guild_id as i64)
        .bind(ledger.owner_id as i64)
        .bind(&ledger.bypass_token)
        .bind(ledger.reset_date.format("%Y-%m-%d").to_string())
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        for (user_id, counter) in &ledger.users {
            sqlx::query(
                r#"
                INSERT INTO ledger_users
                    (guild_id, user_id, timeout_count, kick_count, ban_count, token_consumed)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(guild_id, user_id) DO UPDATE SET
                    timeout_count = excluded.timeout_count,
                    kick_count = excluded.kick_count,
                    ban_count = excluded.ban_count,
                    token_consumed = excluded.token_consumed
                "#,
            )
            .bind(ledger.guild_id as i64)
            .bind(*user_id as i64)
            .bind(counter.timeout as i64)
            .bind(counter.kick as i64)
            .bind(counter.ban as i64)
            .bind(counter.token_consumed)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }

        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }

    async fn delete_guild(&self, guild_id: u64) -> Result<bool, LedgerError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        sqlx::query("DELETE FROM ledger_users WHERE guild_id = ?")
            .bind(guild_id as i64)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        let result = sqlx::query("DELETE FROM ledger_guilds WHERE guild_id = ?")
            .bind(guild_id as i64)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn guild_ids(&self) -> Result<Vec<u64>, LedgerError> {
        let rows = sqlx::query("SELECT guild_id FROM ledger_guilds ORDER BY guild_id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(rows
            .iter()
            .map(|r| r.get::<i64, _>("guild_id") as u64)
            .collect())
    }
}
