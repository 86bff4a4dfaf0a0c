// Daily moderation limits - the core ledger logic.
//
// This service decides whether a moderator may timeout/kick/ban right now:
// - Per-user, per-guild daily caps per action
// - One bypass code per guild per day, redeemable once per user
// - Lazy daily reset at midnight in the reference time zone
//
// NO Discord dependencies here - the Discord layer passes plain ids in.

use super::bypass_token::generate_token;
use super::limits_models::{
    ActionKind, Decision, DenyReason, GuildLedger, GuildRef, Grant, LimitConfig, UsageSnapshot,
    UserCounter,
};
use super::limits_store::{LedgerError, LedgerStore};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

// ============================================================================
// CLOCK
// ============================================================================

/// Source of "now". Tests swap in a clock they can move forward.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// First instant of the day after `now`'s local day in `tz`.
///
/// When local midnight falls in a DST gap, walk forward an hour at a time to
/// the first instant that exists.
pub fn next_midnight_after(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local_date = now.with_timezone(&tz).date_naive();
    let Some(mut candidate) = local_date
        .succ_opt()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    else {
        return now + Duration::days(1);
    };

    for _ in 0..4 {
        if let Some(instant) = tz.from_local_datetime(&candidate).earliest() {
            return instant.with_timezone(&Utc);
        }
        candidate += Duration::hours(1);
    }

    now + Duration::days(1)
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Rate-limit ledger for moderation actions.
///
/// Every entry point takes the guild's lock before touching the store, so the
/// stale-date check, the reset and the counter update for one guild never
/// interleave with another request for the same guild.
pub struct LedgerService<S: LedgerStore> {
    store: S,
    config: LimitConfig,
    clock: Arc<dyn Clock>,
    guild_locks: DashMap<u64, Arc<Mutex<()>>>,
}

impl<S: LedgerStore> LedgerService<S> {
    pub fn new(store: S, config: LimitConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, config: LimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
            guild_locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &LimitConfig {
        &self.config
    }

    fn today(&self) -> NaiveDate {
        self.clock
            .now()
            .with_timezone(&self.config.timezone)
            .date_naive()
    }

    fn guild_lock(&self, guild_id: u64) -> Arc<Mutex<()>> {
        self.guild_locks
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn fresh_token(&self, previous: Option<&str>) -> String {
        generate_token(
            &self.config.token_alphabet,
            self.config.token_length,
            previous,
        )
    }

    /// Zero every counter, clear redemptions and rotate the code.
    /// Returns `false` when the ledger is already current.
    fn reset_in_place(&self, ledger: &mut GuildLedger, today: NaiveDate) -> bool {
        if !ledger.is_stale(today) {
            return false;
        }

        for counter in ledger.users.values_mut() {
            *counter = UserCounter::default();
        }
        ledger.bypass_token = self.fresh_token(Some(&ledger.bypass_token));
        ledger.reset_date = today;

        tracing::info!(guild_id = ledger.guild_id, %today, "Daily limits reset");
        true
    }

    /// Load a guild's ledger (creating it if needed), refresh the owner and
    /// apply a pending reset. The flag says whether anything changed.
    async fn load_current(
        &self,
        guild: GuildRef,
        today: NaiveDate,
    ) -> Result<(GuildLedger, bool), LedgerError> {
        match self.store.load_guild(guild.id).await? {
            Some(mut ledger) => {
                let mut dirty = self.reset_in_place(&mut ledger, today);
                if ledger.owner_id != guild.owner_id {
                    ledger.owner_id = guild.owner_id;
                    dirty = true;
                }
                Ok((ledger, dirty))
            }
            None => {
                let ledger = GuildLedger::new(guild, self.fresh_token(None), today);
                Ok((ledger, true))
            }
        }
    }

    /// Decide whether `user_id` may perform `action` now, and record it.
    ///
    /// The counter is bumped as soon as the action is allowed, before the
    /// caller performs the moderation call; a failed call still uses quota.
    /// A bypass is not counted against the cap.
    pub async fn check_and_consume(
        &self,
        guild: GuildRef,
        user_id: u64,
        action: ActionKind,
        provided_token: Option<&str>,
    ) -> Result<Decision, LedgerError> {
        let lock = self.guild_lock(guild.id);
        let _guard = lock.lock().await;

        let today = self.today();
        let (mut ledger, mut dirty) = self.load_current(guild, today).await?;

        let limit = self.config.limits.get(action);
        let provided_token = provided_token.map(str::trim).filter(|t| !t.is_empty());

        if !ledger.users.contains_key(&user_id) {
            dirty = true;
        }
        let counter = ledger.users.entry(user_id).or_default();

        let decision = if counter.count(action) < limit {
            let used = counter.count_mut(action);
            *used += 1;
            Decision::Allowed(Grant::Counted { used: *used, limit })
        } else {
            match provided_token {
                None => Decision::Denied(DenyReason::LimitReached),
                Some(token) if token != ledger.bypass_token => {
                    Decision::Denied(DenyReason::InvalidToken)
                }
                Some(_) if counter.token_consumed => {
                    Decision::Denied(DenyReason::TokenAlreadyUsed)
                }
                Some(_) => {
                    counter.token_consumed = true;
                    Decision::Allowed(Grant::Bypassed)
                }
            }
        };

        if dirty || decision.is_allowed() {
            self.store.save_guild(&ledger).await?;
        }

        match decision {
            Decision::Allowed(Grant::Bypassed) => tracing::info!(
                guild_id = guild.id,
                user_id,
                %action,
                "Bypass code redeemed"
            ),
            _ => tracing::debug!(
                guild_id = guild.id,
                user_id,
                %action,
                ?decision,
                "Limit check"
            ),
        }

        Ok(decision)
    }

    /// Apply the daily reset to one guild if its date is behind.
    /// Unknown guilds are left alone.
    pub async fn reset_if_needed(&self, guild_id: u64) -> Result<bool, LedgerError> {
        let lock = self.guild_lock(guild_id);
        let _guard = lock.lock().await;

        let Some(mut ledger) = self.store.load_guild(guild_id).await? else {
            return Ok(false);
        };

        if self.reset_in_place(&mut ledger, self.today()) {
            self.store.save_guild(&ledger).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Run `reset_if_needed` over every stored guild. Returns how many reset.
    pub async fn reset_due_guilds(&self) -> Result<usize, LedgerError> {
        let mut reset = 0;
        for guild_id in self.store.guild_ids().await? {
            if self.reset_if_needed(guild_id).await? {
                reset += 1;
            }
        }
        Ok(reset)
    }

    /// Today's bypass code. Owner only.
    pub async fn peek_token(
        &self,
        guild: GuildRef,
        requester_id: u64,
    ) -> Result<String, LedgerError> {
        if requester_id != guild.owner_id {
            return Err(LedgerError::NotAuthorized);
        }

        let lock = self.guild_lock(guild.id);
        let _guard = lock.lock().await;

        let (ledger, dirty) = self.load_current(guild, self.today()).await?;
        if dirty {
            self.store.save_guild(&ledger).await?;
        }
        Ok(ledger.bypass_token)
    }

    /// Today's counts for one user. Does not create any records.
    pub async fn usage(&self, guild_id: u64, user_id: u64) -> Result<UsageSnapshot, LedgerError> {
        let lock = self.guild_lock(guild_id);
        let _guard = lock.lock().await;

        let today = self.today();
        let counts = match self.store.load_guild(guild_id).await? {
            Some(mut ledger) => {
                if self.reset_in_place(&mut ledger, today) {
                    self.store.save_guild(&ledger).await?;
                }
                ledger.users.get(&user_id).cloned().unwrap_or_default()
            }
            None => UserCounter::default(),
        };

        Ok(UsageSnapshot {
            counts,
            limits: self.config.limits,
            reset_date: today,
        })
    }

    /// Drop everything stored for a guild. Owner only.
    pub async fn wipe_guild(&self, guild: GuildRef, requester_id: u64) -> Result<bool, LedgerError> {
        if requester_id != guild.owner_id {
            return Err(LedgerError::NotAuthorized);
        }

        let lock = self.guild_lock(guild.id);
        let _guard = lock.lock().await;

        let existed = self.store.delete_guild(guild.id).await?;
        if existed {
            tracing::info!(guild_id = guild.id, "Guild ledger wiped");
        }
        Ok(existed)
    }

    /// When the next daily reset is due.
    pub fn next_reset_at(&self) -> DateTime<Utc> {
        next_midnight_after(self.clock.now(), self.config.timezone)
    }
}

// ============================================================================
// TESTS
// ============================================================================
