// Daily limit domain models.
//
// Pure data types with no Discord dependencies. The Discord layer turns a
// `Decision` into a reply and only performs the moderation call when it is
// `Allowed`.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Moderation actions that count against a daily cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Timeout,
    Kick,
    Ban,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [ActionKind::Timeout, ActionKind::Kick, ActionKind::Ban];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Timeout => "timeout",
            ActionKind::Kick => "kick",
            ActionKind::Ban => "ban",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The guild a request belongs to, along with its current owner.
///
/// The owner id comes from Discord on every call so the ledger can seed new
/// guilds and follow ownership transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuildRef {
    pub id: u64,
    pub owner_id: u64,
}

/// Per-user counters for one guild and one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCounter {
    #[serde(default)]
    pub timeout: u32,
    #[serde(default)]
    pub kick: u32,
    #[serde(default)]
    pub ban: u32,
    /// Whether this user already redeemed today's bypass code.
    #[serde(default)]
    pub token_consumed: bool,
}

impl UserCounter {
    pub fn count(&self, action: ActionKind) -> u32 {
        match action {
            ActionKind::Timeout => self.timeout,
            ActionKind::Kick => self.kick,
            ActionKind::Ban => self.ban,
        }
    }

    pub fn count_mut(&mut self, action: ActionKind) -> &mut u32 {
        match action {
            ActionKind::Timeout => &mut self.timeout,
            ActionKind::Kick => &mut self.kick,
            ActionKind::Ban => &mut self.ban,
        }
    }
}

/// Everything the ledger knows about one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildLedger {
    pub guild_id: u64,
    pub owner_id: u64,
    pub bypass_token: String,
    /// Calendar day (reference zone) of the last reset.
    pub reset_date: NaiveDate,
    #[serde(default)]
    pub users: BTreeMap<u64, UserCounter>,
}

impl GuildLedger {
    pub fn new(guild: GuildRef, bypass_token: String, today: NaiveDate) -> Self {
        Self {
            guild_id: guild.id,
            owner_id: guild.owner_id,
            bypass_token,
            reset_date: today,
            users: BTreeMap::new(),
        }
    }

    pub fn is_stale(&self, today: NaiveDate) -> bool {
        self.reset_date != today
    }
}

/// Why an action was permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Counted against the cap. `used` includes this action.
    Counted { used: u32, limit: u32 },
    /// Today's bypass code was redeemed; the counter was left untouched.
    Bypassed,
}

/// Why an action was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Cap reached and no bypass code supplied.
    LimitReached,
    /// Cap reached and the supplied code is not today's code.
    InvalidToken,
    /// Correct code, but this user already redeemed it today.
    TokenAlreadyUsed,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenyReason::LimitReached => write!(f, "Daily limit reached"),
            DenyReason::InvalidToken => write!(f, "Invalid bypass code"),
            DenyReason::TokenAlreadyUsed => write!(f, "Bypass code already used today"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed(Grant),
    Denied(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_))
    }
}

/// A user's standing for today, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub counts: UserCounter,
    pub limits: ActionLimits,
    pub reset_date: NaiveDate,
}

impl UsageSnapshot {
    pub fn remaining(&self, action: ActionKind) -> u32 {
        self.limits
            .get(action)
            .saturating_sub(self.counts.count(action))
    }
}

/// Daily cap per action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionLimits {
    pub timeout: u32,
    pub kick: u32,
    pub ban: u32,
}

impl ActionLimits {
    pub fn get(&self, action: ActionKind) -> u32 {
        match action {
            ActionKind::Timeout => self.timeout,
            ActionKind::Kick => self.kick,
            ActionKind::Ban => self.ban,
        }
    }
}

impl Default for ActionLimits {
    fn default() -> Self {
        Self {
            timeout: 10,
            kick: 3,
            ban: 2,
        }
    }
}

/// Letters, digits and a handful of symbols.
pub const DEFAULT_TOKEN_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!§$%&/?#@_-+";
pub const DEFAULT_TOKEN_LENGTH: usize = 14;

/// Immutable ledger configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct LimitConfig {
    pub limits: ActionLimits,
    pub token_alphabet: Vec<char>,
    pub token_length: usize,
    /// Zone that defines "today" and the midnight reset.
    pub timezone: Tz,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            limits: ActionLimits::default(),
            token_alphabet: DEFAULT_TOKEN_ALPHABET.chars().collect(),
            token_length: DEFAULT_TOKEN_LENGTH,
            timezone: chrono_tz::Europe::Berlin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_match_observed_configuration() {
        let limits = ActionLimits::default();
        assert_eq!(limits.get(ActionKind::Timeout), 10);
        assert_eq!(limits.get(ActionKind::Kick), 3);
        assert_eq!(limits.get(ActionKind::Ban), 2);
    }

    #[test]
    fn counter_accessors_address_the_right_field() {
        let mut counter = UserCounter::default();
        *counter.count_mut(ActionKind::Kick) += 2;
        assert_eq!(counter.kick, 2);
        assert_eq!(counter.count(ActionKind::Kick), 2);
        assert_eq!(counter.count(ActionKind::Ban), 0);
    }

    #[test]
    fn snapshot_remaining_saturates() {
        let snapshot = UsageSnapshot {
            counts: UserCounter {
                ban: 5,
                ..Default::default()
            },
            limits: ActionLimits::default(),
            reset_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert_eq!(snapshot.remaining(ActionKind::Ban), 0);
        assert_eq!(snapshot.remaining(ActionKind::Timeout), 10);
    }

    #[test]
    fn default_alphabet_includes_symbols() {
        let config = LimitConfig::default();
        assert!(config.token_alphabet.contains(&'§'));
        assert!(config.token_alphabet.contains(&'Z'));
        assert_eq!(config.token_length, 14);
    }
}
