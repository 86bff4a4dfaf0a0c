// Discord-side execution of moderation actions.
//
// **The pattern:**
// 1. Resolve the target member from what the moderator typed
// 2. Ask the ledger whether the moderator may act
// 3. Perform the Discord call only when allowed
// 4. Return the text to show the moderator
//
// Slash commands and the button panel both go through `execute`.

use crate::core::limits::{ActionKind, Decision, DenyReason, Grant, GuildRef};
use crate::core::moderation::{format_duration, MemberQuery};
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;
use std::time::Duration;

/// What the moderator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModAction {
    Timeout(Duration),
    Untimeout,
    Kick,
    Ban,
}

impl ModAction {
    /// The ledger action this counts as. Untimeout is never limited.
    pub fn limited_kind(&self) -> Option<ActionKind> {
        match self {
            ModAction::Timeout(_) => Some(ActionKind::Timeout),
            ModAction::Untimeout => None,
            ModAction::Kick => Some(ActionKind::Kick),
            ModAction::Ban => Some(ActionKind::Ban),
        }
    }
}

/// Find the guild owner, from the cache when possible.
pub async fn guild_owner(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
) -> Result<serenity::UserId, serenity::Error> {
    let cached = ctx.cache.guild(guild_id).map(|g| g.owner_id);
    if let Some(owner_id) = cached {
        return Ok(owner_id);
    }
    Ok(guild_id.to_partial_guild(&ctx.http).await?.owner_id)
}

pub async fn guild_ref(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
) -> Result<GuildRef, serenity::Error> {
    let owner_id = guild_owner(ctx, guild_id).await?;
    Ok(GuildRef {
        id: guild_id.get(),
        owner_id: owner_id.get(),
    })
}

/// Resolve a typed query to a guild member.
pub async fn resolve_member(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    query: &MemberQuery,
) -> Result<Option<serenity::Member>, serenity::Error> {
    if let MemberQuery::Id(id) = query {
        if *id == 0 {
            return Ok(None);
        }
        return Ok(guild_id.member(ctx, serenity::UserId::new(*id)).await.ok());
    }

    let Some(term) = query.search_term() else {
        return Ok(None);
    };

    let candidates = guild_id.search_members(&ctx.http, term, Some(25)).await?;
    Ok(candidates.into_iter().find(|m| {
        let display_name = m.nick.as_deref().or(m.user.global_name.as_deref());
        query.matches(
            m.user.id.get(),
            &m.user.name,
            m.user.discriminator.map(|d| d.get()),
            display_name,
        )
    }))
}

fn denial_message(reason: DenyReason, action: ActionKind) -> String {
    match reason {
        DenyReason::LimitReached => format!(
            "❌ Daily {action} limit reached. Ask the server owner for today's bypass code."
        ),
        DenyReason::InvalidToken => "❌ Daily limit reached and that bypass code is not valid."
            .to_string(),
        DenyReason::TokenAlreadyUsed => {
            "❌ Daily limit reached and you already used today's bypass code.".to_string()
        }
    }
}

fn grant_note(grant: Grant) -> String {
    match grant {
        Grant::Counted { used, limit } => format!("({used}/{limit} today)"),
        Grant::Bypassed => "(bypass code used)".to_string(),
    }
}

async fn perform(
    ctx: &serenity::Context,
    guild_id: serenity::GuildId,
    target: serenity::UserId,
    action: ModAction,
    reason: &str,
) -> Result<(), Error> {
    match action {
        ModAction::Timeout(duration) => {
            let until = chrono::Utc::now()
                + chrono::Duration::from_std(duration).map_err(|e| Error::from(e.to_string()))?;
            let until = serenity::Timestamp::from_unix_timestamp(until.timestamp())
                .map_err(|e| Error::from(e.to_string()))?;
            guild_id
                .edit_member(
                    &ctx.http,
                    target,
                    serenity::EditMember::new()
                        .disable_communication_until_datetime(until)
                        .audit_log_reason(reason),
                )
                .await?;
        }
        ModAction::Untimeout => {
            guild_id
                .edit_member(
                    &ctx.http,
                    target,
                    serenity::EditMember::new()
                        .enable_communication()
                        .audit_log_reason(reason),
                )
                .await?;
        }
        ModAction::Kick => {
            guild_id.kick_with_reason(&ctx.http, target, reason).await?;
        }
        ModAction::Ban => {
            guild_id.ban_with_reason(&ctx.http, target, 0, reason).await?;
        }
    }
    Ok(())
}

/// Run a moderation action end to end and describe the outcome.
///
/// Ledger storage failures are returned as errors; everything the moderator
/// can fix (unknown user, limit reached, Discord refusing) becomes a message.
pub async fn execute(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: serenity::GuildId,
    moderator: &serenity::User,
    target_query: &str,
    action: ModAction,
    bypass_code: Option<&str>,
) -> Result<String, Error> {
    let query = match MemberQuery::parse(target_query) {
        Ok(query) => query,
        Err(e) => return Ok(format!("❌ {e}.")),
    };

    let member = match resolve_member(ctx, guild_id, &query).await {
        Ok(Some(member)) => member,
        Ok(None) => return Ok("❌ User not found.".to_string()),
        Err(e) => {
            tracing::warn!(guild_id = guild_id.get(), "Member lookup failed: {}", e);
            return Ok("❌ User not found.".to_string());
        }
    };
    let target = member.user.id;
    let mention = format!("<@{}>", target);

    let note = match action.limited_kind() {
        Some(kind) => {
            let guild = guild_ref(ctx, guild_id).await?;
            let decision = data
                .ledger
                .check_and_consume(guild, moderator.id.get(), kind, bypass_code)
                .await?;
            match decision {
                Decision::Allowed(grant) => Some(grant_note(grant)),
                Decision::Denied(reason) => return Ok(denial_message(reason, kind)),
            }
        }
        None => None,
    };

    let reason = match action {
        ModAction::Timeout(_) => format!("Timeout by {}", moderator.name),
        ModAction::Untimeout => format!("Timeout lifted by {}", moderator.name),
        ModAction::Kick => format!("Kicked by {}", moderator.name),
        ModAction::Ban => format!("Banned by {}", moderator.name),
    };

    if let Err(e) = perform(ctx, guild_id, target, action, &reason).await {
        tracing::warn!(
            guild_id = guild_id.get(),
            moderator_id = moderator.id.get(),
            target_id = target.get(),
            ?action,
            "Moderation action failed: {}",
            e
        );
        return Ok(format!("❌ Error: {e}"));
    }

    let done = match action {
        ModAction::Timeout(duration) => {
            format!("✅ {mention} timed out for {}.", format_duration(duration))
        }
        ModAction::Untimeout => format!("✅ {mention} is no longer timed out."),
        ModAction::Kick => format!("✅ {mention} kicked."),
        ModAction::Ban => format!("✅ {mention} banned."),
    };

    Ok(match note {
        Some(note) => format!("{done} {note}"),
        None => done,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untimeout_is_not_limited() {
        assert_eq!(ModAction::Untimeout.limited_kind(), None);
        assert_eq!(
            ModAction::Timeout(Duration::from_secs(60)).limited_kind(),
            Some(ActionKind::Timeout)
        );
        assert_eq!(ModAction::Ban.limited_kind(), Some(ActionKind::Ban));
    }

    #[test]
    fn denial_messages_name_the_problem() {
        assert!(denial_message(DenyReason::LimitReached, ActionKind::Kick).contains("kick"));
        assert!(denial_message(DenyReason::InvalidToken, ActionKind::Kick).contains("not valid"));
        assert!(
            denial_message(DenyReason::TokenAlreadyUsed, ActionKind::Ban).contains("already used")
        );
    }

    #[test]
    fn grant_notes() {
        assert_eq!(grant_note(Grant::Counted { used: 2, limit: 3 }), "(2/3 today)");
        assert_eq!(grant_note(Grant::Bypassed), "(bypass code used)");
    }
}
