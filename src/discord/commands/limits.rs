// Commands for inspecting and managing the daily limits.

use crate::core::limits::{ActionKind, LedgerError, UsageSnapshot};
use crate::discord::commands::moderation::{Context, Error};
use crate::discord::moderation::actions::guild_ref;
use poise::serenity_prelude as serenity;

async fn reply_ephemeral(ctx: Context<'_>, content: impl Into<String>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(content)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Show today's bypass code. Server owner only.
#[poise::command(slash_command, guild_only, rename = "show-my-id")]
pub async fn show_my_id(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let guild = guild_ref(ctx.serenity_context(), guild_id).await?;

    match ctx
        .data()
        .ledger
        .peek_token(guild, ctx.author().id.get())
        .await
    {
        Ok(token) => {
            let reset = ctx.data().ledger.next_reset_at().timestamp();
            reply_ephemeral(
                ctx,
                format!("🔑 Today's bypass code: `{token}`\nA new one is issued <t:{reset}:R>."),
            )
            .await
        }
        Err(LedgerError::NotAuthorized) => {
            reply_ephemeral(ctx, format!("❌ {}.", LedgerError::NotAuthorized)).await
        }
        Err(e) => Err(e.into()),
    }
}

fn usage_embed(user: &serenity::User, usage: &UsageSnapshot, reset_at: i64) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(format!("Daily limits for {}", user.name))
        .color(0x5865F2)
        .thumbnail(user.face());

    for action in ActionKind::ALL {
        embed = embed.field(
            capitalize(action.as_str()),
            format!(
                "{}/{} used, {} left",
                usage.counts.count(action),
                usage.limits.get(action),
                usage.remaining(action)
            ),
            true,
        );
    }

    let bypass = if usage.counts.token_consumed {
        "Used"
    } else {
        "Available"
    };

    embed
        .field("Bypass code", bypass, true)
        .field("Resets", format!("<t:{reset_at}:R>"), true)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Day of {}",
            usage.reset_date
        )))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Show how many moderation actions you have left today.
#[poise::command(slash_command, guild_only)]
pub async fn limits(
    ctx: Context<'_>,
    #[description = "Moderator to check (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let target = user.as_ref().unwrap_or_else(|| ctx.author());

    let usage = ctx
        .data()
        .ledger
        .usage(guild_id.get(), target.id.get())
        .await?;
    let reset_at = ctx.data().ledger.next_reset_at().timestamp();

    ctx.send(
        poise::CreateReply::default()
            .embed(usage_embed(target, &usage, reset_at))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Delete every counter and the bypass code for this server. Server owner only.
#[poise::command(slash_command, guild_only, rename = "wipe-limits")]
pub async fn wipe_limits(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let guild = guild_ref(ctx.serenity_context(), guild_id).await?;

    match ctx
        .data()
        .ledger
        .wipe_guild(guild, ctx.author().id.get())
        .await
    {
        Ok(true) => reply_ephemeral(ctx, "🧹 All limits for this server were wiped.").await,
        Ok(false) => reply_ephemeral(ctx, "Nothing stored for this server.").await,
        Err(LedgerError::NotAuthorized) => {
            reply_ephemeral(ctx, format!("❌ {}.", LedgerError::NotAuthorized)).await
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalizes_action_names() {
        assert_eq!(capitalize("timeout"), "Timeout");
        assert_eq!(capitalize(""), "");
    }
}
