// Slash commands for rate-limited moderation.
//
// **Notice the pattern:**
// 1. Extract primitive data from Discord types
// 2. Hand off to `moderation::actions::execute`, which asks the ledger first
// 3. Reply ephemerally with whatever it reports
//
// This layer is THIN - the limit logic lives in `core::limits`.

use crate::core::limits::{LedgerService, LedgerStore};
use crate::core::moderation::timeout_from_parts;
use crate::discord::moderation::actions::{execute, ModAction};
use crate::discord::moderation::panel::panel_message;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared state handed to every command and event.
pub struct Data {
    pub ledger: Arc<LedgerService<Box<dyn LedgerStore>>>,
}

async fn run(
    ctx: Context<'_>,
    user: serenity::User,
    action: ModAction,
    bypass_code: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    ctx.defer_ephemeral().await?;

    let reply = execute(
        ctx.serenity_context(),
        ctx.data(),
        guild_id,
        ctx.author(),
        &user.id.to_string(),
        action,
        bypass_code.as_deref(),
    )
    .await?;

    ctx.send(poise::CreateReply::default().content(reply).ephemeral(true))
        .await?;
    Ok(())
}

/// Open the moderation button panel.
#[poise::command(slash_command, guild_only)]
pub async fn direct(ctx: Context<'_>) -> Result<(), Error> {
    let (embed, components) = panel_message();
    ctx.send(
        poise::CreateReply::default()
            .embed(embed)
            .components(components)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Time out a member. Counts toward your daily timeout limit.
#[poise::command(slash_command, guild_only)]
pub async fn timeout(
    ctx: Context<'_>,
    #[description = "Member to time out"] user: serenity::User,
    #[description = "Seconds"] seconds: Option<u32>,
    #[description = "Minutes"] minutes: Option<u32>,
    #[description = "Hours"] hours: Option<u32>,
    #[description = "Bypass code, only needed over the daily limit"] bypass_code: Option<String>,
) -> Result<(), Error> {
    let duration = match timeout_from_parts(
        seconds.unwrap_or(0).into(),
        minutes.unwrap_or(0).into(),
        hours.unwrap_or(0).into(),
    ) {
        Ok(duration) => duration,
        Err(e) => {
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("❌ {e}."))
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    };

    run(ctx, user, ModAction::Timeout(duration), bypass_code).await
}

/// Lift a member's timeout. Not limited.
#[poise::command(slash_command, guild_only)]
pub async fn untimeout(
    ctx: Context<'_>,
    #[description = "Member whose timeout to lift"] user: serenity::User,
) -> Result<(), Error> {
    run(ctx, user, ModAction::Untimeout, None).await
}

/// Kick a member. Counts toward your daily kick limit.
#[poise::command(slash_command, guild_only)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Member to kick"] user: serenity::User,
    #[description = "Bypass code, only needed over the daily limit"] bypass_code: Option<String>,
) -> Result<(), Error> {
    run(ctx, user, ModAction::Kick, bypass_code).await
}

/// Ban a member. Counts toward your daily ban limit.
#[poise::command(slash_command, guild_only)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "Member to ban"] user: serenity::User,
    #[description = "Bypass code, only needed over the daily limit"] bypass_code: Option<String>,
) -> Result<(), Error> {
    run(ctx, user, ModAction::Ban, bypass_code).await
}
