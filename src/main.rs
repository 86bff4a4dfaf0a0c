// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (files, databases, APIs)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Start the background tasks (daily reset, presence polling)

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::limits::{
    run_daily_reset, ActionLimits, LedgerService, LedgerStore, LimitConfig,
};
use crate::core::presence::{PresenceTracker, TrackedIdentity};
use crate::discord::commands::presence;
use crate::discord::moderation::panel;
use crate::discord::presence::run_presence_loop;
use crate::discord::{Data, Error};
use crate::infra::limits::{JsonLedgerStore, SqliteLedgerStore};
use crate::infra::presence::{HttpPresenceClient, DEFAULT_PRESENCE_ENDPOINT};
use chrono_tz::Tz;
use poise::serenity_prelude as serenity;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Parse an optional raw value, falling back to `default` when it is
/// missing or malformed.
fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = raw.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()) else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Invalid {}={:?} ({}), using default", name, raw, e);
            default
        }
    }
}

fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_or(name, std::env::var(name).ok(), default)
}

fn load_limit_config() -> LimitConfig {
    let defaults = LimitConfig::default();

    let limits = ActionLimits {
        timeout: env_or("LIMIT_TIMEOUT", defaults.limits.timeout),
        kick: env_or("LIMIT_KICK", defaults.limits.kick),
        ban: env_or("LIMIT_BAN", defaults.limits.ban),
    };

    let mut token_length = env_or("BYPASS_TOKEN_LENGTH", defaults.token_length);
    if token_length == 0 {
        tracing::warn!("BYPASS_TOKEN_LENGTH must be positive, using default");
        token_length = defaults.token_length;
    }

    LimitConfig {
        limits,
        token_length,
        timezone: env_or::<Tz>("RESET_TIMEZONE", defaults.timezone),
        ..defaults
    }
}

async fn open_ledger_store(data_dir: &str) -> Box<dyn LedgerStore> {
    let backend = std::env::var("LEDGER_BACKEND").unwrap_or_else(|_| "sqlite".to_string());
    match backend.trim().to_ascii_lowercase().as_str() {
        "json" => {
            let path = format!("{}/ledger.json", data_dir);
            tracing::info!(path = %path, "Using JSON ledger store");
            Box::new(JsonLedgerStore::new(path).expect("Failed to open JSON ledger file"))
        }
        other => {
            if other != "sqlite" {
                tracing::warn!("Unknown LEDGER_BACKEND={:?}, using sqlite", other);
            }
            let path = format!("{}/ledger.db", data_dir);
            tracing::info!(path = %path, "Using SQLite ledger store");
            Box::new(
                SqliteLedgerStore::new(&path)
                    .await
                    .expect("Failed to initialize SQLite ledger store"),
            )
        }
    }
}

/// Event handler for non-command Discord events.
/// Panel buttons and modal submissions arrive here.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::InteractionCreate { interaction } = event {
        if let Err(e) = panel::handle_interaction(ctx, interaction, data).await {
            tracing::error!("Error handling panel interaction: {}", e);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    // Keep runtime data in a dedicated folder so the repo root stays tidy.
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
    std::fs::create_dir_all(&data_dir).expect("Failed to create data directory");

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let store = open_ledger_store(&data_dir).await;
    let ledger = Arc::new(LedgerService::new(store, load_limit_config()));

    let config = ledger.config();
    tracing::info!(
        timeout = config.limits.timeout,
        kick = config.limits.kick,
        ban = config.limits.ban,
        timezone = config.timezone.name(),
        "Daily limits configured"
    );

    // Presence notifications are optional: they need both ids and a channel.
    let tracked = TrackedIdentity::parse_list(
        &std::env::var("PRESENCE_TRACKED").unwrap_or_default(),
    );
    let presence_channel = parse_or::<u64>(
        "PRESENCE_CHANNEL_ID",
        std::env::var("PRESENCE_CHANNEL_ID").ok(),
        0,
    );
    let presence_interval = Duration::from_secs(env_or("PRESENCE_POLL_SECS", 60u64).max(1));
    let presence_tracker = if !tracked.is_empty() && presence_channel != 0 {
        let endpoint = std::env::var("PRESENCE_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_PRESENCE_ENDPOINT.to_string());
        let client = HttpPresenceClient::new(endpoint).expect("Failed to create presence client");
        Some(Arc::new(PresenceTracker::new(client, tracked)))
    } else {
        if !tracked.is_empty() {
            tracing::warn!("PRESENCE_TRACKED is set but PRESENCE_CHANNEL_ID is not; presence disabled");
        }
        None
    };

    // Create the data structure that will be shared across all commands
    let data = Data {
        ledger: Arc::clone(&ledger),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILDS | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // Register all our commands here
            commands: vec![
                discord::commands::moderation::direct(),
                discord::commands::moderation::timeout(),
                discord::commands::moderation::untimeout(),
                discord::commands::moderation::kick(),
                discord::commands::moderation::ban(),
                discord::commands::limits::show_my_id(),
                discord::commands::limits::limits(),
                discord::commands::limits::wipe_limits(),
            ],
            // Panel buttons and modals
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                tracing::info!("🤖 Bot is starting up...");

                // Register slash commands globally (can take up to an hour to propagate)
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("✅ Commands registered!");

                let tracked_count = presence_tracker
                    .as_ref()
                    .map(|t| t.tracked().len())
                    .unwrap_or(0);
                presence::on_ready(ctx, tracked_count);

                // Roll every guild over at local midnight.
                tokio::spawn(run_daily_reset(Arc::clone(&data.ledger)));

                if let Some(tracker) = presence_tracker {
                    tokio::spawn(run_presence_loop(
                        tracker,
                        ctx.http.clone(),
                        serenity::ChannelId::new(presence_channel),
                        presence_interval,
                    ));
                }

                tracing::info!("🚀 Bot is ready!");
                Ok(data)
            })
        })
        .build();

    // Create the client and start the bot
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
