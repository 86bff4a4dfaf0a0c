use crate::core::presence::{PresenceChange, PresenceSource, PresenceStatus, PresenceTracker};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;

/// Post one embed per status change to the notification channel.
pub async fn send_changes(
    http: &serenity::Http,
    channel_id: serenity::ChannelId,
    changes: Vec<PresenceChange>,
) {
    for change in changes {
        let embed = build_change_embed(&change);
        if let Err(err) = channel_id
            .send_message(http, serenity::CreateMessage::new().embed(embed))
            .await
        {
            tracing::warn!(
                channel_id = channel_id.get(),
                external_id = change.identity.external_id,
                error = %err,
                "Failed to send presence update"
            );
        }
    }
}

fn status_colour(status: PresenceStatus) -> serenity::Colour {
    match status {
        PresenceStatus::Online => serenity::Colour::from_rgb(67, 181, 129),
        PresenceStatus::InGame => serenity::Colour::from_rgb(88, 101, 242),
        PresenceStatus::InStudio => serenity::Colour::GOLD,
        PresenceStatus::Offline | PresenceStatus::Invisible => serenity::Colour::DARK_GREY,
        PresenceStatus::Unknown(_) => serenity::Colour::RED,
    }
}

fn build_change_embed(change: &PresenceChange) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("{} is now {}", change.identity.label, change.current))
        .field("Before", change.previous.to_string(), true)
        .field("Now", change.current.to_string(), true)
        .color(status_colour(change.current))
        .timestamp(serenity::Timestamp::now())
        .footer(serenity::CreateEmbedFooter::new(format!(
            "id {}",
            change.identity.external_id
        )))
}

/// Poll forever, announcing changes. A failed poll is logged and retried
/// on the next tick.
pub async fn run_presence_loop<P: PresenceSource + 'static>(
    tracker: Arc<PresenceTracker<P>>,
    http: Arc<serenity::Http>,
    channel_id: serenity::ChannelId,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        tracing::debug!("Starting presence poll...");
        match tracker.poll().await {
            Ok(changes) if !changes.is_empty() => {
                tracing::info!("Found {} presence changes", changes.len());
                send_changes(&http, channel_id, changes).await;
            }
            Ok(_) => tracing::debug!("No presence changes"),
            Err(err) => tracing::warn!("Presence poll failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::presence::TrackedIdentity;

    #[test]
    fn online_and_offline_use_distinct_colours() {
        assert_ne!(
            status_colour(PresenceStatus::Online),
            status_colour(PresenceStatus::Offline)
        );
        assert_eq!(
            status_colour(PresenceStatus::Invisible),
            status_colour(PresenceStatus::Offline)
        );
    }

    #[test]
    fn change_embed_names_identity_and_both_statuses() {
        let change = PresenceChange {
            identity: TrackedIdentity {
                external_id: 7,
                label: "Builder".to_string(),
            },
            previous: PresenceStatus::Offline,
            current: PresenceStatus::InStudio,
        };

        let embed = serde_json::to_value(build_change_embed(&change)).unwrap();
        assert_eq!(embed["title"], "Builder is now In studio");
        assert_eq!(embed["fields"][0]["name"], "Before");
        assert_eq!(embed["fields"][0]["value"], "Offline");
        assert_eq!(embed["fields"][1]["name"], "Now");
        assert_eq!(embed["fields"][1]["value"], "In studio");
        assert_eq!(embed["footer"]["text"], "id 7");
    }
}
