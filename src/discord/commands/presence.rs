// Bot activity shown in the member list.
//
// Discord-layer glue only: we touch `ActivityData` and `OnlineStatus` and
// nothing from the core.

use poise::serenity_prelude as serenity;

/// Default activity, set once the gateway is ready.
pub fn reset_status(ctx: &serenity::Context) {
    let activity = serenity::ActivityData::watching("moderation limits");
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}

/// Show how many accounts the presence notifier is following.
pub fn show_tracking(ctx: &serenity::Context, tracked: usize) {
    let activity = serenity::ActivityData::watching(format!(
        "moderation limits | {tracked} tracked"
    ));
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}

/// Called once the bot is ready.
pub fn on_ready(ctx: &serenity::Context, tracked: usize) {
    if tracked == 0 {
        reset_status(ctx);
    } else {
        show_tracking(ctx, tracked);
    }
}
