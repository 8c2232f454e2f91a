// Bot presence.
//
// Discord-layer glue only: we work with serenity's ActivityData and
// OnlineStatus and keep the logic short.

use poise::serenity_prelude as serenity;

/// Status line shown under the bot's name. Mentions the prefix so people
/// who don't use slash commands can still find `help`.
pub fn status_text(prefix: &str) -> String {
    format!("{}help | /help", prefix)
}

/// Called once the bot is ready.
pub fn on_ready(ctx: &serenity::Context, prefix: &str) {
    let activity = serenity::ActivityData::watching(status_text(prefix));
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}
