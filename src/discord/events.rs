// Non-command Discord events.

use crate::discord::autoban;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// Event handler for everything that isn't a command.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            tracing::info!(
                "Connected as {} to {} guild(s)",
                data_about_bot.user.name,
                data_about_bot.guilds.len()
            );
        }
        serenity::FullEvent::GuildMemberRemoval {
            guild_id,
            user,
            member_data_if_available,
        } => {
            let outcome = autoban::handle_member_remove(
                ctx,
                data,
                *guild_id,
                user,
                member_data_if_available.as_ref(),
            )
            .await;
            tracing::debug!(
                guild_id = guild_id.get(),
                user_id = user.id.get(),
                "Departure handled: {:?}",
                outcome
            );
        }
        _ => {}
    }

    Ok(())
}
