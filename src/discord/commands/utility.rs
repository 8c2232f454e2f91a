// Small everyday commands: latency, bot info and channel cleanup.

use crate::discord::errors::reject;
use crate::discord::{Context, Error};
use chrono::{Duration, Utc};
use poise::serenity_prelude as serenity;
use std::time::Duration as StdDuration;

pub const DEFAULT_CLEAR_AMOUNT: u8 = 10;
pub const MAX_CLEAR_AMOUNT: u8 = 100;
const CONFIRMATION_LIFETIME: StdDuration = StdDuration::from_secs(3);

/// Check the bot's gateway latency.
#[poise::command(slash_command, prefix_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency = ctx.ping().await;
    ctx.say(format!("🏓 Pong! {}ms", latency.as_millis()))
        .await?;
    Ok(())
}

/// What the bot does and how long it has been up.
#[poise::command(slash_command, prefix_command)]
pub async fn info(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let autoban = data.departures.config();
    let uptime = Utc::now() - data.started_at;

    let autoban_status = if autoban.enabled {
        format!("On, notices go to #{}", autoban.log_channel_name)
    } else {
        "Off".to_string()
    };

    let embed = serenity::CreateEmbed::new()
        .title("ℹ️ Bot information")
        .description("Automatic server moderation with role links and a warehouse ledger.")
        .color(0x3498DB)
        .timestamp(serenity::Timestamp::now())
        .field(
            "Features",
            "• Auto-ban on leave\n• Role links\n• Warehouse stock\n• Action logging",
            false,
        )
        .field(
            "📊 Stats",
            format!(
                "Departures processed: {}",
                data.departures.departures_processed()
            ),
            true,
        )
        .field("⏰ Uptime", format_uptime(uptime), true)
        .field("🛡️ Auto-ban", autoban_status, true)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Started: {}",
            data.started_at.format("%d.%m.%Y %H:%M UTC")
        )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Delete the last messages in this channel (admin only).
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "ADMINISTRATOR"
)]
pub async fn clear(
    ctx: Context<'_>,
    #[description = "How many messages to delete (1-100, default 10)"]
    #[min = 1]
    #[max = 100]
    amount: Option<u8>,
) -> Result<(), Error> {
    let amount = amount.unwrap_or(DEFAULT_CLEAR_AMOUNT);
    if !(1..=MAX_CLEAR_AMOUNT).contains(&amount) {
        return reject(
            ctx,
            "Invalid input",
            format!("Amount must be between 1 and {}.", MAX_CLEAR_AMOUNT),
        )
        .await;
    }

    let channel_id = ctx.channel_id();
    if let poise::Context::Prefix(prefix) = ctx {
        // The invoking `!clear` message is not part of the count.
        if let Err(e) = prefix.msg.delete(ctx.http()).await {
            tracing::warn!("Failed to delete clear invocation: {}", e);
        }
    } else {
        // Ephemeral, so the pending response never shows up in channel history.
        ctx.defer_ephemeral().await?;
    }

    let messages = channel_id
        .messages(ctx.http(), serenity::GetMessages::new().limit(amount))
        .await?;
    let ids: Vec<serenity::MessageId> = messages.iter().map(|m| m.id).collect();
    if !ids.is_empty() {
        channel_id.delete_messages(ctx.http(), &ids).await?;
    }

    tracing::info!(
        channel_id = channel_id.get(),
        deleted = ids.len(),
        actor_id = ctx.author().id.get(),
        "Cleared messages"
    );

    let confirmation = ctx
        .say(format!("🗑️ Deleted {} messages!", ids.len()))
        .await?;
    tokio::time::sleep(CONFIRMATION_LIFETIME).await;
    if let Err(e) = confirmation.delete(ctx).await {
        tracing::debug!("Clear confirmation already gone: {}", e);
    }

    Ok(())
}

/// `{h}h {m}m {s}s`. Negative spans (clock skew) show as zero.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{}h {}m {}s", hours, minutes, seconds)
}
