// Discord side of auto-ban: a serenity implementation of MemberGateway and
// the translation from a GuildMemberRemoval event into a Departure.

use crate::core::moderation::{BanNotice, Departure, DepartureOutcome, GatewayError, MemberGateway};
use crate::discord::Data;
use async_trait::async_trait;
use chrono::Utc;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

pub const BAN_NOTICE_COLOR: u32 = 0xFF0000;

/// Talks to Discord over HTTP on behalf of `DepartureService`.
pub struct SerenityGateway {
    http: Arc<serenity::Http>,
}

impl SerenityGateway {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MemberGateway for SerenityGateway {
    async fn ban(&self, guild_id: u64, user_id: u64, reason: &str) -> Result<(), GatewayError> {
        serenity::GuildId::new(guild_id)
            .ban_with_reason(&self.http, serenity::UserId::new(user_id), 0, reason)
            .await
            .map_err(classify)
    }

    async fn post_ban_notice(
        &self,
        channel_name: &str,
        notice: &BanNotice,
    ) -> Result<bool, GatewayError> {
        let channels = serenity::GuildId::new(notice.guild_id)
            .channels(&self.http)
            .await
            .map_err(classify)?;

        let Some(channel) = channels
            .values()
            .find(|c| c.kind == serenity::ChannelType::Text && c.name == channel_name)
        else {
            return Ok(false);
        };

        channel
            .id
            .send_message(
                &self.http,
                serenity::CreateMessage::new().embed(ban_notice_embed(notice)),
            )
            .await
            .map_err(classify)?;

        Ok(true)
    }
}

/// HTTP 403 means the bot lacks permissions; everything else is the
/// platform's problem.
fn classify(err: serenity::Error) -> GatewayError {
    match &err {
        serenity::Error::Http(::serenity::http::HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 403 =>
        {
            GatewayError::Forbidden(err.to_string())
        }
        _ => GatewayError::Platform(err.to_string()),
    }
}

pub fn ban_notice_embed(notice: &BanNotice) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title("🚫 Auto-ban")
        .description(format!(
            "{} (<@{}>) left the server and was banned.",
            notice.display_name, notice.user_id
        ))
        .color(BAN_NOTICE_COLOR)
        .field("User ID", notice.user_id.to_string(), true)
        .field("Reason", &notice.reason, true);

    if let Ok(ts) = serenity::Timestamp::from_unix_timestamp(notice.banned_at.timestamp()) {
        embed = embed.timestamp(ts);
    }

    embed
}

/// Handle a member leaving. Never fails: the outcome is logged and that's it.
pub async fn handle_member_remove(
    ctx: &serenity::Context,
    data: &Data,
    guild_id: serenity::GuildId,
    user: &serenity::User,
    member_data: Option<&serenity::Member>,
) -> DepartureOutcome {
    let display_name = member_data
        .map(|m| m.display_name().to_string())
        .unwrap_or_else(|| user.name.clone());

    let departure = Departure {
        guild_id: guild_id.get(),
        user_id: user.id.get(),
        display_name,
        is_bot: user.bot,
        left_at: Utc::now(),
    };

    let gateway = SerenityGateway::new(Arc::clone(&ctx.http));
    let outcome = data.departures.handle_departure(&gateway, departure).await;

    if let DepartureOutcome::Banned { logged: false } = outcome {
        tracing::warn!(
            guild_id = guild_id.get(),
            "Ban notice not posted: no #{} channel",
            data.departures.config().log_channel_name
        );
    }

    outcome
}
