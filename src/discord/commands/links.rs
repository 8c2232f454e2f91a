// Discord commands for role link codes.
//
// Same pattern as every command file:
// 1. Extract primitive data from Discord types
// 2. Call the core service
// 3. Format the response based on the result

use crate::core::links::{IssueLink, LinkError, RoleLink};
use crate::discord::errors::{link_rejection_title, reject};
use crate::discord::{Context, Error};
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;

/// Role links: codes that grant a role when redeemed.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands("create", "redeem", "list", "deactivate")
)]
pub async fn link(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Create a code that grants a role.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_ROLES"
)]
pub async fn create(
    ctx: Context<'_>,
    #[description = "Role the code grants"] role: serenity::Role,
    #[description = "How many times it can be used (0 = unlimited)"] uses: Option<u32>,
    #[description = "Hours until it expires (0 = never, max 87600)"]
    #[max = 87600]
    expires_in_hours: Option<u32>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let author = ctx.author();

    let issued = ctx
        .data()
        .links
        .issue(IssueLink {
            guild_id: guild_id.get(),
            role_id: role.id.get(),
            role_name: role.name.clone(),
            actor_id: author.id.get(),
            actor_name: author.name.clone(),
            uses_limit: uses.unwrap_or(0),
            expires_in_hours: expires_in_hours.unwrap_or(0),
        })
        .await;

    let link = match issued {
        Ok(link) => link,
        Err(err) if err.is_rejection() => {
            return reject(ctx, link_rejection_title(&err), err.to_string()).await
        }
        Err(err) => return Err(err.into()),
    };

    let embed = serenity::CreateEmbed::new()
        .title("🔗 Link created")
        .color(0x2ECC71)
        .field("Code", format!("`{}`", link.code), false)
        .field("Role", format!("<@&{}>", link.role_id), true)
        .field("Uses", format_limit(link.uses_limit), true)
        .field("Expires", format_expiry(link.expires_at), true)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Redeem with /link redeem {}",
            link.code
        )));

    // The code is a secret until the moderator decides to share it.
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Redeem a code to receive its role.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn redeem(
    ctx: Context<'_>,
    #[description = "The code you were given"] code: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let user = ctx.author();

    let redemption = match ctx.data().links.redeem(&code, guild_id.get()).await {
        Ok(redemption) => redemption,
        Err(err) if err.is_rejection() => {
            return reject(ctx, link_rejection_title(&err), describe_rejection(&err)).await
        }
        Err(err) => return Err(err.into()),
    };

    // The use is already counted; a failed grant is reported but not refunded.
    ctx.http()
        .add_member_role(
            guild_id,
            user.id,
            serenity::RoleId::new(redemption.role_id),
            Some("Redeemed role link"),
        )
        .await?;

    let uses = if redemption.uses_limit == 0 {
        format!("{} (unlimited)", redemption.uses_count)
    } else {
        format!("{}/{}", redemption.uses_count, redemption.uses_limit)
    };

    let embed = serenity::CreateEmbed::new()
        .title("✅ Role granted")
        .description(format!("You now have <@&{}>.", redemption.role_id))
        .color(0x2ECC71)
        .field("Code uses", uses, true);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Show this server's active codes.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_ROLES"
)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let links = ctx.data().links.list_active(guild_id.get()).await?;

    if links.is_empty() {
        ctx.send(
            poise::CreateReply::default()
                .content("No active links in this server.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let now = Utc::now();
    let mut embed = serenity::CreateEmbed::new()
        .title("🔗 Active links")
        .color(0x5865F2)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "{} link(s)",
            links.len()
        )));

    // Discord caps embeds at 25 fields.
    for link in links.iter().take(25) {
        embed = embed.field(format!("`{}`", link.code), describe_link(link, now), false);
    }

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Switch a code off. It stays on record but can't be redeemed.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_ROLES"
)]
pub async fn deactivate(
    ctx: Context<'_>,
    #[description = "Code to switch off"] code: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    match ctx.data().links.deactivate(&code, guild_id.get()).await {
        Ok(true) => {
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("🔒 Link `{}` deactivated.", code.trim()))
                    .ephemeral(true),
            )
            .await?;
            Ok(())
        }
        Ok(false) => {
            reject(
                ctx,
                "Unknown code",
                format!("No active link `{}` in this server.", code.trim()),
            )
            .await
        }
        Err(err) if err.is_rejection() => {
            reject(ctx, link_rejection_title(&err), err.to_string()).await
        }
        Err(err) => Err(err.into()),
    }
}

fn describe_rejection(err: &LinkError) -> String {
    match err {
        LinkError::NotFound(_) => "That code doesn't exist or was switched off.".to_string(),
        LinkError::LimitExhausted { limit } => {
            format!("That code has already been used {} time(s).", limit)
        }
        LinkError::Expired(at) => format!(
            "That code expired on {}.",
            at.format("%d.%m.%Y %H:%M UTC")
        ),
        other => other.to_string(),
    }
}

fn describe_link(link: &RoleLink, now: DateTime<Utc>) -> String {
    let uses = match link.remaining_uses() {
        Some(left) => format!("{}/{} used, {} left", link.uses_count, link.uses_limit, left),
        None => format!("{} used, unlimited", link.uses_count),
    };

    format!(
        "{} · <@&{}>\n{} · expires {}\nby {}",
        link.status(now).label(),
        link.role_id,
        uses,
        format_expiry(link.expires_at),
        link.created_by_name
    )
}

fn format_limit(uses_limit: u32) -> String {
    if uses_limit == 0 {
        "Unlimited".to_string()
    } else {
        uses_limit.to_string()
    }
}

fn format_expiry(expires_at: Option<DateTime<Utc>>) -> String {
    match expires_at {
        Some(at) => format!("<t:{}:R>", at.timestamp()),
        None => "never".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::links::LinkStatus;
    use chrono::Duration;

    fn sample_link() -> RoleLink {
        RoleLink {
            id: 1,
            code: "abc".to_string(),
            guild_id: 1,
            role_id: 42,
            role_name: "Member".to_string(),
            uses_limit: 3,
            uses_count: 1,
            expires_at: None,
            created_by: 7,
            created_by_name: "mod".to_string(),
            created_at: Utc::now(),
            active: true,
        }
    }

    #[test]
    fn test_describe_link_shows_status_and_uses() {
        let now = Utc::now();
        let mut link = sample_link();
        let text = describe_link(&link, now);
        assert!(text.contains("1/3 used, 2 left"));
        assert!(text.contains("expires never"));
        assert!(text.contains(LinkStatus::Usable.label()));

        link.expires_at = Some(now - Duration::hours(1));
        assert!(describe_link(&link, now).contains(LinkStatus::Expired.label()));
    }

    #[test]
    fn test_format_limit() {
        assert_eq!(format_limit(0), "Unlimited");
        assert_eq!(format_limit(5), "5");
    }

    #[test]
    fn test_describe_rejection_mentions_limit() {
        let text = describe_rejection(&LinkError::LimitExhausted { limit: 2 });
        assert!(text.contains('2'));
    }
}
