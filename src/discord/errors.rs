// Turning failures into something the user can read.
//
// Expected domain failures (unknown code, not enough stock, ...) are sent
// back as a red embed by the command itself. Anything that escapes a
// command lands in `on_error` below.

use crate::core::links::LinkError;
use crate::core::warehouse::WarehouseError;
use crate::discord::{Context, Data, Error};
use poise::serenity_prelude as serenity;

pub const REJECTION_COLOR: u32 = 0xE74C3C;

pub fn rejection_embed(title: &str, description: impl Into<String>) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(format!("❌ {}", title))
        .description(description)
        .color(REJECTION_COLOR)
}

/// Reply to the invoking user with a rejection embed.
pub async fn reject(
    ctx: Context<'_>,
    title: &str,
    description: impl Into<String>,
) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .embed(rejection_embed(title, description))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Title for a link failure the user caused.
pub fn link_rejection_title(err: &LinkError) -> &'static str {
    match err {
        LinkError::NotFound(_) => "Unknown code",
        LinkError::LimitExhausted { .. } => "Code used up",
        LinkError::Expired(_) => "Code expired",
        LinkError::InvalidInput(_) => "Invalid input",
        LinkError::DuplicateCode | LinkError::StorageError(_) => "Something went wrong",
    }
}

/// Title for a warehouse failure the user caused.
pub fn warehouse_rejection_title(err: &WarehouseError) -> &'static str {
    match err {
        WarehouseError::NotFound(_) => "Item not found",
        WarehouseError::InsufficientStock { .. } => "Not enough stock",
        WarehouseError::InvalidInput(_) => "Invalid input",
        WarehouseError::Conflict(_) => "Item is busy",
        WarehouseError::StorageError(_) => "Something went wrong",
    }
}

/// Framework-wide error hook. Never lets an error take the bot down.
pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!(
                command = %ctx.command().qualified_name,
                "Command failed: {}",
                error
            );
            let _ = ctx
                .send(
                    poise::CreateReply::default()
                        .embed(rejection_embed(
                            "Something went wrong",
                            "The command failed. Please try again later.",
                        ))
                        .ephemeral(true),
                )
                .await;
        }
        poise::FrameworkError::MissingUserPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            let needed = missing_permissions
                .map(|p| p.to_string())
                .unwrap_or_else(|| "the required permissions".to_string());
            let _ = ctx
                .send(
                    poise::CreateReply::default()
                        .embed(rejection_embed(
                            "Permission denied",
                            format!("You need {} to use this command.", needed),
                        ))
                        .ephemeral(true),
                )
                .await;
        }
        poise::FrameworkError::ArgumentParse {
            error, input, ctx, ..
        } => {
            let detail = match input {
                Some(input) => format!("Could not understand `{}`: {}", input, error),
                None => format!("Missing or invalid argument: {}", error),
            };
            let _ = ctx
                .send(
                    poise::CreateReply::default()
                        .embed(rejection_embed("Invalid input", detail))
                        .ephemeral(true),
                )
                .await;
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                tracing::error!("Error while handling error: {}", e);
            }
        }
    }
}
