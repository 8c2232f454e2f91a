// Discord commands for the warehouse ledger.
//
// Thin layer: parse arguments, call WarehouseService, render embeds.
// Reading is open to everyone; anything that changes stock needs
// Manage Server.

use crate::core::actor::Actor;
use crate::core::warehouse::{
    MovementKind, NewItem, StockMovement, WarehouseError, WarehouseItem, MOVEMENT_HISTORY_LIMIT,
};
use crate::discord::errors::{reject, warehouse_rejection_title};
use crate::discord::{Context, Error};
use chrono::{DateTime, Duration, Utc};
use poise::serenity_prelude as serenity;
use std::collections::BTreeMap;

pub const DEFAULT_HISTORY_DAYS: u32 = 7;
pub const MAX_HISTORY_DAYS: u32 = 365;

// Discord embed limits.
const MAX_EMBED_FIELDS: usize = 25;
const FIELD_VALUE_LIMIT: usize = 1000;
// Room left for fields once title and footer are in (hard limit 6000).
const FIELD_TEXT_BUDGET: usize = 5500;

/// Warehouse stock: items, quantities and movement history.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    subcommands(
        "add",
        "list",
        "categories",
        "receive",
        "issue",
        "adjust",
        "delete",
        "low",
        "history"
    )
)]
pub async fn stock(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Add a new item to the warehouse.
#[allow(clippy::too_many_arguments)]
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn add(
    ctx: Context<'_>,
    #[description = "Item name"] name: String,
    #[description = "Starting quantity (default 0)"]
    #[min = 0]
    quantity: Option<i64>,
    #[description = "Category (default General)"] category: Option<String>,
    #[description = "Unit of measure (default pcs)"] unit: Option<String>,
    #[description = "Reorder threshold, 0 disables low-stock alerts"]
    #[min = 0]
    min_quantity: Option<i64>,
    #[description = "Where it is stored"] location: Option<String>,
    #[description = "Free-form notes"] notes: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let actor = actor_of(ctx);
    let warehouse = &ctx.data().warehouse;

    let new_item = NewItem {
        name,
        category: category.unwrap_or_default(),
        quantity: quantity.unwrap_or(0),
        unit: unit.unwrap_or_default(),
        min_quantity: min_quantity.unwrap_or(0),
        location: location.unwrap_or_default(),
        notes: notes.unwrap_or_default(),
    };

    let item_id = match warehouse.create_item(guild_id, new_item, &actor).await {
        Ok(id) => id,
        Err(err) => return handle_error(ctx, err).await,
    };
    let item = warehouse.get_item(guild_id, item_id).await?;

    let mut embed = serenity::CreateEmbed::new()
        .title("📦 Item added")
        .color(0x2ECC71)
        .field("Item", format!("#{} **{}**", item.id, item.name), false)
        .field("Category", &item.category, true)
        .field("Quantity", format_quantity(&item), true)
        .field("Reorder at", format_number(item.min_quantity), true);
    if !item.location.is_empty() {
        embed = embed.field("📍 Location", &item.location, true);
    }
    if !item.notes.is_empty() {
        embed = embed.field("📝 Notes", &item.notes, false);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// List items, optionally only one category.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn list(
    ctx: Context<'_>,
    #[description = "Only show this category"]
    #[autocomplete = "autocomplete_category"]
    category: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let items = ctx
        .data()
        .warehouse
        .list_items(guild_id, category.as_deref())
        .await?;

    if items.is_empty() {
        let message = match category {
            Some(category) => format!("No items in category **{}**.", category),
            None => "The warehouse is empty. Add something with `/stock add`.".to_string(),
        };
        ctx.say(message).await?;
        return Ok(());
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("📦 Warehouse")
        .color(0x5865F2)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "{} item(s) · ⚠️ = low stock",
            items.len()
        )));

    for (title, value) in list_fields(&group_by_category(&items)) {
        embed = embed.field(title, value, false);
    }

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// List the categories in use.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn categories(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let categories = ctx.data().warehouse.list_categories(guild_id).await?;

    if categories.is_empty() {
        ctx.say("No categories yet.").await?;
        return Ok(());
    }

    let embed = serenity::CreateEmbed::new()
        .title("🗂️ Categories")
        .color(0x5865F2)
        .description(
            categories
                .iter()
                .map(|c| format!("• {}", c))
                .collect::<Vec<_>>()
                .join("\n"),
        );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Book incoming stock.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn receive(
    ctx: Context<'_>,
    #[description = "Item"]
    #[autocomplete = "autocomplete_item"]
    item: i64,
    #[description = "How many arrived"]
    #[min = 1]
    amount: i64,
    #[description = "Why (e.g. supplier delivery)"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let actor = actor_of(ctx);
    let result = ctx
        .data()
        .warehouse
        .receive(guild_id, item, amount, reason.as_deref().unwrap_or(""), &actor)
        .await;
    reply_with_movement(ctx, result).await
}

/// Book outgoing stock.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn issue(
    ctx: Context<'_>,
    #[description = "Item"]
    #[autocomplete = "autocomplete_item"]
    item: i64,
    #[description = "How many leave the warehouse"]
    #[min = 1]
    amount: i64,
    #[description = "Why (e.g. handed to team)"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let actor = actor_of(ctx);
    let result = ctx
        .data()
        .warehouse
        .issue(guild_id, item, amount, reason.as_deref().unwrap_or(""), &actor)
        .await;
    reply_with_movement(ctx, result).await
}

/// Set the quantity after a stock count.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn adjust(
    ctx: Context<'_>,
    #[description = "Item"]
    #[autocomplete = "autocomplete_item"]
    item: i64,
    #[description = "Counted quantity"]
    #[min = 0]
    quantity: i64,
    #[description = "Why (e.g. inventory count)"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let actor = actor_of(ctx);
    let result = ctx
        .data()
        .warehouse
        .adjust(guild_id, item, quantity, reason.as_deref().unwrap_or(""), &actor)
        .await;
    reply_with_movement(ctx, result).await
}

/// Remove an item. Its movement history is kept.
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "Item"]
    #[autocomplete = "autocomplete_item"]
    item: i64,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let warehouse = &ctx.data().warehouse;

    let existing = match warehouse.get_item(guild_id, item).await {
        Ok(existing) => existing,
        Err(err) => return handle_error(ctx, err).await,
    };

    if warehouse.delete_item(guild_id, item).await? {
        ctx.say(format!(
            "🗑️ Deleted #{} **{}**. Its history stays in `/stock history`.",
            existing.id, existing.name
        ))
        .await?;
        Ok(())
    } else {
        handle_error(ctx, WarehouseError::NotFound(item)).await
    }
}

/// Items at or below their reorder threshold.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn low(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    let items = ctx.data().warehouse.list_low_stock(guild_id).await?;

    if items.is_empty() {
        ctx.say("✅ Nothing is running low.").await?;
        return Ok(());
    }

    let lines: Vec<String> = items
        .iter()
        .map(|item| {
            format!(
                "⚠️ #{} **{}**: {} (reorder at {})",
                item.id,
                item.name,
                format_quantity(item),
                format_number(item.min_quantity)
            )
        })
        .collect();

    let embed = serenity::CreateEmbed::new()
        .title("⚠️ Low stock")
        .color(0xF1C40F)
        .description(truncate_description(&lines));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Recent stock movements.
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn history(
    ctx: Context<'_>,
    #[description = "How many days back (default 7)"]
    #[min = 1]
    #[max = 365]
    days: Option<u32>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?.get();
    // Prefix invocations skip the slash bounds.
    let (days, since) = history_window(Utc::now(), days);

    let movements = ctx
        .data()
        .warehouse
        .list_movements(guild_id, since)
        .await?;

    if movements.is_empty() {
        ctx.say(format!("No stock movements in the last {} day(s).", days))
            .await?;
        return Ok(());
    }

    let lines: Vec<String> = movements.iter().map(describe_movement).collect();

    let embed = serenity::CreateEmbed::new()
        .title(format!("📜 Stock history, last {} day(s)", days))
        .color(0x5865F2)
        .description(truncate_description(&lines))
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Newest first · showing up to {} movements",
            MOVEMENT_HISTORY_LIMIT
        )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

fn actor_of(ctx: Context<'_>) -> Actor {
    let author = ctx.author();
    Actor::new(author.id.get(), author.name.clone())
}

/// Expected failures become a rejection embed, everything else goes to
/// the framework's error hook.
async fn handle_error(ctx: Context<'_>, err: WarehouseError) -> Result<(), Error> {
    if !err.is_rejection() {
        return Err(err.into());
    }
    let description = match &err {
        WarehouseError::InsufficientStock {
            requested,
            available,
        } => format!(
            "Requested {} but only {} in stock.",
            format_number(*requested),
            format_number(*available)
        ),
        other => other.to_string(),
    };
    reject(ctx, warehouse_rejection_title(&err), description).await
}

async fn reply_with_movement(
    ctx: Context<'_>,
    result: Result<StockMovement, WarehouseError>,
) -> Result<(), Error> {
    let movement = match result {
        Ok(movement) => movement,
        Err(err) => return handle_error(ctx, err).await,
    };

    let embed = serenity::CreateEmbed::new()
        .title(format!(
            "{} {}",
            movement.kind.emoji(),
            movement_title(&movement)
        ))
        .color(0x2ECC71)
        .field(
            "Item",
            format!("#{} **{}**", movement.item_id, movement.item_name),
            false,
        )
        .field(
            "Quantity",
            format!(
                "{} → {} ({})",
                format_number(movement.quantity_before),
                format_number(movement.quantity_after),
                format_delta(movement.delta)
            ),
            true,
        )
        .field("Reason", &movement.reason, true)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "by {}",
            movement.actor_name
        )));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

fn movement_title(movement: &StockMovement) -> &'static str {
    match movement.kind {
        MovementKind::Incoming => "Stock received",
        MovementKind::Outgoing => "Stock issued",
        MovementKind::Adjustment => "Stock adjusted",
    }
}

fn describe_movement(movement: &StockMovement) -> String {
    format!(
        "{} <t:{}:d> **{}** {} → {} ({}) · {} · {}",
        movement.kind.emoji(),
        movement.created_at.timestamp(),
        movement.item_name,
        format_number(movement.quantity_before),
        format_number(movement.quantity_after),
        format_delta(movement.delta),
        movement.reason,
        movement.actor_name
    )
}

/// Lines per category, in the order the items arrive (already sorted).
fn group_by_category(items: &[WarehouseItem]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for item in items {
        let mut line = format!("`#{}` **{}**: {}", item.id, item.name, format_quantity(item));
        if !item.location.is_empty() {
            line.push_str(&format!(" · 📍 {}", item.location));
        }
        if item.is_low_stock() {
            line.push_str(" ⚠️");
        }
        grouped.entry(item.category.clone()).or_default().push(line);
    }
    grouped
}

/// Clamp the requested number of days and compute where the window starts.
fn history_window(now: DateTime<Utc>, days: Option<u32>) -> (u32, DateTime<Utc>) {
    let days = days
        .unwrap_or(DEFAULT_HISTORY_DAYS)
        .clamp(1, MAX_HISTORY_DAYS);
    (days, now - Duration::days(i64::from(days)))
}

/// Embed fields for `stock list`, one or more per category. Stops before
/// Discord's field count or total size limits and ends with an
/// "…and N more" field for whatever was left out.
fn list_fields(grouped: &BTreeMap<String, Vec<String>>) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    let mut used = 0;
    let mut omitted = 0;

    for (category, lines) in grouped {
        for (i, (chunk, count)) in chunk_lines(lines).into_iter().enumerate() {
            let title = if i == 0 {
                category.clone()
            } else {
                format!("{} (cont.)", category)
            };
            let size = title.chars().count() + chunk.chars().count();

            // Last slot is reserved for the overflow marker.
            if omitted > 0 || fields.len() + 1 >= MAX_EMBED_FIELDS || used + size > FIELD_TEXT_BUDGET
            {
                omitted += count;
                continue;
            }

            used += size;
            fields.push((title, chunk));
        }
    }

    if omitted > 0 {
        fields.push(("…".to_string(), format!("and {} more item(s)", omitted)));
    }

    fields
}

/// Join lines into embed field values under Discord's 1024 char limit.
/// Each chunk comes with the number of lines it holds.
fn chunk_lines(lines: &[String]) -> Vec<(String, usize)> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for line in lines {
        let line = clip(line, FIELD_VALUE_LIMIT);
        if !current.is_empty() && current.len() + line.len() + 1 > FIELD_VALUE_LIMIT {
            chunks.push((std::mem::take(&mut current), count));
            count = 0;
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
        count += 1;
    }

    if !current.is_empty() {
        chunks.push((current, count));
    }

    chunks
}

/// Cut a line to at most `max` bytes on a char boundary.
fn clip(line: &str, max: usize) -> &str {
    if line.len() <= max {
        return line;
    }
    let mut end = max;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

/// Join lines for an embed description (4096 chars), dropping the tail
/// with a marker if it doesn't fit.
fn truncate_description(lines: &[String]) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if out.len() + line.len() + 1 > 3900 {
            out.push_str(&format!("\n…and {} more", lines.len() - i));
            break;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
    }
    out
}

fn format_quantity(item: &WarehouseItem) -> String {
    format!("{} {}", format_number(item.quantity), item.unit)
}

fn format_delta(delta: i64) -> String {
    if delta > 0 {
        format!("+{}", format_number(delta))
    } else {
        format_number(delta)
    }
}

/// Format a number with commas for readability
fn format_number(n: i64) -> String {
    let s = n.to_string();
    let negative = s.starts_with('-');
    let s = if negative { &s[1..] } else { &s };

    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }

    if negative {
        result.insert(0, '-');
    }

    result
}

/// Autocomplete items by name; the value sent back is the item id.
async fn autocomplete_item<'a>(
    ctx: Context<'_>,
    partial: &'a str,
) -> impl Iterator<Item = serenity::AutocompleteChoice> + 'a {
    let items = match ctx.guild_id() {
        Some(guild_id) => ctx
            .data()
            .warehouse
            .list_items(guild_id.get(), None)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Item autocomplete failed: {}", e);
                Vec::new()
            }),
        None => Vec::new(),
    };

    let partial = partial.to_lowercase();
    items
        .into_iter()
        .filter(move |item| item.name.to_lowercase().contains(&partial))
        .take(25)
        .map(|item| {
            serenity::AutocompleteChoice::new(
                format!("{} ({} {})", item.name, item.quantity, item.unit),
                item.id,
            )
        })
}

async fn autocomplete_category<'a>(
    ctx: Context<'_>,
    partial: &'a str,
) -> impl Iterator<Item = String> + 'a {
    let categories = match ctx.guild_id() {
        Some(guild_id) => ctx
            .data()
            .warehouse
            .list_categories(guild_id.get())
            .await
            .unwrap_or_default(),
        None => Vec::new(),
    };

    categories
        .into_iter()
        .filter(move |c| c.to_lowercase().contains(&partial.to_lowercase()))
        .take(25)
}
