use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;
use std::collections::HashMap;

// Category definitions with emojis and order
const CATEGORY_ORDER: &[&str] = &["Quick Start", "Role Links", "Warehouse", "Moderation"];

fn get_category_emoji(category: &str) -> &'static str {
    match category {
        "Quick Start" => "🚀",
        "Role Links" => "🔗",
        "Warehouse" => "📦",
        "Moderation" => "🛡️",
        _ => "•",
    }
}

struct CommandMetadata {
    category: &'static str,
    priority: i32,
    description: Option<&'static str>,
    note: Option<&'static str>,
}

fn get_command_metadata(qualified_name: &str) -> CommandMetadata {
    match qualified_name {
        "ping" => CommandMetadata {
            category: "Quick Start",
            priority: 100,
            description: Some("Check the bot's latency."),
            note: None,
        },
        "info" => CommandMetadata {
            category: "Quick Start",
            priority: 90,
            description: Some("Uptime, features and how many departures were handled."),
            note: None,
        },
        "link redeem" => CommandMetadata {
            category: "Role Links",
            priority: 100,
            description: Some("Redeem a code to receive its role."),
            note: None,
        },
        "link create" => CommandMetadata {
            category: "Role Links",
            priority: 80,
            description: Some("Create a role code with optional use limit and expiry."),
            note: Some("Requires Manage Roles."),
        },
        "link list" => CommandMetadata {
            category: "Role Links",
            priority: 70,
            description: Some("Show this server's active codes and their status."),
            note: Some("Requires Manage Roles."),
        },
        "link deactivate" => CommandMetadata {
            category: "Role Links",
            priority: 60,
            description: Some("Switch a code off for good."),
            note: Some("Requires Manage Roles."),
        },
        "stock list" => CommandMetadata {
            category: "Warehouse",
            priority: 100,
            description: Some("List items, optionally for one category."),
            note: None,
        },
        "stock low" => CommandMetadata {
            category: "Warehouse",
            priority: 90,
            description: Some("Items at or below their reorder threshold."),
            note: None,
        },
        "stock history" => CommandMetadata {
            category: "Warehouse",
            priority: 85,
            description: Some("Recent stock movements (last 7 days by default)."),
            note: None,
        },
        "stock add" | "stock receive" | "stock issue" | "stock adjust" | "stock delete" => {
            CommandMetadata {
                category: "Warehouse",
                priority: 50,
                description: None,
                note: Some("Requires Manage Server."),
            }
        }
        "clear" => CommandMetadata {
            category: "Moderation",
            priority: 50,
            description: Some("Delete the last messages in this channel."),
            note: Some("Administrators only."),
        },
        _ => CommandMetadata {
            category: "Quick Start",
            priority: 0,
            description: None,
            note: None,
        },
    }
}

/// Show a categorized list of commands.
#[poise::command(slash_command, prefix_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let mut categories: HashMap<&str, Vec<(i32, String)>> = HashMap::new();

    for command in &ctx.framework().options().commands {
        if command.hide_in_help || command.name == "help" {
            continue;
        }

        // Groups like `link` are listed by their subcommands.
        let leaves: Vec<(String, &poise::Command<_, _>)> = if command.subcommands.is_empty() {
            vec![(command.name.clone(), command)]
        } else {
            command
                .subcommands
                .iter()
                .map(|sub| (format!("{} {}", command.name, sub.name), sub))
                .collect()
        };

        for (qualified_name, leaf) in leaves {
            let metadata = get_command_metadata(&qualified_name);

            let description = metadata
                .description
                .or(leaf.description.as_deref())
                .unwrap_or("No description provided.");

            let mut entry = format!("• **/{}** — {}", qualified_name, description);
            if let Some(note) = metadata.note {
                entry.push_str(&format!("\n  ⤷ {}", note));
            }

            categories
                .entry(metadata.category)
                .or_default()
                .push((metadata.priority, entry));
        }
    }

    let prefix = ctx
        .framework()
        .options()
        .prefix_options
        .prefix
        .clone()
        .unwrap_or_default();

    let mut embed = serenity::CreateEmbed::new()
        .title("📋 Available commands")
        .description(format!(
            "Use slash commands with `/`, or type them with the `{}` prefix.",
            prefix
        ))
        .color(0x00FF00)
        .timestamp(serenity::Timestamp::now());

    // Sort categories based on defined order, then alphabetically for others
    let mut sorted_categories: Vec<_> = categories.keys().cloned().collect();
    sorted_categories.sort_by(|a, b| {
        let pos_a = CATEGORY_ORDER.iter().position(|&x| x == *a).unwrap_or(999);
        let pos_b = CATEGORY_ORDER.iter().position(|&x| x == *b).unwrap_or(999);
        pos_a.cmp(&pos_b).then(a.cmp(b))
    });

    for category in sorted_categories {
        if let Some(entries) = categories.get_mut(category) {
            // Sort by priority (descending), then name (ascending)
            entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

            let title = format!("{} {}", get_category_emoji(category), category);
            let formatted_entries: Vec<String> = entries.iter().map(|(_, s)| s.clone()).collect();

            for (i, chunk) in chunk_entries(&formatted_entries).iter().enumerate() {
                let field_name = if i == 0 {
                    title.clone()
                } else {
                    format!("{} (cont.)", title)
                };
                embed = embed.field(field_name, chunk.join("\n"), false);
            }
        }
    }

    embed = embed.field(
        "⚙️ Automatic",
        "• Members who leave are banned\n• Ban notices are posted to the log channel",
        false,
    );

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

fn chunk_entries(entries: &[String]) -> Vec<Vec<String>> {
    let mut chunks = Vec::new();
    let mut current_chunk = Vec::new();
    let mut current_length = 0;

    for entry in entries {
        let entry_len = entry.len();
        // Discord field value limit is 1024. We leave a bit of buffer.
        if current_length + entry_len + 1 > 1000 && !current_chunk.is_empty() {
            chunks.push(current_chunk);
            current_chunk = Vec::new();
            current_length = 0;
        }

        current_chunk.push(entry.clone());
        current_length += entry_len + 1; // +1 for newline
    }

    if !current_chunk.is_empty() {
        chunks.push(current_chunk);
    }

    chunks
}
