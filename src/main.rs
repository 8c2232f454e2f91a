// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (SQLite stores, HTTP health)
// - `discord/` = Discord-specific adapters (commands, events, gateway)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Start the health endpoint
// 4. Set up the Discord framework and run it

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use crate::config::BotConfig;
use crate::core::links::LinkService;
use crate::core::moderation::DepartureService;
use crate::core::warehouse::WarehouseService;
use crate::discord::commands::presence;
use crate::discord::{Data, Error};
use crate::infra::database::open_pool;
use crate::infra::links::SqliteLinkStore;
use crate::infra::warehouse::SqliteWarehouseStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // A bad config is fatal, and nothing is listening yet.
    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        tracing::error!("Bot stopped: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: BotConfig) -> anyhow::Result<()> {
    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    // One pool for the whole process, shared by both stores.
    let pool = open_pool(&config.database_path)
        .await
        .context("Failed to open database")?;

    let link_store = SqliteLinkStore::new(pool.clone());
    link_store
        .migrate()
        .await
        .context("Failed to migrate link tables")?;

    let warehouse_store = SqliteWarehouseStore::new(pool);
    warehouse_store
        .migrate()
        .await
        .context("Failed to migrate warehouse tables")?;

    let data = Data {
        links: Arc::new(LinkService::new(link_store)),
        warehouse: Arc::new(WarehouseService::new(warehouse_store)),
        departures: Arc::new(DepartureService::new(config.autoban.clone())),
        started_at: chrono::Utc::now(),
    };

    // ========================================================================
    // HEALTH ENDPOINT
    // ========================================================================
    // Runs independently of the gateway so hosting platforms see us alive
    // even while Discord reconnects.

    let http_port = config.http_port;
    tokio::spawn(async move {
        if let Err(e) = infra::http::serve(http_port).await {
            tracing::error!("Health endpoint stopped: {:#}", e);
        }
    });

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS // Required for departure events
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT; // Required for prefix commands

    let prefix = config.command_prefix.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: discord::commands::all(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.command_prefix.clone()),
                ..Default::default()
            },
            on_error: |error| Box::pin(discord::errors::on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(discord::events::event_handler(ctx, event, framework, data))
            },
            pre_command: |ctx| {
                Box::pin(async move {
                    tracing::info!(
                        user_id = ctx.author().id.get(),
                        "Running command {}",
                        ctx.command().qualified_name
                    );
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                tracing::info!("🤖 Bot is starting up...");

                // Register slash commands globally (can take up to an hour to propagate)
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!(
                    "✅ Registered {} commands",
                    framework.options().commands.len()
                );

                presence::on_ready(ctx, &prefix);
                tracing::info!("🚀 Bot is ready!");

                Ok::<Data, Error>(data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
