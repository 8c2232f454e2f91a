// Discord commands module.
// Each feature gets its own command file.

use crate::core::links::LinkService;
use crate::core::moderation::DepartureService;
use crate::core::warehouse::WarehouseService;
use crate::infra::links::SqliteLinkStore;
use crate::infra::warehouse::SqliteWarehouseStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub mod help;

pub mod links;

pub mod stock;

pub mod utility;

// Bot presence management
pub mod presence;

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands.
/// This is where we store our services and configuration.
pub struct Data {
    pub links: Arc<LinkService<SqliteLinkStore>>,
    pub warehouse: Arc<WarehouseService<SqliteWarehouseStore>>,
    pub departures: Arc<DepartureService>,
    pub started_at: DateTime<Utc>,
}

/// Every command the framework registers.
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        utility::ping(),
        utility::info(),
        utility::clear(),
        help::help(),
        links::link(),
        stock::stock(),
    ]
}
