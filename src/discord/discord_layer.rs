// Discord layer - commands, event handlers and the serenity-backed gateway.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "moderation/autoban.rs"]
pub mod autoban;

#[path = "errors.rs"]
pub mod errors;

#[path = "events.rs"]
pub mod events;

// Re-export command types for convenience
pub use commands::{Context, Data, Error};
