// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "actor.rs"]
pub mod actor;

#[path = "links/mod.rs"]
pub mod links;

#[path = "warehouse/mod.rs"]
pub mod warehouse;

#[path = "moderation/mod.rs"]
pub mod moderation;
