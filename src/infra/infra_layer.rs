// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "database.rs"]
pub mod database;

#[path = "links/sqlite_link_store.rs"]
pub mod links;

#[path = "warehouse/sqlite_warehouse_store.rs"]
pub mod warehouse;

#[path = "http/health_server.rs"]
pub mod http;
