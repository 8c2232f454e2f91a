// Warehouse ledger - item quantities per guild with an append-only
// movement history.

pub mod warehouse_models;
pub mod warehouse_service;

pub use warehouse_models::*;
pub use warehouse_service::*;
