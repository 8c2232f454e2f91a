// Core moderation module - auto-ban on departure.
// Same split as the other features: models plus a service.

pub mod departure_models;
pub mod departure_service;

pub use departure_models::*;
pub use departure_service::*;
