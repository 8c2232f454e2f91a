// Link codes - role grants handed out as redeemable codes.

pub mod link_models;
pub mod link_service;

pub use link_models::*;
pub use link_service::*;
