// Warehouse domain models.

use crate::core::actor::Actor;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementKind {
    Incoming,
    Outgoing,
    Adjustment,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Incoming => "incoming",
            MovementKind::Outgoing => "outgoing",
            MovementKind::Adjustment => "adjustment",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            MovementKind::Incoming => "📥",
            MovementKind::Outgoing => "📤",
            MovementKind::Adjustment => "🔧",
        }
    }

    /// Reason recorded when the caller didn't give one.
    pub fn default_reason(&self) -> &'static str {
        match self {
            MovementKind::Incoming => "stock received",
            MovementKind::Outgoing => "stock issued",
            MovementKind::Adjustment => "manual adjustment",
        }
    }
}

impl FromStr for MovementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incoming" => Ok(MovementKind::Incoming),
            "outgoing" => Ok(MovementKind::Outgoing),
            "adjustment" => Ok(MovementKind::Adjustment),
            other => Err(format!("unknown movement kind: {}", other)),
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked item in a guild's warehouse.
#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseItem {
    pub id: i64,
    pub guild_id: u64,
    pub name: String,
    pub category: String,
    /// Never negative.
    pub quantity: i64,
    pub unit: String,
    /// Reorder threshold. 0 disables low-stock alerts.
    pub min_quantity: i64,
    pub location: String,
    pub notes: String,
    pub last_updated: DateTime<Utc>,
}

impl WarehouseItem {
    /// Out-of-stock items (quantity 0) are deliberately not "low".
    pub fn is_low_stock(&self) -> bool {
        self.quantity > 0 && self.quantity <= self.min_quantity
    }
}

/// Attributes supplied when creating an item.
#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub unit: String,
    pub min_quantity: i64,
    pub location: String,
    pub notes: String,
}

/// One immutable entry in the audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct StockMovement {
    pub id: i64,
    pub guild_id: u64,
    pub item_id: i64,
    /// Snapshot of the name at the time of the movement.
    pub item_name: String,
    pub kind: MovementKind,
    pub delta: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reason: String,
    pub actor_id: u64,
    pub actor_name: String,
    pub created_at: DateTime<Utc>,
}

/// A quantity change the store must apply only if the item still holds
/// `expected`. Applying it also appends the matching movement.
#[derive(Debug, Clone)]
pub struct QuantityUpdate {
    pub guild_id: u64,
    pub item_id: i64,
    pub item_name: String,
    pub expected: i64,
    pub new_quantity: i64,
    pub kind: MovementKind,
    pub reason: String,
    pub actor: Actor,
    pub at: DateTime<Utc>,
}

impl QuantityUpdate {
    pub fn delta(&self) -> i64 {
        self.new_quantity - self.expected
    }
}
