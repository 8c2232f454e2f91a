// Warehouse service - stock bookkeeping with an audit trail.
//
// Every quantity change goes through one guarded update: read the item,
// compute the target, then ask the store to apply it only if nobody else
// changed the quantity in between. The movement record is written in the
// same step, so history and stock never drift apart.

use super::warehouse_models::{
    MovementKind, NewItem, QuantityUpdate, StockMovement, WarehouseItem,
};
use crate::core::actor::Actor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Movement history is capped at this many entries per query.
pub const MOVEMENT_HISTORY_LIMIT: usize = 50;

/// Reason recorded on the movement that opens an item's history.
pub const INITIAL_STOCK_REASON: &str = "initial stock";

pub const DEFAULT_CATEGORY: &str = "General";
pub const DEFAULT_UNIT: &str = "pcs";

/// Text limits, in characters. Keeps every item line well inside an embed field.
pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_CATEGORY_CHARS: usize = 50;
pub const MAX_UNIT_CHARS: usize = 20;
pub const MAX_LOCATION_CHARS: usize = 100;
pub const MAX_NOTES_CHARS: usize = 500;

const MAX_UPDATE_ATTEMPTS: usize = 3;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("Item #{0} was not found in this server")]
    NotFound(i64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient stock: requested {requested}, but only {available} available")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("Item #{0} changed while it was being updated, please try again")]
    Conflict(i64),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl WarehouseError {
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            WarehouseError::NotFound(_)
                | WarehouseError::InvalidInput(_)
                | WarehouseError::InsufficientStock { .. }
                | WarehouseError::Conflict(_)
        )
    }
}

// ============================================================================
// STORAGE TRAIT
// ============================================================================

#[async_trait]
pub trait WarehouseStore: Send + Sync {
    /// Insert the item and its opening movement together.
    async fn insert_item(
        &self,
        guild_id: u64,
        item: &NewItem,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<WarehouseItem, WarehouseError>;

    async fn get_item(
        &self,
        guild_id: u64,
        item_id: i64,
    ) -> Result<Option<WarehouseItem>, WarehouseError>;

    /// Apply `update` only if the stored quantity still equals
    /// `update.expected`. Returns `None` when the guard did not match.
    async fn compare_and_set_quantity(
        &self,
        update: &QuantityUpdate,
    ) -> Result<Option<StockMovement>, WarehouseError>;

    /// Hard delete. Movements for the item are kept.
    async fn delete_item(&self, guild_id: u64, item_id: i64) -> Result<bool, WarehouseError>;

    /// Items ordered by category, then name.
    async fn list_items(
        &self,
        guild_id: u64,
        category: Option<&str>,
    ) -> Result<Vec<WarehouseItem>, WarehouseError>;

    async fn list_categories(&self, guild_id: u64) -> Result<Vec<String>, WarehouseError>;

    /// Items where 0 < quantity <= min_quantity.
    async fn list_low_stock(&self, guild_id: u64) -> Result<Vec<WarehouseItem>, WarehouseError>;

    /// Movements at or after `since`, newest first.
    async fn list_movements(
        &self,
        guild_id: u64,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<StockMovement>, WarehouseError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct WarehouseService<S: WarehouseStore> {
    store: S,
}

impl<S: WarehouseStore> WarehouseService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create an item and return its id.
    pub async fn create_item(
        &self,
        guild_id: u64,
        item: NewItem,
        actor: &Actor,
    ) -> Result<i64, WarehouseError> {
        let item = normalize_new_item(item)?;
        let created = self
            .store
            .insert_item(guild_id, &item, actor, Utc::now())
            .await?;

        tracing::info!(
            guild_id,
            item_id = created.id,
            quantity = created.quantity,
            actor_id = actor.id,
            "Created warehouse item {}",
            created.name
        );

        Ok(created.id)
    }

    pub async fn get_item(
        &self,
        guild_id: u64,
        item_id: i64,
    ) -> Result<WarehouseItem, WarehouseError> {
        self.store
            .get_item(guild_id, item_id)
            .await?
            .ok_or(WarehouseError::NotFound(item_id))
    }

    /// Set an absolute quantity and record it as a movement of `kind`.
    pub async fn set_quantity(
        &self,
        guild_id: u64,
        item_id: i64,
        new_quantity: i64,
        kind: MovementKind,
        reason: &str,
        actor: &Actor,
    ) -> Result<StockMovement, WarehouseError> {
        if new_quantity < 0 {
            return Err(WarehouseError::InvalidInput(
                "quantity cannot be negative".to_string(),
            ));
        }
        self.apply(guild_id, item_id, kind, reason, actor, |_| Ok(new_quantity))
            .await
    }

    /// Book incoming stock. `amount` must be positive.
    pub async fn receive(
        &self,
        guild_id: u64,
        item_id: i64,
        amount: i64,
        reason: &str,
        actor: &Actor,
    ) -> Result<StockMovement, WarehouseError> {
        if amount <= 0 {
            return Err(WarehouseError::InvalidInput(
                "incoming amount must be positive".to_string(),
            ));
        }
        self.apply(
            guild_id,
            item_id,
            MovementKind::Incoming,
            reason,
            actor,
            |current| {
                current.checked_add(amount).ok_or_else(|| {
                    WarehouseError::InvalidInput("quantity is too large".to_string())
                })
            },
        )
        .await
    }

    /// Book outgoing stock. Rejected without touching the item if it would
    /// go below zero.
    pub async fn issue(
        &self,
        guild_id: u64,
        item_id: i64,
        amount: i64,
        reason: &str,
        actor: &Actor,
    ) -> Result<StockMovement, WarehouseError> {
        if amount <= 0 {
            return Err(WarehouseError::InvalidInput(
                "outgoing amount must be positive".to_string(),
            ));
        }
        self.apply(
            guild_id,
            item_id,
            MovementKind::Outgoing,
            reason,
            actor,
            |current| {
                let remaining = current - amount;
                if remaining < 0 {
                    Err(WarehouseError::InsufficientStock {
                        requested: amount,
                        available: current,
                    })
                } else {
                    Ok(remaining)
                }
            },
        )
        .await
    }

    /// Overwrite the quantity after a stock count.
    pub async fn adjust(
        &self,
        guild_id: u64,
        item_id: i64,
        new_quantity: i64,
        reason: &str,
        actor: &Actor,
    ) -> Result<StockMovement, WarehouseError> {
        self.set_quantity(
            guild_id,
            item_id,
            new_quantity,
            MovementKind::Adjustment,
            reason,
            actor,
        )
        .await
    }

    pub async fn delete_item(&self, guild_id: u64, item_id: i64) -> Result<bool, WarehouseError> {
        let deleted = self.store.delete_item(guild_id, item_id).await?;
        if deleted {
            tracing::info!(guild_id, item_id, "Deleted warehouse item");
        }
        Ok(deleted)
    }

    pub async fn list_items(
        &self,
        guild_id: u64,
        category: Option<&str>,
    ) -> Result<Vec<WarehouseItem>, WarehouseError> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        self.store.list_items(guild_id, category).await
    }

    pub async fn list_categories(&self, guild_id: u64) -> Result<Vec<String>, WarehouseError> {
        self.store.list_categories(guild_id).await
    }

    pub async fn list_low_stock(
        &self,
        guild_id: u64,
    ) -> Result<Vec<WarehouseItem>, WarehouseError> {
        self.store.list_low_stock(guild_id).await
    }

    /// Newest movements since `since`, at most `MOVEMENT_HISTORY_LIMIT`.
    pub async fn list_movements(
        &self,
        guild_id: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<StockMovement>, WarehouseError> {
        self.store
            .list_movements(guild_id, since, MOVEMENT_HISTORY_LIMIT)
            .await
    }

    /// Read-compute-swap loop shared by every quantity change.
    async fn apply<F>(
        &self,
        guild_id: u64,
        item_id: i64,
        kind: MovementKind,
        reason: &str,
        actor: &Actor,
        target: F,
    ) -> Result<StockMovement, WarehouseError>
    where
        F: Fn(i64) -> Result<i64, WarehouseError> + Send + Sync,
    {
        let reason = match reason.trim() {
            "" => kind.default_reason().to_string(),
            trimmed => trimmed.to_string(),
        };

        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let item = self.get_item(guild_id, item_id).await?;
            let new_quantity = target(item.quantity)?;

            let update = QuantityUpdate {
                guild_id,
                item_id,
                item_name: item.name,
                expected: item.quantity,
                new_quantity,
                kind,
                reason: reason.clone(),
                actor: actor.clone(),
                at: Utc::now(),
            };

            if let Some(movement) = self.store.compare_and_set_quantity(&update).await? {
                tracing::info!(
                    guild_id,
                    item_id,
                    movement_id = movement.id,
                    kind = %kind,
                    delta = movement.delta,
                    quantity = movement.quantity_after,
                    actor_id = actor.id,
                    "Stock updated"
                );
                return Ok(movement);
            }

            tracing::debug!(guild_id, item_id, attempt, "Quantity changed concurrently, retrying");
        }

        tracing::warn!(guild_id, item_id, "Giving up on contended stock update");
        Err(WarehouseError::Conflict(item_id))
    }
}

fn normalize_new_item(item: NewItem) -> Result<NewItem, WarehouseError> {
    let name = item.name.trim().to_string();
    if name.is_empty() {
        return Err(WarehouseError::InvalidInput(
            "item name cannot be empty".to_string(),
        ));
    }
    if item.quantity < 0 {
        return Err(WarehouseError::InvalidInput(
            "quantity cannot be negative".to_string(),
        ));
    }
    if item.min_quantity < 0 {
        return Err(WarehouseError::InvalidInput(
            "minimum quantity cannot be negative".to_string(),
        ));
    }

    let or_default = |value: String, default: &str| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            default.to_string()
        } else {
            trimmed.to_string()
        }
    };

    let normalized = NewItem {
        name,
        category: or_default(item.category, DEFAULT_CATEGORY),
        unit: or_default(item.unit, DEFAULT_UNIT),
        location: item.location.trim().to_string(),
        notes: item.notes.trim().to_string(),
        ..item
    };

    for (field, value, max) in [
        ("name", &normalized.name, MAX_NAME_CHARS),
        ("category", &normalized.category, MAX_CATEGORY_CHARS),
        ("unit", &normalized.unit, MAX_UNIT_CHARS),
        ("location", &normalized.location, MAX_LOCATION_CHARS),
        ("notes", &normalized.notes, MAX_NOTES_CHARS),
    ] {
        if value.chars().count() > max {
            return Err(WarehouseError::InvalidInput(format!(
                "{} can be at most {} characters",
                field, max
            )));
        }
    }

    Ok(normalized)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryWarehouseStore {
        items: Mutex<Vec<WarehouseItem>>,
        movements: Mutex<Vec<StockMovement>>,
        // When set, the next compare-and-set sees someone else's write first.
        interfere_once: AtomicBool,
    }

    impl InMemoryWarehouseStore {
        fn push_movement(&self, update: &QuantityUpdate) -> StockMovement {
            let mut movements = self.movements.lock().unwrap();
            let movement = StockMovement {
                id: movements.len() as i64 + 1,
                guild_id: update.guild_id,
                item_id: update.item_id,
                item_name: update.item_name.clone(),
                kind: update.kind,
                delta: update.delta(),
                quantity_before: update.expected,
                quantity_after: update.new_quantity,
                reason: update.reason.clone(),
                actor_id: update.actor.id,
                actor_name: update.actor.name.clone(),
                created_at: update.at,
            };
            movements.push(movement.clone());
            movement
        }
    }

    #[async_trait]
    impl WarehouseStore for InMemoryWarehouseStore {
        async fn insert_item(
            &self,
            guild_id: u64,
            item: &NewItem,
            actor: &Actor,
            at: DateTime<Utc>,
        ) -> Result<WarehouseItem, WarehouseError> {
            let stored = {
                let mut items = self.items.lock().unwrap();
                let stored = WarehouseItem {
                    id: items.len() as i64 + 1,
                    guild_id,
                    name: item.name.clone(),
                    category: item.category.clone(),
                    quantity: item.quantity,
                    unit: item.unit.clone(),
                    min_quantity: item.min_quantity,
                    location: item.location.clone(),
                    notes: item.notes.clone(),
                    last_updated: at,
                };
                items.push(stored.clone());
                stored
            };
            self.push_movement(&QuantityUpdate {
                guild_id,
                item_id: stored.id,
                item_name: stored.name.clone(),
                expected: 0,
                new_quantity: stored.quantity,
                kind: MovementKind::Incoming,
                reason: INITIAL_STOCK_REASON.to_string(),
                actor: actor.clone(),
                at,
            });
            Ok(stored)
        }

        async fn get_item(
            &self,
            guild_id: u64,
            item_id: i64,
        ) -> Result<Option<WarehouseItem>, WarehouseError> {
            let items = self.items.lock().unwrap();
            Ok(items
                .iter()
                .find(|i| i.guild_id == guild_id && i.id == item_id)
                .cloned())
        }

        async fn compare_and_set_quantity(
            &self,
            update: &QuantityUpdate,
        ) -> Result<Option<StockMovement>, WarehouseError> {
            {
                let mut items = self.items.lock().unwrap();
                let Some(item) = items
                    .iter_mut()
                    .find(|i| i.guild_id == update.guild_id && i.id == update.item_id)
                else {
                    return Ok(None);
                };
                if self.interfere_once.swap(false, Ordering::SeqCst) {
                    item.quantity += 1;
                }
                if item.quantity != update.expected {
                    return Ok(None);
                }
                item.quantity = update.new_quantity;
                item.last_updated = update.at;
            }
            Ok(Some(self.push_movement(update)))
        }

        async fn delete_item(&self, guild_id: u64, item_id: i64) -> Result<bool, WarehouseError> {
            let mut items = self.items.lock().unwrap();
            let before = items.len();
            items.retain(|i| !(i.guild_id == guild_id && i.id == item_id));
            Ok(items.len() != before)
        }

        async fn list_items(
            &self,
            guild_id: u64,
            category: Option<&str>,
        ) -> Result<Vec<WarehouseItem>, WarehouseError> {
            let items = self.items.lock().unwrap();
            let mut found: Vec<WarehouseItem> = items
                .iter()
                .filter(|i| i.guild_id == guild_id)
                .filter(|i| category.map_or(true, |c| i.category == c))
                .cloned()
                .collect();
            found.sort_by(|a, b| a.category.cmp(&b.category).then(a.name.cmp(&b.name)));
            Ok(found)
        }

        async fn list_categories(&self, guild_id: u64) -> Result<Vec<String>, WarehouseError> {
            let items = self.items.lock().unwrap();
            let mut categories: Vec<String> = items
                .iter()
                .filter(|i| i.guild_id == guild_id)
                .map(|i| i.category.clone())
                .collect();
            categories.sort();
            categories.dedup();
            Ok(categories)
        }

        async fn list_low_stock(
            &self,
            guild_id: u64,
        ) -> Result<Vec<WarehouseItem>, WarehouseError> {
            let items = self.items.lock().unwrap();
            Ok(items
                .iter()
                .filter(|i| i.guild_id == guild_id && i.is_low_stock())
                .cloned()
                .collect())
        }

        async fn list_movements(
            &self,
            guild_id: u64,
            since: DateTime<Utc>,
            limit: usize,
        ) -> Result<Vec<StockMovement>, WarehouseError> {
            let movements = self.movements.lock().unwrap();
            Ok(movements
                .iter()
                .rev()
                .filter(|m| m.guild_id == guild_id && m.created_at >= since)
                .take(limit)
                .cloned()
                .collect())
        }
    }

    const GUILD: u64 = 42;

    fn actor() -> Actor {
        Actor::new(7, "quartermaster")
    }

    fn widget() -> NewItem {
        NewItem {
            name: "Widget".to_string(),
            quantity: 10,
            unit: "pcs".to_string(),
            min_quantity: 5,
            ..Default::default()
        }
    }

    fn service() -> WarehouseService<InMemoryWarehouseStore> {
        WarehouseService::new(InMemoryWarehouseStore::default())
    }

    #[tokio::test]
    async fn test_create_item_records_initial_stock() {
        let service = service();
        let id = service.create_item(GUILD, widget(), &actor()).await.unwrap();

        let items = service.list_items(GUILD, None).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, id);
        assert_eq!(items[0].name, "Widget");
        assert_eq!(items[0].quantity, 10);
        assert_eq!(items[0].category, DEFAULT_CATEGORY);

        let movements = service
            .list_movements(GUILD, Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(movements.len(), 1);
        let opening = &movements[0];
        assert_eq!(opening.kind, MovementKind::Incoming);
        assert_eq!(opening.delta, 10);
        assert_eq!(opening.quantity_before, 0);
        assert_eq!(opening.quantity_after, 10);
        assert_eq!(opening.reason, INITIAL_STOCK_REASON);
    }

    #[tokio::test]
    async fn test_create_item_rejects_bad_input() {
        let service = service();
        for item in [
            NewItem {
                quantity: -1,
                ..widget()
            },
            NewItem {
                min_quantity: -1,
                ..widget()
            },
            NewItem {
                name: "   ".to_string(),
                ..widget()
            },
            NewItem {
                name: "x".repeat(1_100),
                ..widget()
            },
            NewItem {
                location: "Shelf ".repeat(40),
                ..widget()
            },
        ] {
            assert!(matches!(
                service.create_item(GUILD, item, &actor()).await,
                Err(WarehouseError::InvalidInput(_))
            ));
        }
        assert!(service.list_items(GUILD, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_name_at_limit_is_accepted() {
        let service = service();
        // Multi-byte characters count once each.
        let name = "é".repeat(MAX_NAME_CHARS);
        let id = service
            .create_item(
                GUILD,
                NewItem {
                    name: name.clone(),
                    ..widget()
                },
                &actor(),
            )
            .await
            .unwrap();
        assert_eq!(service.get_item(GUILD, id).await.unwrap().name, name);
    }

    #[tokio::test]
    async fn test_widget_sale_scenario() {
        let service = service();
        let id = service.create_item(GUILD, widget(), &actor()).await.unwrap();

        let sale = service.issue(GUILD, id, 3, "sale", &actor()).await.unwrap();
        assert_eq!(sale.delta, -3);
        assert_eq!(sale.quantity_before, 10);
        assert_eq!(sale.quantity_after, 7);
        assert_eq!(sale.kind, MovementKind::Outgoing);
        assert_eq!(sale.reason, "sale");

        let err = service
            .issue(GUILD, id, 10, "sale", &actor())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WarehouseError::InsufficientStock {
                requested: 10,
                available: 7
            }
        ));
        assert_eq!(service.get_item(GUILD, id).await.unwrap().quantity, 7);
    }

    #[tokio::test]
    async fn test_set_quantity_brackets_the_change() {
        let service = service();
        let id = service.create_item(GUILD, widget(), &actor()).await.unwrap();

        for target in [0, 25, 3] {
            let before = service.get_item(GUILD, id).await.unwrap().quantity;
            let movement = service
                .set_quantity(GUILD, id, target, MovementKind::Adjustment, "count", &actor())
                .await
                .unwrap();
            assert_eq!(movement.quantity_before, before);
            assert_eq!(movement.quantity_after, target);
            assert_eq!(movement.delta, target - before);
        }

        assert!(matches!(
            service
                .set_quantity(GUILD, id, -1, MovementKind::Adjustment, "", &actor())
                .await,
            Err(WarehouseError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_receive_and_amount_validation() {
        let service = service();
        let id = service.create_item(GUILD, widget(), &actor()).await.unwrap();

        let movement = service.receive(GUILD, id, 5, "", &actor()).await.unwrap();
        assert_eq!(movement.quantity_after, 15);
        assert_eq!(movement.reason, MovementKind::Incoming.default_reason());

        assert!(matches!(
            service.receive(GUILD, id, 0, "", &actor()).await,
            Err(WarehouseError::InvalidInput(_))
        ));
        assert!(matches!(
            service.issue(GUILD, id, -2, "", &actor()).await,
            Err(WarehouseError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_item_and_foreign_guild() {
        let service = service();
        let id = service.create_item(GUILD, widget(), &actor()).await.unwrap();

        assert!(matches!(
            service.receive(GUILD, 999, 1, "", &actor()).await,
            Err(WarehouseError::NotFound(999))
        ));
        assert!(matches!(
            service.adjust(GUILD + 1, id, 1, "", &actor()).await,
            Err(WarehouseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_change_is_retried_on_fresh_value() {
        let service = service();
        let id = service.create_item(GUILD, widget(), &actor()).await.unwrap();

        service.store.interfere_once.store(true, Ordering::SeqCst);
        let movement = service.issue(GUILD, id, 4, "sale", &actor()).await.unwrap();

        // Someone bumped 10 -> 11 underneath us; the retry works from 11.
        assert_eq!(movement.quantity_before, 11);
        assert_eq!(movement.quantity_after, 7);
    }

    #[tokio::test]
    async fn test_delete_keeps_history() {
        let service = service();
        let id = service.create_item(GUILD, widget(), &actor()).await.unwrap();
        service.issue(GUILD, id, 1, "sale", &actor()).await.unwrap();

        assert!(service.delete_item(GUILD, id).await.unwrap());
        assert!(!service.delete_item(GUILD, id).await.unwrap());

        let movements = service
            .list_movements(GUILD, Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].item_name, "Widget");
    }

    #[tokio::test]
    async fn test_categories_and_low_stock() {
        let service = service();
        let widget_id = service.create_item(GUILD, widget(), &actor()).await.unwrap();
        service
            .create_item(
                GUILD,
                NewItem {
                    name: "Bolt".to_string(),
                    category: "Hardware".to_string(),
                    quantity: 100,
                    min_quantity: 20,
                    ..Default::default()
                },
                &actor(),
            )
            .await
            .unwrap();

        assert_eq!(
            service.list_categories(GUILD).await.unwrap(),
            vec!["General".to_string(), "Hardware".to_string()]
        );
        let hardware = service.list_items(GUILD, Some("Hardware")).await.unwrap();
        assert_eq!(hardware.len(), 1);
        assert_eq!(hardware[0].unit, DEFAULT_UNIT);

        assert!(service.list_low_stock(GUILD).await.unwrap().is_empty());
        service.issue(GUILD, widget_id, 6, "sale", &actor()).await.unwrap();
        let low = service.list_low_stock(GUILD).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, widget_id);
    }

    #[tokio::test]
    async fn test_movement_history_is_capped() {
        let service = service();
        let id = service
            .create_item(
                GUILD,
                NewItem {
                    quantity: 1000,
                    ..widget()
                },
                &actor(),
            )
            .await
            .unwrap();
        for _ in 0..60 {
            service.issue(GUILD, id, 1, "sale", &actor()).await.unwrap();
        }

        let movements = service
            .list_movements(GUILD, Utc::now() - chrono::Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(movements.len(), MOVEMENT_HISTORY_LIMIT);
        assert_eq!(movements[0].quantity_after, 940);
    }
}
