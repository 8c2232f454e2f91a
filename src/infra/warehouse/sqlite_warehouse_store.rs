// SQLite implementation of WarehouseStore.
//
// Tables:
// - warehouse_items: current stock per item
// - stock_movements: append-only audit trail, survives item deletion

use crate::core::actor::Actor;
use crate::core::warehouse::{
    MovementKind, NewItem, QuantityUpdate, StockMovement, WarehouseError, WarehouseItem,
    WarehouseStore, INITIAL_STOCK_REASON,
};
use crate::infra::database::{decode_timestamp, encode_timestamp};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteWarehouseStore {
    pool: Pool<Sqlite>,
}

impl SqliteWarehouseStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if they don't exist yet.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS warehouse_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
                unit TEXT NOT NULL,
                min_quantity INTEGER NOT NULL DEFAULT 0 CHECK (min_quantity >= 0),
                location TEXT NOT NULL DEFAULT '',
                notes TEXT NOT NULL DEFAULT '',
                last_updated TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // No foreign key to warehouse_items: history outlives the item.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stock_movements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                guild_id INTEGER NOT NULL,
                item_id INTEGER NOT NULL,
                item_name TEXT NOT NULL,
                change_kind TEXT NOT NULL,
                delta INTEGER NOT NULL,
                quantity_before INTEGER NOT NULL,
                quantity_after INTEGER NOT NULL,
                reason TEXT NOT NULL,
                actor_id INTEGER NOT NULL,
                actor_name TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_warehouse_items_guild
            ON warehouse_items(guild_id, category, name)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_stock_movements_guild
            ON stock_movements(guild_id, created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl WarehouseStore for SqliteWarehouseStore {
    async fn insert_item(
        &self,
        guild_id: u64,
        item: &NewItem,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<WarehouseItem, WarehouseError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let result = sqlx::query(
            r#"
            INSERT INTO warehouse_items (
                guild_id, name, category, quantity, unit, min_quantity,
                location, notes, last_updated
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(guild_id as i64)
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.quantity)
        .bind(&item.unit)
        .bind(item.min_quantity)
        .bind(&item.location)
        .bind(&item.notes)
        .bind(encode_timestamp(at))
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        let item_id = result.last_insert_rowid();

        let opening = QuantityUpdate {
            guild_id,
            item_id,
            item_name: item.name.clone(),
            expected: 0,
            new_quantity: item.quantity,
            kind: MovementKind::Incoming,
            reason: INITIAL_STOCK_REASON.to_string(),
            actor: actor.clone(),
            at,
        };
        insert_movement(&mut *tx, &opening)
            .await
            .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;

        Ok(WarehouseItem {
            id: item_id,
            guild_id,
            name: item.name.clone(),
            category: item.category.clone(),
            quantity: item.quantity,
            unit: item.unit.clone(),
            min_quantity: item.min_quantity,
            location: item.location.clone(),
            notes: item.notes.clone(),
            last_updated: at,
        })
    }

    async fn get_item(
        &self,
        guild_id: u64,
        item_id: i64,
    ) -> Result<Option<WarehouseItem>, WarehouseError> {
        let row = sqlx::query("SELECT * FROM warehouse_items WHERE id = ? AND guild_id = ?")
            .bind(item_id)
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.as_ref().map(row_to_item).transpose()
    }

    async fn compare_and_set_quantity(
        &self,
        update: &QuantityUpdate,
    ) -> Result<Option<StockMovement>, WarehouseError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let result = sqlx::query(
            r#"
            UPDATE warehouse_items
            SET quantity = ?, last_updated = ?
            WHERE id = ? AND guild_id = ? AND quantity = ?
            "#,
        )
        .bind(update.new_quantity)
        .bind(encode_timestamp(update.at))
        .bind(update.item_id)
        .bind(update.guild_id as i64)
        .bind(update.expected)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(storage_error)?;
            return Ok(None);
        }

        let movement_id = insert_movement(&mut *tx, update)
            .await
            .map_err(storage_error)?;
        tx.commit().await.map_err(storage_error)?;

        Ok(Some(StockMovement {
            id: movement_id,
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
        }))
    }

    async fn delete_item(&self, guild_id: u64, item_id: i64) -> Result<bool, WarehouseError> {
        let result = sqlx::query("DELETE FROM warehouse_items WHERE id = ? AND guild_id = ?")
            .bind(item_id)
            .bind(guild_id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_items(
        &self,
        guild_id: u64,
        category: Option<&str>,
    ) -> Result<Vec<WarehouseItem>, WarehouseError> {
        let rows = match category {
            Some(category) => {
                sqlx::query(
                    r#"
                    SELECT * FROM warehouse_items
                    WHERE guild_id = ? AND category = ?
                    ORDER BY category, name, id
                    "#,
                )
                .bind(guild_id as i64)
                .bind(category)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT * FROM warehouse_items
                    WHERE guild_id = ?
                    ORDER BY category, name, id
                    "#,
                )
                .bind(guild_id as i64)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(storage_error)?;

        rows.iter().map(row_to_item).collect()
    }

    async fn list_categories(&self, guild_id: u64) -> Result<Vec<String>, WarehouseError> {
        let rows = sqlx::query(
            "SELECT DISTINCT category FROM warehouse_items WHERE guild_id = ? ORDER BY category",
        )
        .bind(guild_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.iter().map(|row| row.get("category")).collect())
    }

    async fn list_low_stock(&self, guild_id: u64) -> Result<Vec<WarehouseItem>, WarehouseError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM warehouse_items
            WHERE guild_id = ? AND quantity > 0 AND quantity <= min_quantity
            ORDER BY quantity, name
            "#,
        )
        .bind(guild_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(row_to_item).collect()
    }

    async fn list_movements(
        &self,
        guild_id: u64,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<StockMovement>, WarehouseError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM stock_movements
            WHERE guild_id = ? AND created_at >= ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(guild_id as i64)
        .bind(encode_timestamp(since))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(row_to_movement).collect()
    }
}

async fn insert_movement(
    conn: &mut SqliteConnection,
    update: &QuantityUpdate,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO stock_movements (
            guild_id, item_id, item_name, change_kind, delta,
            quantity_before, quantity_after, reason, actor_id, actor_name, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(update.guild_id as i64)
    .bind(update.item_id)
    .bind(&update.item_name)
    .bind(update.kind.as_str())
    .bind(update.delta())
    .bind(update.expected)
    .bind(update.new_quantity)
    .bind(&update.reason)
    .bind(update.actor.id as i64)
    .bind(&update.actor.name)
    .bind(encode_timestamp(update.at))
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

fn storage_error(e: sqlx::Error) -> WarehouseError {
    WarehouseError::StorageError(e.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, WarehouseError> {
    decode_timestamp(raw)
        .ok_or_else(|| WarehouseError::StorageError(format!("bad timestamp: {}", raw)))
}

fn row_to_item(row: &SqliteRow) -> Result<WarehouseItem, WarehouseError> {
    let last_updated: String = row.get("last_updated");
    Ok(WarehouseItem {
        id: row.get("id"),
        guild_id: row.get::<i64, _>("guild_id") as u64,
        name: row.get("name"),
        category: row.get("category"),
        quantity: row.get("quantity"),
        unit: row.get("unit"),
        min_quantity: row.get("min_quantity"),
        location: row.get("location"),
        notes: row.get("notes"),
        last_updated: parse_timestamp(&last_updated)?,
    })
}

fn row_to_movement(row: &SqliteRow) -> Result<StockMovement, WarehouseError> {
    let kind: String = row.get("change_kind");
    let kind = kind
        .parse::<MovementKind>()
        .map_err(WarehouseError::StorageError)?;
    let created_at: String = row.get("created_at");

    Ok(StockMovement {
        id: row.get("id"),
        guild_id: row.get::<i64, _>("guild_id") as u64,
        item_id: row.get("item_id"),
        item_name: row.get("item_name"),
        kind,
        delta: row.get("delta"),
        quantity_before: row.get("quantity_before"),
        quantity_after: row.get("quantity_after"),
        reason: row.get("reason"),
        actor_id: row.get::<i64, _>("actor_id") as u64,
        actor_name: row.get("actor_name"),
        created_at: parse_timestamp(&created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::warehouse::WarehouseService;
    use chrono::Duration;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

    const GUILD: u64 = 900_000_000_000_000_001;

    async fn memory_store() -> SqliteWarehouseStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteWarehouseStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn actor() -> Actor {
        Actor::new(5, "storekeeper")
    }

    fn widget() -> NewItem {
        NewItem {
            name: "Widget".to_string(),
            category: "Parts".to_string(),
            quantity: 10,
            unit: "pcs".to_string(),
            min_quantity: 5,
            location: "Shelf A".to_string(),
            notes: "fragile".to_string(),
        }
    }

    fn an_hour_ago() -> DateTime<Utc> {
        Utc::now() - Duration::hours(1)
    }

    #[tokio::test]
    async fn test_insert_item_writes_opening_movement() {
        let store = memory_store().await;
        let item = store
            .insert_item(GUILD, &widget(), &actor(), Utc::now())
            .await
            .unwrap();

        let fetched = store.get_item(GUILD, item.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Widget");
        assert_eq!(fetched.location, "Shelf A");
        assert_eq!(fetched.guild_id, GUILD);

        let movements = store.list_movements(GUILD, an_hour_ago(), 50).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].kind, MovementKind::Incoming);
        assert_eq!(movements[0].delta, 10);
        assert_eq!(movements[0].reason, INITIAL_STOCK_REASON);
        assert_eq!(movements[0].actor_name, "storekeeper");
    }

    #[tokio::test]
    async fn test_compare_and_set_requires_expected_quantity() {
        let store = memory_store().await;
        let item = store
            .insert_item(GUILD, &widget(), &actor(), Utc::now())
            .await
            .unwrap();

        let stale = QuantityUpdate {
            guild_id: GUILD,
            item_id: item.id,
            item_name: item.name.clone(),
            expected: 9,
            new_quantity: 4,
            kind: MovementKind::Outgoing,
            reason: "sale".to_string(),
            actor: actor(),
            at: Utc::now(),
        };
        assert!(store.compare_and_set_quantity(&stale).await.unwrap().is_none());
        assert_eq!(store.get_item(GUILD, item.id).await.unwrap().unwrap().quantity, 10);

        let fresh = QuantityUpdate {
            expected: 10,
            ..stale
        };
        let movement = store
            .compare_and_set_quantity(&fresh)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(movement.delta, -6);
        assert_eq!(store.get_item(GUILD, item.id).await.unwrap().unwrap().quantity, 4);

        // A rejected swap must not leave a movement behind.
        let movements = store.list_movements(GUILD, an_hour_ago(), 50).await.unwrap();
        assert_eq!(movements.len(), 2);
    }

    #[tokio::test]
    async fn test_check_constraint_blocks_negative_quantity() {
        let store = memory_store().await;
        let item = store
            .insert_item(GUILD, &widget(), &actor(), Utc::now())
            .await
            .unwrap();

        let negative = QuantityUpdate {
            guild_id: GUILD,
            item_id: item.id,
            item_name: item.name,
            expected: 10,
            new_quantity: -1,
            kind: MovementKind::Adjustment,
            reason: String::new(),
            actor: actor(),
            at: Utc::now(),
        };
        assert!(matches!(
            store.compare_and_set_quantity(&negative).await,
            Err(WarehouseError::StorageError(_))
        ));
        assert_eq!(store.get_item(GUILD, item.id).await.unwrap().unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn test_widget_scenario_through_service() {
        let service = WarehouseService::new(memory_store().await);
        let id = service.create_item(GUILD, widget(), &actor()).await.unwrap();

        let sale = service.issue(GUILD, id, 3, "sale", &actor()).await.unwrap();
        assert_eq!(sale.delta, -3);
        assert_eq!(sale.quantity_after, 7);

        assert!(matches!(
            service.issue(GUILD, id, 10, "sale", &actor()).await,
            Err(WarehouseError::InsufficientStock { .. })
        ));
        assert_eq!(service.get_item(GUILD, id).await.unwrap().quantity, 7);

        let history = service.list_movements(GUILD, an_hour_ago()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].reason, "sale");
    }

    #[tokio::test]
    async fn test_concurrent_issues_do_not_oversell() {
        let service = Arc::new(WarehouseService::new(memory_store().await));
        let id = service.create_item(GUILD, widget(), &actor()).await.unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.issue(GUILD, id, 3, "rush", &actor()).await })
            })
            .collect();

        let mut sold = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                sold += 3;
            }
        }

        let remaining = service.get_item(GUILD, id).await.unwrap().quantity;
        assert!(remaining >= 0);
        assert_eq!(remaining, 10 - sold);
    }

    #[tokio::test]
    async fn test_delete_keeps_movements_and_scopes_by_guild() {
        let store = memory_store().await;
        let item = store
            .insert_item(GUILD, &widget(), &actor(), Utc::now())
            .await
            .unwrap();

        assert!(!store.delete_item(GUILD + 1, item.id).await.unwrap());
        assert!(store.delete_item(GUILD, item.id).await.unwrap());
        assert!(store.get_item(GUILD, item.id).await.unwrap().is_none());

        let movements = store.list_movements(GUILD, an_hour_ago(), 50).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].item_name, "Widget");
    }

    #[tokio::test]
    async fn test_listing_queries() {
        let store = memory_store().await;
        let now = Utc::now();
        store.insert_item(GUILD, &widget(), &actor(), now).await.unwrap();
        let bolts = NewItem {
            name: "Bolt".to_string(),
            category: "Hardware".to_string(),
            quantity: 2,
            min_quantity: 10,
            ..widget()
        };
        store.insert_item(GUILD, &bolts, &actor(), now).await.unwrap();
        let empty = NewItem {
            name: "Nut".to_string(),
            category: "Hardware".to_string(),
            quantity: 0,
            min_quantity: 10,
            ..widget()
        };
        store.insert_item(GUILD, &empty, &actor(), now).await.unwrap();
        store.insert_item(GUILD + 1, &widget(), &actor(), now).await.unwrap();

        let names: Vec<String> = store
            .list_items(GUILD, None)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Bolt", "Nut", "Widget"]);

        assert_eq!(store.list_items(GUILD, Some("Hardware")).await.unwrap().len(), 2);
        assert_eq!(
            store.list_categories(GUILD).await.unwrap(),
            vec!["Hardware".to_string(), "Parts".to_string()]
        );

        let low = store.list_low_stock(GUILD).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Bolt");
    }

    #[tokio::test]
    async fn test_movements_since_and_limit() {
        let store = memory_store().await;
        let old = Utc::now() - Duration::days(10);
        let item = store.insert_item(GUILD, &widget(), &actor(), old).await.unwrap();

        for expected in 10..15 {
            let update = QuantityUpdate {
                guild_id: GUILD,
                item_id: item.id,
                item_name: item.name.clone(),
                expected,
                new_quantity: expected + 1,
                kind: MovementKind::Incoming,
                reason: "delivery".to_string(),
                actor: actor(),
                at: Utc::now(),
            };
            store.compare_and_set_quantity(&update).await.unwrap().unwrap();
        }

        let recent = store.list_movements(GUILD, an_hour_ago(), 50).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].quantity_after, 15);

        let capped = store.list_movements(GUILD, old, 3).await.unwrap();
        assert_eq!(capped.len(), 3);
    }
}
