// SQLite implementation of LinkStore.
//
// Table:
// - role_links: one row per issued code, never deleted

use crate::core::links::{LinkError, LinkStore, NewRoleLink, RedeemAttempt, Redemption, RoleLink};
use crate::infra::database::{decode_timestamp, encode_timestamp};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteLinkStore {
    pool: Pool<Sqlite>,
}

impl SqliteLinkStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Create the table if it doesn't exist yet.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS role_links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT NOT NULL UNIQUE,
                guild_id INTEGER NOT NULL,
                role_id INTEGER NOT NULL,
                role_name TEXT NOT NULL,
                uses_limit INTEGER NOT NULL DEFAULT 0,
                uses_count INTEGER NOT NULL DEFAULT 0,
                expires_at TEXT,
                created_by INTEGER NOT NULL,
                created_by_name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                active BOOLEAN NOT NULL DEFAULT 1
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_role_links_guild
            ON role_links(guild_id, active, created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_link(&self, code: &str, guild_id: u64) -> Result<Option<RoleLink>, LinkError> {
        let row = sqlx::query("SELECT * FROM role_links WHERE code = ? AND guild_id = ?")
            .bind(code)
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.as_ref().map(row_to_link).transpose()
    }
}

#[async_trait]
impl LinkStore for SqliteLinkStore {
    async fn insert_link(&self, link: NewRoleLink) -> Result<RoleLink, LinkError> {
        let result = sqlx::query(
            r#"
            INSERT INTO role_links (
                code, guild_id, role_id, role_name, uses_limit, uses_count,
                expires_at, created_by, created_by_name, created_at, active
            )
            VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(&link.code)
        .bind(link.guild_id as i64)
        .bind(link.role_id as i64)
        .bind(&link.role_name)
        .bind(i64::from(link.uses_limit))
        .bind(link.expires_at.map(encode_timestamp))
        .bind(link.created_by as i64)
        .bind(&link.created_by_name)
        .bind(encode_timestamp(link.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => LinkError::DuplicateCode,
            other => storage_error(other),
        })?;

        Ok(RoleLink {
            id: result.last_insert_rowid(),
            code: link.code,
            guild_id: link.guild_id,
            role_id: link.role_id,
            role_name: link.role_name,
            uses_limit: link.uses_limit,
            uses_count: 0,
            expires_at: link.expires_at,
            created_by: link.created_by,
            created_by_name: link.created_by_name,
            created_at: link.created_at,
            active: true,
        })
    }

    async fn try_redeem(
        &self,
        code: &str,
        guild_id: u64,
        now: DateTime<Utc>,
    ) -> Result<RedeemAttempt, LinkError> {
        // The WHERE clause is the whole usability check, so two concurrent
        // redemptions can never both pass a limit of one.
        let row = sqlx::query(
            r#"
            UPDATE role_links
            SET uses_count = uses_count + 1
            WHERE code = ? AND guild_id = ? AND active = 1
              AND (uses_limit = 0 OR uses_count < uses_limit)
              AND (expires_at IS NULL OR expires_at >= ?)
            RETURNING role_id, role_name, uses_count, uses_limit
            "#,
        )
        .bind(code)
        .bind(guild_id as i64)
        .bind(encode_timestamp(now))
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        match row {
            Some(row) => Ok(RedeemAttempt::Redeemed(Redemption {
                role_id: row.get::<i64, _>("role_id") as u64,
                role_name: row.get("role_name"),
                uses_count: row.get::<i64, _>("uses_count") as u32,
                uses_limit: row.get::<i64, _>("uses_limit") as u32,
            })),
            None => Ok(RedeemAttempt::Rejected(self.fetch_link(code, guild_id).await?)),
        }
    }

    async fn list_active(&self, guild_id: u64) -> Result<Vec<RoleLink>, LinkError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM role_links
            WHERE guild_id = ? AND active = 1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(guild_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(row_to_link).collect()
    }

    async fn deactivate(&self, code: &str, guild_id: u64) -> Result<bool, LinkError> {
        let result = sqlx::query(
            "UPDATE role_links SET active = 0 WHERE code = ? AND guild_id = ? AND active = 1",
        )
        .bind(code)
        .bind(guild_id as i64)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(result.rows_affected() > 0)
    }
}

fn storage_error(e: sqlx::Error) -> LinkError {
    LinkError::StorageError(e.to_string())
}

fn row_to_link(row: &SqliteRow) -> Result<RoleLink, LinkError> {
    let created_at: String = row.get("created_at");
    let created_at = decode_timestamp(&created_at).ok_or_else(|| {
        LinkError::StorageError(format!("bad created_at timestamp: {}", created_at))
    })?;
    let expires_at = row
        .get::<Option<String>, _>("expires_at")
        .map(|raw| {
            decode_timestamp(&raw)
                .ok_or_else(|| LinkError::StorageError(format!("bad expires_at timestamp: {}", raw)))
        })
        .transpose()?;

    Ok(RoleLink {
        id: row.get("id"),
        code: row.get("code"),
        guild_id: row.get::<i64, _>("guild_id") as u64,
        role_id: row.get::<i64, _>("role_id") as u64,
        role_name: row.get("role_name"),
        uses_limit: row.get::<i64, _>("uses_limit") as u32,
        uses_count: row.get::<i64, _>("uses_count") as u32,
        expires_at,
        created_by: row.get::<i64, _>("created_by") as u64,
        created_by_name: row.get("created_by_name"),
        created_at,
        active: row.get("active"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::links::{IssueLink, LinkService, MAX_EXPIRY_HOURS};
    use chrono::Duration;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

    async fn memory_store() -> SqliteLinkStore {
        // One connection, otherwise every connection gets its own empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteLinkStore::new(pool);
        store.migrate().await.unwrap();
        store
    }

    fn new_link(code: &str, uses_limit: u32, expires_at: Option<DateTime<Utc>>) -> NewRoleLink {
        NewRoleLink {
            code: code.to_string(),
            guild_id: 1,
            role_id: 1_234_567_890_123_456_789,
            role_name: "Member".to_string(),
            uses_limit,
            expires_at,
            created_by: 99,
            created_by_name: "mod".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let store = memory_store().await;
        store.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_code_is_refused() {
        let store = memory_store().await;
        store.insert_link(new_link("same", 0, None)).await.unwrap();

        let err = store.insert_link(new_link("same", 5, None)).await.unwrap_err();
        assert!(matches!(err, LinkError::DuplicateCode));

        // The original row is untouched.
        let links = store.list_active(1).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].uses_limit, 0);
    }

    #[tokio::test]
    async fn test_guarded_redeem_respects_limit() {
        let store = memory_store().await;
        store.insert_link(new_link("one", 1, None)).await.unwrap();
        let now = Utc::now();

        match store.try_redeem("one", 1, now).await.unwrap() {
            RedeemAttempt::Redeemed(r) => {
                assert_eq!(r.uses_count, 1);
                assert_eq!(r.role_id, 1_234_567_890_123_456_789);
            }
            other => panic!("expected redemption, got {:?}", other),
        }

        match store.try_redeem("one", 1, now).await.unwrap() {
            RedeemAttempt::Rejected(Some(link)) => {
                assert!(link.is_exhausted());
                assert_eq!(link.uses_count, 1);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_guarded_redeem_respects_expiry() {
        let store = memory_store().await;
        let expires_at = Utc::now() + Duration::hours(1);
        store
            .insert_link(new_link("timed", 0, Some(expires_at)))
            .await
            .unwrap();

        assert!(matches!(
            store.try_redeem("timed", 1, expires_at).await.unwrap(),
            RedeemAttempt::Redeemed(_)
        ));
        assert!(matches!(
            store
                .try_redeem("timed", 1, expires_at + Duration::seconds(1))
                .await
                .unwrap(),
            RedeemAttempt::Rejected(Some(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_code_and_other_guild() {
        let store = memory_store().await;
        store.insert_link(new_link("abc", 0, None)).await.unwrap();

        assert!(matches!(
            store.try_redeem("zzz", 1, Utc::now()).await.unwrap(),
            RedeemAttempt::Rejected(None)
        ));
        assert!(matches!(
            store.try_redeem("abc", 2, Utc::now()).await.unwrap(),
            RedeemAttempt::Rejected(None)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_redemptions_never_exceed_limit() {
        let store = Arc::new(memory_store().await);
        store.insert_link(new_link("rush", 3, None)).await.unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.try_redeem("rush", 1, Utc::now()).await })
            })
            .collect();

        let mut redeemed = 0;
        for handle in handles {
            if let RedeemAttempt::Redeemed(_) = handle.await.unwrap().unwrap() {
                redeemed += 1;
            }
        }
        assert_eq!(redeemed, 3);
    }

    #[tokio::test]
    async fn test_issued_expiry_round_trips_through_storage() {
        let service = LinkService::new(memory_store().await);
        let request = |expires_in_hours| IssueLink {
            guild_id: 1,
            role_id: 7,
            role_name: "Member".to_string(),
            actor_id: 99,
            actor_name: "mod".to_string(),
            uses_limit: 0,
            expires_in_hours,
        };

        assert!(matches!(
            service.issue(request(70_000_000)).await,
            Err(LinkError::InvalidInput(_))
        ));
        assert!(matches!(
            service.issue(request(u32::MAX)).await,
            Err(LinkError::InvalidInput(_))
        ));

        // The longest allowed expiry still decodes, so the guild's links stay readable.
        let link = service.issue(request(MAX_EXPIRY_HOURS)).await.unwrap();
        let redemption = service.redeem(&link.code, 1).await.unwrap();
        assert_eq!(redemption.uses_count, 1);

        let links = service.list_active(1).await.unwrap();
        assert_eq!(links.len(), 1);
        // Stored at millisecond precision.
        assert_eq!(
            links[0].expires_at.map(|at| at.timestamp_millis()),
            link.expires_at.map(|at| at.timestamp_millis())
        );
    }

    #[tokio::test]
    async fn test_deactivate_and_listing_order() {
        let store = memory_store().await;
        let mut older = new_link("older", 0, None);
        older.created_at = Utc::now() - Duration::minutes(5);
        store.insert_link(older).await.unwrap();
        store.insert_link(new_link("newer", 0, None)).await.unwrap();

        let codes: Vec<String> = store
            .list_active(1)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.code)
            .collect();
        assert_eq!(codes, vec!["newer".to_string(), "older".to_string()]);

        assert!(store.deactivate("older", 1).await.unwrap());
        assert!(!store.deactivate("older", 1).await.unwrap());
        assert_eq!(store.list_active(1).await.unwrap().len(), 1);

        match store.try_redeem("older", 1, Utc::now()).await.unwrap() {
            RedeemAttempt::Rejected(Some(link)) => assert!(!link.active),
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
