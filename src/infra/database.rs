// Shared SQLite plumbing: opening the pool and the timestamp format every
// table uses.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// Open (creating if needed) the bot's SQLite database.
pub async fn open_pool(database_path: &str) -> anyhow::Result<SqlitePool> {
    if !database_path.contains(":memory:") {
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let conn_str = if database_path.starts_with("sqlite:") {
        database_path.to_string()
    } else {
        format!("sqlite://{}?mode=rwc", database_path)
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&conn_str)
        .await?;

    tracing::info!("Opened database at {}", database_path);
    Ok(pool)
}

/// Fixed-width UTC timestamps (`2026-01-01T00:00:00.000Z`) so that string
/// comparison in SQL matches chronological order.
pub fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decode_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
