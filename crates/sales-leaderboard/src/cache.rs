//! SQLite storage for rate snapshots and the signed-in identity
//!
//! Rate snapshots are a cache: the newest one is reused while it is fresh and
//! kept as a last resort when the rate API is down. The identity row is
//! persistent state that survives between runs until `logout`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use leaderboard_core::ExchangeRateTable;
use sqlx::{FromRow, SqlitePool};
use std::path::Path;

use crate::identity::Identity;

/// Cache database wrapper
pub struct Cache {
    pool: SqlitePool,
}

/// A stored rate table and when it was fetched
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub rates: ExchangeRateTable,
    pub fetched_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct RateSnapshotRow {
    payload: String,
    fetched_at: String,
}

#[derive(FromRow)]
struct IdentityRow {
    user_id: String,
    name: String,
    office_id: Option<String>,
    office_name: String,
    is_guest: bool,
}

impl Cache {
    /// Open or create cache database
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // SQLx requires the file to exist for SQLite
        if !path.exists() {
            std::fs::File::create(path)?;
        }

        let url = format!("sqlite:{}", path.display());
        let pool = SqlitePool::connect(&url)
            .await
            .context("Failed to open cache database")?;

        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout=5000").execute(&pool).await?;

        let cache = Self { pool };
        cache.init_schema().await?;

        Ok(cache)
    }

    /// In-memory database; a single connection so every query sees the same data
    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let cache = Self { pool };
        cache.init_schema().await?;
        Ok(cache)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "
            -- Exchange-rate tables as returned by the rate API
            CREATE TABLE IF NOT EXISTS rate_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                payload TEXT NOT NULL,
                fetched_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "
            -- Signed-in manager (at most one row)
            CREATE TABLE IF NOT EXISTS identity (
                slot INTEGER PRIMARY KEY CHECK (slot = 1),
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                office_id TEXT,
                office_name TEXT NOT NULL,
                is_guest INTEGER NOT NULL,
                saved_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Exchange Rates
    // =========================================================================

    /// Most recently fetched rate table
    pub async fn latest_rates(&self) -> Result<Option<RateSnapshot>> {
        let row: Option<RateSnapshotRow> = sqlx::query_as(
            "SELECT payload, fetched_at FROM rate_snapshots ORDER BY fetched_at DESC, id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let rates: ExchangeRateTable =
            serde_json::from_str(&row.payload).context("Corrupt rate snapshot in cache")?;
        let fetched_at = DateTime::parse_from_rfc3339(&row.fetched_at)
            .context("Corrupt rate snapshot timestamp in cache")?
            .with_timezone(&Utc);

        Ok(Some(RateSnapshot { rates, fetched_at }))
    }

    /// Store a snapshot and drop older ones
    pub async fn store_rates(&self, snapshot: &RateSnapshot) -> Result<()> {
        let payload = serde_json::to_string(&snapshot.rates)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM rate_snapshots")
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO rate_snapshots (payload, fetched_at) VALUES (?, ?)")
            .bind(payload)
            .bind(snapshot.fetched_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub async fn get_identity(&self) -> Result<Option<Identity>> {
        let row: Option<IdentityRow> = sqlx::query_as(
            "SELECT user_id, name, office_id, office_name, is_guest FROM identity WHERE slot = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Identity {
            user_id: r.user_id,
            name: r.name,
            office_id: r.office_id,
            office_name: r.office_name,
            is_guest: r.is_guest,
        }))
    }

    pub async fn save_identity(&self, identity: &Identity) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO identity (slot, user_id, name, office_id, office_name, is_guest)
             VALUES (1, ?, ?, ?, ?, ?)",
        )
        .bind(&identity.user_id)
        .bind(&identity.name)
        .bind(&identity.office_id)
        .bind(&identity.office_name)
        .bind(identity.is_guest)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Forget the signed-in identity. Returns false if nobody was signed in.
    pub async fn clear_identity(&self) -> Result<bool> {
        let result = sqlx::query("DELETE FROM identity").execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use leaderboard_core::RateValue;

    fn snapshot(eur: f64, hour: u32) -> RateSnapshot {
        let mut rates = ExchangeRateTable::new();
        rates.insert("EUR", RateValue::Plain(eur));
        RateSnapshot {
            rates,
            fetched_at: Utc.with_ymd_and_hms(2025, 3, 17, hour, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_rates_round_trip_and_replace() {
        let cache = Cache::open_in_memory().await.unwrap();
        assert!(cache.latest_rates().await.unwrap().is_none());

        cache.store_rates(&snapshot(0.9, 10)).await.unwrap();
        cache.store_rates(&snapshot(0.95, 11)).await.unwrap();

        let latest = cache.latest_rates().await.unwrap().unwrap();
        assert_eq!(latest, snapshot(0.95, 11));
    }

    #[tokio::test]
    async fn test_identity_save_load_clear() {
        let cache = Cache::open_in_memory().await.unwrap();
        assert!(cache.get_identity().await.unwrap().is_none());
        assert!(!cache.clear_identity().await.unwrap());

        let identity = Identity {
            user_id: "u1".to_string(),
            name: "Aziz".to_string(),
            office_id: Some("off1".to_string()),
            office_name: "Bishkek".to_string(),
            is_guest: false,
        };
        cache.save_identity(&identity).await.unwrap();
        assert_eq!(cache.get_identity().await.unwrap(), Some(identity.clone()));

        let guest = Identity::guest("newbie", 1_741_000_000_000);
        cache.save_identity(&guest).await.unwrap();
        assert_eq!(cache.get_identity().await.unwrap(), Some(guest));

        assert!(cache.clear_identity().await.unwrap());
        assert!(cache.get_identity().await.unwrap().is_none());
    }
}
