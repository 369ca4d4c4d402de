use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use sqlx::SqlitePool;
use std::time::Duration;
use uuid::Uuid;

use super::StoreError;
use crate::models::{ColorRecord, HexCode};

const INSTALL_ID_KEY: &str = "install_id";

/// Outcome of [`ColorRepository::mark_synced`] for a known record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkSynced {
    /// The flag flipped from unsynced to synced.
    Marked,
    /// The record was already synced; nothing was written.
    AlreadySynced,
}

/// Durable store of generated colors.
///
/// Every mutating call has committed by the time it returns, so readers on
/// any connection of the pool see the same state.
#[derive(Debug, Clone)]
pub struct ColorRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ColorRow {
    id: String,
    hex_code: String,
    created_at: String,
    synced: bool,
}

impl TryFrom<ColorRow> for ColorRecord {
    type Error = StoreError;

    fn try_from(row: ColorRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: row.id.clone(),
            reason,
        };

        let id = Uuid::parse_str(&row.id).map_err(|e| corrupt(e.to_string()))?;
        let hex_code: HexCode = row.hex_code.parse().map_err(|e| corrupt(format!("{e}")))?;
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(ColorRecord {
            id,
            hex_code,
            created_at,
            synced: row.synced,
        })
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    // Fixed width so lexical order in SQLite matches time order.
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn collect(rows: Vec<ColorRow>) -> Result<Vec<ColorRecord>, StoreError> {
    rows.into_iter().map(ColorRecord::try_from).collect()
}

impl ColorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Persist a new unsynced color and return it as stored.
    pub async fn create(&self, hex_code: HexCode) -> Result<ColorRecord, StoreError> {
        let record = ColorRecord::new(hex_code);

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO colors (id, hex_code, created_at, synced) VALUES (?, ?, ?, 0)")
            .bind(record.id.to_string())
            .bind(record.hex_code.as_str())
            .bind(format_timestamp(&record.created_at))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::debug!(id = %record.id, hex = %record.hex_code, "stored color");

        // `created_at` already has the precision the row keeps.
        Ok(record)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<ColorRecord>, StoreError> {
        let row: Option<ColorRow> = sqlx::query_as(
            "SELECT id, hex_code, created_at, synced FROM colors WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ColorRecord::try_from).transpose()
    }

    /// All colors, newest first.
    pub async fn list_all(&self) -> Result<Vec<ColorRecord>, StoreError> {
        let rows: Vec<ColorRow> = sqlx::query_as(
            "SELECT id, hex_code, created_at, synced FROM colors ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        collect(rows)
    }

    /// Colors not yet accepted by the remote store, oldest first.
    pub async fn list_unsynced(&self) -> Result<Vec<ColorRecord>, StoreError> {
        let rows: Vec<ColorRow> = sqlx::query_as(
            "SELECT id, hex_code, created_at, synced FROM colors WHERE synced = 0 ORDER BY created_at, rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        collect(rows)
    }

    pub async fn count_unsynced(&self) -> Result<usize, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM colors WHERE synced = 0")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }

    /// Flag a color as synced. Calling it again for the same id is a no-op.
    ///
    /// Returns [`StoreError::NotFound`] when no color has this id.
    pub async fn mark_synced(&self, id: Uuid) -> Result<MarkSynced, StoreError> {
        let id_str = id.to_string();

        let result = sqlx::query(
            "UPDATE colors SET synced = 1, claim_token = NULL, claimed_at = NULL \
             WHERE id = ? AND synced = 0",
        )
            .bind(&id_str)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            return Ok(MarkSynced::Marked);
        }

        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM colors WHERE id = ?")
            .bind(&id_str)
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(_) => Ok(MarkSynced::AlreadySynced),
            None => Err(StoreError::NotFound(id)),
        }
    }

    /// Take the right to push an unsynced color.
    ///
    /// Returns `false` when the color is already synced, unknown, or held by
    /// another claim younger than `lease`. Claims are shared by every
    /// connection to the database, including other processes.
    pub async fn claim(
        &self,
        id: Uuid,
        token: &str,
        lease: Duration,
    ) -> Result<bool, StoreError> {
        let now = Utc::now();
        let stale_before = TimeDelta::from_std(lease)
            .ok()
            .and_then(|lease| now.checked_sub_signed(lease))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let result = sqlx::query(
            "UPDATE colors SET claim_token = ?, claimed_at = ? \
             WHERE id = ? AND synced = 0 AND (claim_token IS NULL OR claimed_at < ?)",
        )
        .bind(token)
        .bind(format_timestamp(&now))
        .bind(id.to_string())
        .bind(format_timestamp(&stale_before))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Give up a claim taken with `token`. Does nothing if it was taken over.
    pub async fn release(&self, id: Uuid, token: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE colors SET claim_token = NULL, claimed_at = NULL \
             WHERE id = ? AND claim_token = ?",
        )
        .bind(id.to_string())
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Identifier for this installation, generated on first use and kept
    /// in the database from then on.
    pub async fn install_id(&self) -> Result<String, StoreError> {
        sqlx::query("INSERT OR IGNORE INTO meta (key, value) VALUES (?, ?)")
            .bind(INSTALL_ID_KEY)
            .bind(Uuid::new_v4().to_string())
            .execute(&self.pool)
            .await?;

        let (value,): (String,) = sqlx::query_as("SELECT value FROM meta WHERE key = ?")
            .bind(INSTALL_ID_KEY)
            .fetch_one(&self.pool)
            .await?;

        Ok(value)
    }
}
