//! Reputation snapshot persistence.
//!
//! Snapshots are append-only: every recalculation inserts a new row, and
//! reads pick the most recent row per identity. History is therefore free
//! and a bad calculation never destroys the previous one.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use anchor_types::IdentityId;

use crate::error::DbError;

/// Operations on the `reputation_snapshots` table.
pub struct SnapshotStore<'a> {
    pool: &'a PgPool,
}

impl<'a> SnapshotStore<'a> {
    /// Create a new snapshot store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append a snapshot for one identity.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert(
        &self,
        identity_id: IdentityId,
        score: i32,
        components: &serde_json::Value,
        block_number: u64,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO reputation_snapshots (identity_id, score, components, block_number)
              VALUES ($1, $2, $3, $4)",
        )
        .bind(identity_id.as_db())
        .bind(score)
        .bind(components)
        .bind(i64::try_from(block_number).unwrap_or(i64::MAX))
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Fetch the most recent snapshot for one identity, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn latest(&self, identity_id: IdentityId) -> Result<Option<SnapshotRow>, DbError> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            r"SELECT id, identity_id, score, components, calculated_at, block_number
              FROM reputation_snapshots
              WHERE identity_id = $1
              ORDER BY calculated_at DESC, id DESC
              LIMIT 1",
        )
        .bind(identity_id.as_db())
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Fetch up to `limit` snapshots for one identity, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn history(
        &self,
        identity_id: IdentityId,
        limit: i64,
    ) -> Result<Vec<SnapshotRow>, DbError> {
        let rows = sqlx::query_as::<_, SnapshotRow>(
            r"SELECT id, identity_id, score, components, calculated_at, block_number
              FROM reputation_snapshots
              WHERE identity_id = $1
              ORDER BY calculated_at DESC, id DESC
              LIMIT $2",
        )
        .bind(identity_id.as_db())
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Fetch the latest snapshot per identity for every known identity.
    ///
    /// Identities that have never been scored come back with a `NULL`
    /// score; the leaderboard assigns them the neutral default.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn latest_for_all(&self) -> Result<Vec<LeaderboardSourceRow>, DbError> {
        let rows = sqlx::query_as::<_, LeaderboardSourceRow>(
            r"SELECT i.id AS identity_id, s.score, s.calculated_at
              FROM identities i
              LEFT JOIN LATERAL (
                  SELECT score, calculated_at
                  FROM reputation_snapshots
                  WHERE identity_id = i.id
                  ORDER BY calculated_at DESC, id DESC
                  LIMIT 1
              ) s ON TRUE
              ORDER BY i.id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

/// A row from the `reputation_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    /// Auto-incremented row id.
    pub id: i64,
    /// Identity the snapshot scores.
    pub identity_id: i64,
    /// Composite score, 0 to 100.
    pub score: i32,
    /// Component breakdown.
    pub components: serde_json::Value,
    /// When the snapshot was computed.
    pub calculated_at: DateTime<Utc>,
    /// Checkpoint block the snapshot reflects.
    pub block_number: i64,
}

/// One identity's latest score, or `NULL` if never scored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeaderboardSourceRow {
    /// Identity id.
    pub identity_id: i64,
    /// Latest snapshot score, if any.
    pub score: Option<i32>,
    /// When the latest snapshot was computed, if any.
    pub calculated_at: Option<DateTime<Utc>>,
}
