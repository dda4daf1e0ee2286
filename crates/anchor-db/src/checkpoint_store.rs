//! Sync checkpoint persistence.
//!
//! The checkpoint is a single row (`id = 1`) recording the highest block
//! fully processed. The advance is monotonic in SQL via `GREATEST`, so a
//! stale writer can never move the checkpoint backwards.

use sqlx::PgPool;

use crate::error::DbError;

/// The fixed primary key of the single checkpoint row.
const CHECKPOINT_ROW_ID: i32 = 1;

/// Operations on the `indexer_state` table.
pub struct CheckpointStore<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckpointStore<'a> {
    /// Create a new checkpoint store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Read the last fully processed block, or 0 if none is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn read(&self) -> Result<u64, DbError> {
        let last: Option<i64> =
            sqlx::query_scalar(r"SELECT last_block FROM indexer_state WHERE id = $1")
                .bind(CHECKPOINT_ROW_ID)
                .fetch_optional(self.pool)
                .await?;

        Ok(last.and_then(|v| u64::try_from(v).ok()).unwrap_or(0))
    }

    /// Advance the checkpoint to `block` if it is ahead of the stored
    /// value. A lower block leaves the checkpoint untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn advance(&self, block: u64) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO indexer_state (id, last_block)
              VALUES ($1, $2)
              ON CONFLICT (id) DO UPDATE SET
                last_block = GREATEST(indexer_state.last_block, EXCLUDED.last_block)",
        )
        .bind(CHECKPOINT_ROW_ID)
        .bind(i64::try_from(block).unwrap_or(i64::MAX))
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
