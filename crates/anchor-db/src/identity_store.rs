//! Identity and trait persistence.
//!
//! Identities are created only by ledger creation events and never
//! deleted. Creation is insert-if-absent keyed by the ledger-assigned id,
//! so redelivery of the same event is a no-op rather than an error.
//! Traits are independently upsertable by `(identity_id, key)`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use anchor_types::{Address, Hash32, IdentityId, Provenance};

use crate::error::DbError;

/// Operations on the `identities` and `traits` tables.
pub struct IdentityStore<'a> {
    pool: &'a PgPool,
}

impl<'a> IdentityStore<'a> {
    /// Create a new identity store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an identity if it does not already exist.
    ///
    /// Returns `true` if a row was created, `false` if the identity was
    /// already present (ledger redelivery).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn create_if_absent(
        &self,
        id: IdentityId,
        owner: Address,
        name_hash: Hash32,
        created_at: DateTime<Utc>,
        provenance: &Provenance,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"INSERT INTO identities (id, owner, name_hash, created_at, block_number, tx_hash)
              VALUES ($1, $2, $3, $4, $5, $6)
              ON CONFLICT (id) DO NOTHING",
        )
        .bind(id.as_db())
        .bind(owner.to_hex())
        .bind(name_hash.to_hex())
        .bind(created_at)
        .bind(i64::try_from(provenance.block_number).unwrap_or(i64::MAX))
        .bind(provenance.tx_hash.to_hex())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Upsert a trait by `(identity_id, key)`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the upsert fails.
    pub async fn upsert_trait(
        &self,
        id: IdentityId,
        key: Hash32,
        value: Hash32,
        set_at: DateTime<Utc>,
        provenance: &Provenance,
    ) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO traits (identity_id, key, value, set_at, block_number, tx_hash)
              VALUES ($1, $2, $3, $4, $5, $6)
              ON CONFLICT (identity_id, key) DO UPDATE SET
                value = EXCLUDED.value,
                set_at = EXCLUDED.set_at,
                block_number = EXCLUDED.block_number,
                tx_hash = EXCLUDED.tx_hash",
        )
        .bind(id.as_db())
        .bind(key.to_hex())
        .bind(value.to_hex())
        .bind(set_at)
        .bind(i64::try_from(provenance.block_number).unwrap_or(i64::MAX))
        .bind(provenance.tx_hash.to_hex())
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Fetch one identity by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, id: IdentityId) -> Result<Option<IdentityRow>, DbError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r"SELECT id, owner, name_hash, created_at, block_number, tx_hash
              FROM identities
              WHERE id = $1",
        )
        .bind(id.as_db())
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// List all identities, ordered by id ascending.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self) -> Result<Vec<IdentityRow>, DbError> {
        let rows = sqlx::query_as::<_, IdentityRow>(
            r"SELECT id, owner, name_hash, created_at, block_number, tx_hash
              FROM identities
              ORDER BY id",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Fetch all traits of one identity, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn traits_for(&self, id: IdentityId) -> Result<Vec<TraitRow>, DbError> {
        let rows = sqlx::query_as::<_, TraitRow>(
            r"SELECT identity_id, key, value, set_at, block_number, tx_hash
              FROM traits
              WHERE identity_id = $1
              ORDER BY key",
        )
        .bind(id.as_db())
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

/// A row from the `identities` table.
///
/// Uses runtime types rather than compile-time checked types to avoid
/// requiring a live database during builds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IdentityRow {
    /// Ledger-assigned identity id.
    pub id: i64,
    /// Owning address, lowercase hex.
    pub owner: String,
    /// Name commitment, hex.
    pub name_hash: String,
    /// On-chain creation time.
    pub created_at: DateTime<Utc>,
    /// Block the creation event was emitted in.
    pub block_number: i64,
    /// Transaction that created the identity.
    pub tx_hash: String,
}

/// A row from the `traits` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TraitRow {
    /// Identity the trait belongs to.
    pub identity_id: i64,
    /// Trait key, hex.
    pub key: String,
    /// Trait value, hex.
    pub value: String,
    /// On-chain time of the last write.
    pub set_at: DateTime<Utc>,
    /// Block of the last write.
    pub block_number: i64,
    /// Transaction of the last write.
    pub tx_hash: String,
}
