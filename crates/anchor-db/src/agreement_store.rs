//! Agreement persistence.
//!
//! Mutations that must be atomic with an audit-record append take a
//! `&mut PgConnection` so the processor can run them inside one
//! transaction; reads go through the pool. The acceptor column is set at
//! most once, enforced by a guarded UPDATE.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use anchor_types::{
    AgreementId, AgreementStatus, Amount, Hash32, IdentityId, Provenance,
};

use crate::error::DbError;

/// Operations on the `agreements` table.
pub struct AgreementStore<'a> {
    pool: &'a PgPool,
}

impl<'a> AgreementStore<'a> {
    /// Create a new agreement store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch one agreement by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, id: AgreementId) -> Result<Option<AgreementRow>, DbError> {
        let row = sqlx::query_as::<_, AgreementRow>(
            r"SELECT id, proposer_id, acceptor_id, terms_hash, proposer_deposit,
                     acceptor_deposit, deadline, status, created_at, block_number, tx_hash
              FROM agreements
              WHERE id = $1",
        )
        .bind(id.as_db())
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Read an agreement's current status inside a transaction, locking
    /// the row until the transaction settles.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::CorruptRow`] if the stored status string is unknown.
    pub async fn status_for_update(
        conn: &mut PgConnection,
        id: AgreementId,
    ) -> Result<Option<AgreementStatus>, DbError> {
        let status: Option<String> =
            sqlx::query_scalar(r"SELECT status FROM agreements WHERE id = $1 FOR UPDATE")
                .bind(id.as_db())
                .fetch_optional(&mut *conn)
                .await?;

        match status {
            None => Ok(None),
            Some(s) => AgreementStatus::from_db(&s)
                .map(Some)
                .ok_or_else(|| DbError::CorruptRow(format!("unknown agreement status: {s}"))),
        }
    }

    /// Insert an agreement with status `PROPOSED` if it does not already
    /// exist.
    ///
    /// Both deposit columns are initialized to the required deposit; the
    /// acceptor's actual deposit overwrites it on acceptance. Returns
    /// `true` if a row was created.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_if_absent(
        conn: &mut PgConnection,
        id: AgreementId,
        proposer_id: IdentityId,
        terms_hash: Hash32,
        required_deposit: Amount,
        deadline: DateTime<Utc>,
        created_at: DateTime<Utc>,
        provenance: &Provenance,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"INSERT INTO agreements
              (id, proposer_id, terms_hash, proposer_deposit, acceptor_deposit,
               deadline, status, created_at, block_number, tx_hash)
              VALUES ($1, $2, $3, $4, $4, $5, $6, $7, $8, $9)
              ON CONFLICT (id) DO NOTHING",
        )
        .bind(id.as_db())
        .bind(proposer_id.as_db())
        .bind(terms_hash.to_hex())
        .bind(required_deposit.to_hex())
        .bind(deadline)
        .bind(AgreementStatus::Proposed.as_db())
        .bind(created_at)
        .bind(i64::try_from(provenance.block_number).unwrap_or(i64::MAX))
        .bind(provenance.tx_hash.to_hex())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Record an acceptance: set the acceptor, its deposit, and advance
    /// the status to `ACTIVE`, in one guarded UPDATE.
    ///
    /// The guard `acceptor_id IS NULL` makes the acceptor writable at
    /// most once. Returns `true` if the row was updated.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn accept(
        conn: &mut PgConnection,
        id: AgreementId,
        acceptor_id: IdentityId,
        deposit: Amount,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"UPDATE agreements
              SET acceptor_id = $2, acceptor_deposit = $3, status = $4
              WHERE id = $1 AND acceptor_id IS NULL",
        )
        .bind(id.as_db())
        .bind(acceptor_id.as_db())
        .bind(deposit.to_hex())
        .bind(AgreementStatus::Active.as_db())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Set an agreement's status.
    ///
    /// Returns `true` if the row existed. The caller is responsible for
    /// having validated the transition against the state machine.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the update fails.
    pub async fn set_status(
        conn: &mut PgConnection,
        id: AgreementId,
        status: AgreementStatus,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(r"UPDATE agreements SET status = $2 WHERE id = $1")
            .bind(id.as_db())
            .bind(status.as_db())
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// A row from the `agreements` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AgreementRow {
    /// Ledger-assigned agreement id.
    pub id: i64,
    /// Identity that proposed the agreement.
    pub proposer_id: i64,
    /// Identity that accepted, if any.
    pub acceptor_id: Option<i64>,
    /// Terms commitment, hex.
    pub terms_hash: String,
    /// Proposer's deposit, hex amount.
    pub proposer_deposit: String,
    /// Acceptor's deposit, hex amount.
    pub acceptor_deposit: String,
    /// Fulfillment deadline.
    pub deadline: DateTime<Utc>,
    /// Lifecycle status string.
    pub status: String,
    /// On-chain creation time.
    pub created_at: DateTime<Utc>,
    /// Block of the proposal event.
    pub block_number: i64,
    /// Transaction of the proposal event.
    pub tx_hash: String,
}
