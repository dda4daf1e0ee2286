//! Agreement audit-event persistence.
//!
//! Agreement events are the append-only trail the reputation engine
//! replays; they are never updated or deleted. The append is
//! insert-if-absent on the natural dedup key `(tx_hash, log_index)`, so
//! at-least-once redelivery of a ledger log cannot duplicate a row.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use anchor_types::{AgreementEventKind, AgreementId, IdentityId, Provenance};

use crate::error::DbError;

/// Operations on the `agreement_events` table.
pub struct EventStore<'a> {
    pool: &'a PgPool,
}

impl<'a> EventStore<'a> {
    /// Create a new event store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append one audit record inside the caller's transaction.
    ///
    /// Returns `true` if a row was inserted, `false` if the
    /// `(tx_hash, log_index)` pair was already recorded (redelivery).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn append(
        conn: &mut PgConnection,
        agreement_id: AgreementId,
        kind: AgreementEventKind,
        details: &serde_json::Value,
        occurred_at: DateTime<Utc>,
        provenance: &Provenance,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            r"INSERT INTO agreement_events
              (agreement_id, kind, details, occurred_at, block_number, tx_hash, log_index)
              VALUES ($1, $2, $3, $4, $5, $6, $7)
              ON CONFLICT (tx_hash, log_index) DO NOTHING",
        )
        .bind(agreement_id.as_db())
        .bind(kind.as_db())
        .bind(details)
        .bind(occurred_at)
        .bind(i64::try_from(provenance.block_number).unwrap_or(i64::MAX))
        .bind(provenance.tx_hash.to_hex())
        .bind(i64::try_from(provenance.log_index).unwrap_or(i64::MAX))
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Fetch every event whose parent agreement involves the identity as
    /// proposer or acceptor, ordered by timestamp ascending.
    ///
    /// The parent agreement's role columns are joined in because the
    /// reputation replay needs them to attribute completions and dispute
    /// outcomes.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn events_for_identity(
        &self,
        identity_id: IdentityId,
    ) -> Result<Vec<AgreementEventRow>, DbError> {
        let rows = sqlx::query_as::<_, AgreementEventRow>(
            r"SELECT e.id, e.agreement_id, e.kind, e.details, e.occurred_at,
                     e.block_number, e.tx_hash, e.log_index,
                     a.proposer_id, a.acceptor_id
              FROM agreement_events e
              JOIN agreements a ON a.id = e.agreement_id
              WHERE a.proposer_id = $1 OR a.acceptor_id = $1
              ORDER BY e.occurred_at, e.id",
        )
        .bind(identity_id.as_db())
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Fetch the full event trail of one agreement, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn events_for_agreement(
        &self,
        agreement_id: AgreementId,
    ) -> Result<Vec<AgreementEventRow>, DbError> {
        let rows = sqlx::query_as::<_, AgreementEventRow>(
            r"SELECT e.id, e.agreement_id, e.kind, e.details, e.occurred_at,
                     e.block_number, e.tx_hash, e.log_index,
                     a.proposer_id, a.acceptor_id
              FROM agreement_events e
              JOIN agreements a ON a.id = e.agreement_id
              WHERE e.agreement_id = $1
              ORDER BY e.occurred_at, e.id",
        )
        .bind(agreement_id.as_db())
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

/// A row from the `agreement_events` table joined with its agreement's
/// role columns.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AgreementEventRow {
    /// Auto-incremented row id.
    pub id: i64,
    /// Agreement the event belongs to.
    pub agreement_id: i64,
    /// Event kind string.
    pub kind: String,
    /// Kind-specific payload.
    pub details: serde_json::Value,
    /// On-chain timestamp of the event.
    pub occurred_at: DateTime<Utc>,
    /// Block the event was emitted in.
    pub block_number: i64,
    /// Transaction that emitted the event.
    pub tx_hash: String,
    /// Position of the log within its block.
    pub log_index: i64,
    /// Proposer of the parent agreement.
    pub proposer_id: i64,
    /// Acceptor of the parent agreement, if any.
    pub acceptor_id: Option<i64>,
}
