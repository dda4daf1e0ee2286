//! Event processors: one idempotent handler per decoded event kind.
//!
//! Every handler that touches an agreement runs its entity mutation and
//! its audit-record append inside a single transaction, so a crash or a
//! rejected lifecycle transition leaves no half-applied entry behind.
//! Re-applying any event is safe: creations are insert-if-absent, the
//! acceptor column is guarded, and appends dedup on the log's
//! `(tx_hash, log_index)`.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use anchor_codec::{DecodeError, Sources, decode};
use anchor_db::{AgreementStore, DbError, EventStore, IdentityStore};
use anchor_types::{
    AcceptedDetails, Address, AgreementEventKind, AgreementId, AgreementStatus, Amount,
    BreachedDetails, CompletedDetails, DecodedLog, DepositWithdrawnDetails, DisputeRaisedDetails,
    DisputeResolvedDetails, Hash32, IdentityId, LedgerEvent, ProposedDetails, Provenance, RawLog,
    TransitionRejection,
};

use crate::sync::{LogProcessor, Outcome};

/// Errors raised while applying one decoded entry. All of these are
/// per-entry: the synchronizer logs them with the transaction reference
/// and moves on to the next entry.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The entry could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A data-layer operation failed.
    #[error("data layer error: {0}")]
    Db(#[from] DbError),

    /// The event is not a legal lifecycle transition for the agreement's
    /// current status. The whole entry is rolled back.
    #[error("rejected transition: {0}")]
    Transition(#[from] TransitionRejection),

    /// The event references an agreement that was never created.
    #[error("unknown agreement {agreement_id}")]
    UnknownAgreement {
        /// The missing agreement.
        agreement_id: AgreementId,
    },

    /// An audit payload failed to serialize.
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Applies decoded ledger events to the database.
#[derive(Clone)]
pub struct Processors {
    pool: PgPool,
}

impl Processors {
    /// Create processors writing through the given pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply one decoded entry. Idempotent under redelivery.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] if the entry cannot be applied; nothing
    /// is persisted in that case.
    pub async fn apply(&self, decoded: &DecodedLog) -> Result<(), ProcessError> {
        let provenance = &decoded.provenance;
        match &decoded.event {
            LedgerEvent::IdentityCreated {
                identity_id,
                owner,
                name_hash,
                timestamp,
            } => {
                self.identity_created(*identity_id, *owner, *name_hash, *timestamp, provenance)
                    .await
            }
            LedgerEvent::TraitSet {
                identity_id,
                trait_key,
                trait_value,
                timestamp,
            } => {
                IdentityStore::new(&self.pool)
                    .upsert_trait(*identity_id, *trait_key, *trait_value, *timestamp, provenance)
                    .await?;
                Ok(())
            }
            LedgerEvent::AgreementProposed {
                agreement_id,
                proposer_id,
                terms_hash,
                required_deposit,
                deadline,
                timestamp,
            } => {
                self.agreement_proposed(
                    *agreement_id,
                    *proposer_id,
                    *terms_hash,
                    *required_deposit,
                    *deadline,
                    *timestamp,
                    provenance,
                )
                .await
            }
            LedgerEvent::AgreementAccepted {
                agreement_id,
                acceptor_id,
                deposit,
                timestamp,
            } => {
                self.agreement_accepted(*agreement_id, *acceptor_id, *deposit, *timestamp, provenance)
                    .await
            }
            LedgerEvent::AgreementCompleted {
                agreement_id,
                completed_by,
                timestamp,
            } => {
                let details = serde_json::to_value(CompletedDetails {
                    completed_by: *completed_by,
                })?;
                self.lifecycle_event(
                    *agreement_id,
                    AgreementEventKind::Completed,
                    &details,
                    *timestamp,
                    provenance,
                )
                .await
            }
            LedgerEvent::AgreementBreached {
                agreement_id,
                breached_by,
                timestamp,
            } => {
                let details = serde_json::to_value(BreachedDetails {
                    breached_by: *breached_by,
                })?;
                self.lifecycle_event(
                    *agreement_id,
                    AgreementEventKind::Breached,
                    &details,
                    *timestamp,
                    provenance,
                )
                .await
            }
            LedgerEvent::DisputeRaised {
                agreement_id,
                raised_by,
                reason_hash,
                timestamp,
            } => {
                let details = serde_json::to_value(DisputeRaisedDetails {
                    raised_by: *raised_by,
                    reason_hash: *reason_hash,
                })?;
                self.lifecycle_event(
                    *agreement_id,
                    AgreementEventKind::DisputeRaised,
                    &details,
                    *timestamp,
                    provenance,
                )
                .await
            }
            LedgerEvent::DisputeResolved {
                agreement_id,
                resolver,
                proposer_favored,
                timestamp,
            } => {
                let details = serde_json::to_value(DisputeResolvedDetails {
                    resolver: *resolver,
                    proposer_favored: *proposer_favored,
                })?;
                self.lifecycle_event(
                    *agreement_id,
                    AgreementEventKind::DisputeResolved,
                    &details,
                    *timestamp,
                    provenance,
                )
                .await
            }
            LedgerEvent::DepositWithdrawn {
                agreement_id,
                identity_id,
                amount,
                timestamp,
            } => {
                self.deposit_withdrawn(*agreement_id, *identity_id, *amount, *timestamp, provenance)
                    .await
            }
        }
    }

    async fn identity_created(
        &self,
        identity_id: IdentityId,
        owner: Address,
        name_hash: Hash32,
        timestamp: DateTime<Utc>,
        provenance: &Provenance,
    ) -> Result<(), ProcessError> {
        let created = IdentityStore::new(&self.pool)
            .create_if_absent(identity_id, owner, name_hash, timestamp, provenance)
            .await?;
        if !created {
            tracing::debug!(%identity_id, "identity already indexed, skipping");
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn agreement_proposed(
        &self,
        agreement_id: AgreementId,
        proposer_id: IdentityId,
        terms_hash: Hash32,
        required_deposit: Amount,
        deadline: DateTime<Utc>,
        timestamp: DateTime<Utc>,
        provenance: &Provenance,
    ) -> Result<(), ProcessError> {
        let details = serde_json::to_value(ProposedDetails {
            proposer_id,
            terms_hash,
            required_deposit,
            deadline,
        })?;

        let mut tx = self.begin().await?;
        let created = AgreementStore::insert_if_absent(
            &mut tx,
            agreement_id,
            proposer_id,
            terms_hash,
            required_deposit,
            deadline,
            timestamp,
            provenance,
        )
        .await?;
        if !created {
            tracing::debug!(%agreement_id, "agreement already indexed, skipping");
        }
        EventStore::append(
            &mut tx,
            agreement_id,
            AgreementEventKind::Proposed,
            &details,
            timestamp,
            provenance,
        )
        .await?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    async fn agreement_accepted(
        &self,
        agreement_id: AgreementId,
        acceptor_id: IdentityId,
        deposit: Amount,
        timestamp: DateTime<Utc>,
        provenance: &Provenance,
    ) -> Result<(), ProcessError> {
        let details = serde_json::to_value(AcceptedDetails {
            acceptor_id,
            deposit_amount: deposit,
        })?;

        let mut tx = self.begin().await?;
        let status = Self::current_status(&mut tx, agreement_id).await?;
        status.transition(AgreementEventKind::Accepted)?;

        let updated = AgreementStore::accept(&mut tx, agreement_id, acceptor_id, deposit).await?;
        if !updated {
            // Acceptor already set by an earlier delivery; the append
            // below dedups on (tx_hash, log_index) so redelivery is safe.
            tracing::debug!(%agreement_id, "acceptor already set, skipping update");
        }
        EventStore::append(
            &mut tx,
            agreement_id,
            AgreementEventKind::Accepted,
            &details,
            timestamp,
            provenance,
        )
        .await?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    /// Shared path for the four pure lifecycle events: validate the
    /// transition, set the new status, append the audit record.
    async fn lifecycle_event(
        &self,
        agreement_id: AgreementId,
        kind: AgreementEventKind,
        details: &serde_json::Value,
        timestamp: DateTime<Utc>,
        provenance: &Provenance,
    ) -> Result<(), ProcessError> {
        let mut tx = self.begin().await?;
        let status = Self::current_status(&mut tx, agreement_id).await?;
        let next = status.transition(kind)?;

        AgreementStore::set_status(&mut tx, agreement_id, next).await?;
        EventStore::append(&mut tx, agreement_id, kind, details, timestamp, provenance).await?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    async fn deposit_withdrawn(
        &self,
        agreement_id: AgreementId,
        identity_id: IdentityId,
        amount: Amount,
        timestamp: DateTime<Utc>,
        provenance: &Provenance,
    ) -> Result<(), ProcessError> {
        let details = serde_json::to_value(DepositWithdrawnDetails {
            identity_id,
            amount,
        })?;

        // No entity effect and no lifecycle check, but the agreement must
        // exist for the audit record to attach to.
        let mut tx = self.begin().await?;
        Self::current_status(&mut tx, agreement_id).await?;
        EventStore::append(
            &mut tx,
            agreement_id,
            AgreementEventKind::DepositWithdrawn,
            &details,
            timestamp,
            provenance,
        )
        .await?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>, ProcessError> {
        Ok(self.pool.begin().await.map_err(DbError::from)?)
    }

    async fn current_status(
        tx: &mut Transaction<'_, Postgres>,
        agreement_id: AgreementId,
    ) -> Result<AgreementStatus, ProcessError> {
        AgreementStore::status_for_update(tx, agreement_id)
            .await?
            .ok_or(ProcessError::UnknownAgreement { agreement_id })
    }
}

/// Production log processor: codec dispatch followed by the per-kind
/// handlers.
#[derive(Clone)]
pub struct Pipeline {
    sources: Sources,
    processors: Processors,
}

impl Pipeline {
    /// Create a pipeline decoding for the given sources.
    pub const fn new(sources: Sources, processors: Processors) -> Self {
        Self {
            sources,
            processors,
        }
    }
}

impl LogProcessor for Pipeline {
    async fn process(&self, raw: &RawLog) -> Result<Outcome, ProcessError> {
        match decode(raw, &self.sources)? {
            Some(decoded) => {
                self.processors.apply(&decoded).await?;
                tracing::debug!(
                    kind = decoded.event.kind_name(),
                    block = decoded.provenance.block_number,
                    "entry applied"
                );
                Ok(Outcome::Applied)
            }
            None => Ok(Outcome::Irrelevant),
        }
    }
}
