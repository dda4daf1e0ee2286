//! Kind-specific payloads for agreement audit records.
//!
//! Every agreement event row carries a structured payload in its JSONB
//! `details` column. These structs define the payload per kind; the
//! reputation engine deserializes them back when replaying history
//! (`BreachedDetails::breached_by` and
//! `DisputeResolvedDetails::proposer_favored` are load-bearing there).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::IdentityId;
use crate::scalars::{Amount, Hash32};

/// Payload of a `PROPOSED` audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedDetails {
    /// Identity proposing the agreement.
    pub proposer_id: IdentityId,
    /// Commitment to the agreement terms.
    pub terms_hash: Hash32,
    /// Deposit both parties must commit.
    pub required_deposit: Amount,
    /// Deadline for fulfillment.
    pub deadline: DateTime<Utc>,
}

/// Payload of an `ACCEPTED` audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedDetails {
    /// Identity accepting the agreement.
    pub acceptor_id: IdentityId,
    /// Deposit the acceptor committed.
    pub deposit_amount: Amount,
}

/// Payload of a `COMPLETED` audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedDetails {
    /// Identity that marked completion.
    pub completed_by: IdentityId,
}

/// Payload of a `BREACHED` audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreachedDetails {
    /// The breaching party.
    pub breached_by: IdentityId,
}

/// Payload of a `DISPUTE_RAISED` audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeRaisedDetails {
    /// Identity raising the dispute.
    pub raised_by: IdentityId,
    /// Commitment to the dispute reason.
    pub reason_hash: Hash32,
}

/// Payload of a `DISPUTE_RESOLVED` audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeResolvedDetails {
    /// Identity (arbiter) that resolved the dispute.
    pub resolver: IdentityId,
    /// Whether the ruling favored the proposer.
    pub proposer_favored: bool,
}

/// Payload of a `DEPOSIT_WITHDRAWN` audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositWithdrawnDetails {
    /// Identity withdrawing the deposit.
    pub identity_id: IdentityId,
    /// Amount withdrawn, smallest unit.
    pub amount: Amount,
}
