//! Raw ledger log entries and the typed events decoded from them.
//!
//! A [`RawLog`] is exactly what the ledger client hands back: an emitting
//! address, ordered indexed topics, an opaque payload, and provenance.
//! The decoder turns it into a [`LedgerEvent`], the closed set of event
//! records the indexer understands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AgreementId, IdentityId};
use crate::scalars::{Address, Amount, Hash32, Word};

/// Ledger provenance carried by every event: where on the chain it came
/// from. `(block_number, log_index)` is the total processing order and
/// `(tx_hash, log_index)` is the audit-record dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Block the log was emitted in.
    pub block_number: u64,
    /// Position of the log within its block.
    pub log_index: u64,
    /// Transaction that emitted the log.
    pub tx_hash: Hash32,
}

/// One raw log entry as returned by the ledger client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
    /// Contract address that emitted the log.
    pub address: Address,
    /// Ordered indexed topics; `topics[0]` is the event kind discriminant.
    pub topics: Vec<Word>,
    /// Opaque payload of non-indexed fields (32-byte words).
    pub data: Vec<u8>,
    /// Block the log was emitted in.
    pub block_number: u64,
    /// Position of the log within its block.
    pub log_index: u64,
    /// Transaction that emitted the log.
    pub tx_hash: Hash32,
}

impl RawLog {
    /// Extract the ledger provenance of this entry.
    pub const fn provenance(&self) -> Provenance {
        Provenance {
            block_number: self.block_number,
            log_index: self.log_index,
            tx_hash: self.tx_hash,
        }
    }
}

/// A typed ledger event, decoded from a raw log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// A new identity was registered on the identity contract.
    IdentityCreated {
        /// Ledger-assigned identity id.
        identity_id: IdentityId,
        /// Owning account address.
        owner: Address,
        /// Commitment to the chosen name.
        name_hash: Hash32,
        /// On-chain timestamp of the creation.
        timestamp: DateTime<Utc>,
    },

    /// A trait was set or overwritten on an identity.
    TraitSet {
        /// Identity the trait belongs to.
        identity_id: IdentityId,
        /// Trait key (indexed topic, opaque hash).
        trait_key: Hash32,
        /// Trait value (opaque hash).
        trait_value: Hash32,
        /// On-chain timestamp of the write.
        timestamp: DateTime<Utc>,
    },

    /// An agreement was proposed.
    AgreementProposed {
        /// Ledger-assigned agreement id.
        agreement_id: AgreementId,
        /// Identity proposing the agreement.
        proposer_id: IdentityId,
        /// Commitment to the agreement terms.
        terms_hash: Hash32,
        /// Deposit both parties must commit.
        required_deposit: Amount,
        /// Deadline for fulfillment.
        deadline: DateTime<Utc>,
        /// On-chain timestamp of the proposal.
        timestamp: DateTime<Utc>,
    },

    /// A counterparty accepted an agreement.
    AgreementAccepted {
        /// Agreement being accepted.
        agreement_id: AgreementId,
        /// Identity accepting the agreement.
        acceptor_id: IdentityId,
        /// Deposit the acceptor committed.
        deposit: Amount,
        /// On-chain timestamp of the acceptance.
        timestamp: DateTime<Utc>,
    },

    /// An agreement was fulfilled.
    AgreementCompleted {
        /// Agreement being completed.
        agreement_id: AgreementId,
        /// Identity that marked completion.
        completed_by: IdentityId,
        /// On-chain timestamp of the completion.
        timestamp: DateTime<Utc>,
    },

    /// An agreement was breached.
    AgreementBreached {
        /// Agreement being breached.
        agreement_id: AgreementId,
        /// The breaching party.
        breached_by: IdentityId,
        /// On-chain timestamp of the breach.
        timestamp: DateTime<Utc>,
    },

    /// A dispute was raised against an agreement.
    DisputeRaised {
        /// Agreement under dispute.
        agreement_id: AgreementId,
        /// Identity raising the dispute.
        raised_by: IdentityId,
        /// Commitment to the dispute reason.
        reason_hash: Hash32,
        /// On-chain timestamp of the dispute.
        timestamp: DateTime<Utc>,
    },

    /// A dispute was resolved with a ruling.
    DisputeResolved {
        /// Agreement whose dispute was resolved.
        agreement_id: AgreementId,
        /// Identity (arbiter) that resolved the dispute.
        resolver: IdentityId,
        /// Whether the ruling favored the proposer.
        proposer_favored: bool,
        /// On-chain timestamp of the resolution.
        timestamp: DateTime<Utc>,
    },

    /// A deposit was withdrawn from a settled agreement. Informational.
    DepositWithdrawn {
        /// Agreement the deposit belonged to.
        agreement_id: AgreementId,
        /// Identity withdrawing the deposit.
        identity_id: IdentityId,
        /// Amount withdrawn, smallest unit.
        amount: Amount,
        /// On-chain timestamp of the withdrawal.
        timestamp: DateTime<Utc>,
    },
}

impl LedgerEvent {
    /// Short name of the event kind, for logging.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::IdentityCreated { .. } => "IdentityCreated",
            Self::TraitSet { .. } => "TraitSet",
            Self::AgreementProposed { .. } => "AgreementProposed",
            Self::AgreementAccepted { .. } => "AgreementAccepted",
            Self::AgreementCompleted { .. } => "AgreementCompleted",
            Self::AgreementBreached { .. } => "AgreementBreached",
            Self::DisputeRaised { .. } => "DisputeRaised",
            Self::DisputeResolved { .. } => "DisputeResolved",
            Self::DepositWithdrawn { .. } => "DepositWithdrawn",
        }
    }
}

/// A decoded event together with its ledger provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedLog {
    /// Where on the ledger the event came from.
    pub provenance: Provenance,
    /// The typed event record.
    pub event: LedgerEvent,
}
