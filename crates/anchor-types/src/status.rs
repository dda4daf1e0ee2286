//! Agreement lifecycle: status enum, event kinds, and the transition table.
//!
//! Statuses advance monotonically along an explicit finite-state machine.
//! The ledger is trusted for ordering, but transitions are still validated:
//! an event that is not legal from the current status is rejected with a
//! named reason instead of being applied blindly, so out-of-order delivery
//! cannot corrupt entity state.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgreementStatus {
    /// Proposed by one identity, awaiting an acceptor.
    Proposed,
    /// Accepted by a counterparty; both deposits are committed.
    Active,
    /// Fulfilled by both parties. Terminal.
    Completed,
    /// One party failed to honor the terms.
    Breached,
    /// A dispute has been raised and awaits resolution.
    Disputed,
    /// A raised dispute has been resolved. Terminal.
    Resolved,
}

impl AgreementStatus {
    /// Database string for this status.
    pub const fn as_db(self) -> &'static str {
        match self {
            Self::Proposed => "PROPOSED",
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Breached => "BREACHED",
            Self::Disputed => "DISPUTED",
            Self::Resolved => "RESOLVED",
        }
    }

    /// Parse a database string back into a status.
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "PROPOSED" => Some(Self::Proposed),
            "ACTIVE" => Some(Self::Active),
            "COMPLETED" => Some(Self::Completed),
            "BREACHED" => Some(Self::Breached),
            "DISPUTED" => Some(Self::Disputed),
            "RESOLVED" => Some(Self::Resolved),
            _ => None,
        }
    }

    /// Whether no further transitions are legal from this status.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Resolved)
    }

    /// Apply an event kind to this status.
    ///
    /// Returns the successor status, or a [`TransitionRejection`] naming
    /// the illegal pair. Kinds with no status effect (`Proposed` is a
    /// creation, `DepositWithdrawn` is informational) are rejected here;
    /// their handlers never consult the table.
    pub const fn transition(
        self,
        kind: AgreementEventKind,
    ) -> Result<Self, TransitionRejection> {
        use AgreementEventKind as Kind;

        match (self, kind) {
            (Self::Proposed, Kind::Accepted) => Ok(Self::Active),
            (Self::Active, Kind::Completed) => Ok(Self::Completed),
            (Self::Active, Kind::Breached) => Ok(Self::Breached),
            // Disputed admits a further DisputeRaised so every raised
            // dispute keeps its audit record.
            (
                Self::Proposed | Self::Active | Self::Breached | Self::Disputed,
                Kind::DisputeRaised,
            ) => Ok(Self::Disputed),
            (Self::Disputed, Kind::DisputeResolved) => Ok(Self::Resolved),
            (from, kind) => Err(TransitionRejection { from, kind }),
        }
    }
}

impl core::fmt::Display for AgreementStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_db())
    }
}

/// The closed set of agreement audit-event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgreementEventKind {
    /// Agreement created with status `PROPOSED`.
    Proposed,
    /// Counterparty accepted and deposited.
    Accepted,
    /// Agreement fulfilled.
    Completed,
    /// Agreement breached by one party.
    Breached,
    /// Dispute opened against the agreement.
    DisputeRaised,
    /// Dispute closed with a ruling.
    DisputeResolved,
    /// A party withdrew a deposit (no status effect).
    DepositWithdrawn,
}

impl AgreementEventKind {
    /// Database string for this kind.
    pub const fn as_db(self) -> &'static str {
        match self {
            Self::Proposed => "PROPOSED",
            Self::Accepted => "ACCEPTED",
            Self::Completed => "COMPLETED",
            Self::Breached => "BREACHED",
            Self::DisputeRaised => "DISPUTE_RAISED",
            Self::DisputeResolved => "DISPUTE_RESOLVED",
            Self::DepositWithdrawn => "DEPOSIT_WITHDRAWN",
        }
    }

    /// Parse a database string back into a kind.
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "PROPOSED" => Some(Self::Proposed),
            "ACCEPTED" => Some(Self::Accepted),
            "COMPLETED" => Some(Self::Completed),
            "BREACHED" => Some(Self::Breached),
            "DISPUTE_RAISED" => Some(Self::DisputeRaised),
            "DISPUTE_RESOLVED" => Some(Self::DisputeResolved),
            "DEPOSIT_WITHDRAWN" => Some(Self::DepositWithdrawn),
            _ => None,
        }
    }
}

impl core::fmt::Display for AgreementEventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_db())
    }
}

/// A named rejection: `kind` is not a legal transition from `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("event {kind} is not a legal transition from status {from}")]
pub struct TransitionRejection {
    /// The status the agreement currently holds.
    pub from: AgreementStatus,
    /// The event kind that was refused.
    pub kind: AgreementEventKind,
}
