//! Shared type definitions for the Anchor ledger indexer.
//!
//! This crate is the single source of truth for the domain types used
//! across the Anchor workspace: ledger-assigned entity identifiers,
//! fixed-width binary scalars with hex codecs, the agreement status state
//! machine, and the typed event records produced by the decoder.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for ledger-assigned integer identifiers
//! - [`scalars`] -- Fixed-width 32-byte words, hashes, amounts, addresses
//! - [`status`] -- Agreement status enum and the transition table
//! - [`events`] -- Raw log entries and typed, decoded ledger events
//! - [`payloads`] -- Kind-specific audit-record payloads (JSONB details)

pub mod events;
pub mod ids;
pub mod payloads;
pub mod scalars;
pub mod status;

// Re-export all public types at crate root for convenience.
pub use events::{DecodedLog, LedgerEvent, Provenance, RawLog};
pub use ids::{AgreementId, IdentityId};
pub use payloads::{
    AcceptedDetails, BreachedDetails, CompletedDetails, DepositWithdrawnDetails,
    DisputeRaisedDetails, DisputeResolvedDetails, ProposedDetails,
};
pub use scalars::{Address, Amount, Hash32, ScalarError, Word};
pub use status::{AgreementEventKind, AgreementStatus, TransitionRejection};
