//! Persistence layer for the ledger indexer.
//!
//! All state lives in `PostgreSQL`: entities reconstructed from ledger
//! events (identities, traits, agreements), the append-only agreement
//! event trail, reputation snapshots, and the sync checkpoint.
//!
//! Reads go through pool-bound store structs. Mutations that must land
//! atomically with an audit-record append are associated functions taking
//! a `&mut PgConnection`, so the event processor can wrap them in one
//! transaction.

pub mod agreement_store;
pub mod checkpoint_store;
pub mod error;
pub mod event_store;
pub mod identity_store;
pub mod postgres;
pub mod snapshot_store;

pub use agreement_store::{AgreementRow, AgreementStore};
pub use checkpoint_store::CheckpointStore;
pub use error::DbError;
pub use event_store::{AgreementEventRow, EventStore};
pub use identity_store::{IdentityRow, IdentityStore, TraitRow};
pub use postgres::{PostgresConfig, PostgresPool};
pub use snapshot_store::{LeaderboardSourceRow, SnapshotRow, SnapshotStore};
