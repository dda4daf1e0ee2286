//! Type-safe identifier wrappers for ledger-assigned entity ids.
//!
//! Identities and agreements are numbered by the ledger contracts
//! themselves; the indexer never generates ids of its own. Reusing the
//! ledger's unsigned integers as primary keys makes re-synchronization
//! naturally idempotent: replaying a creation event targets the same row.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around a ledger-assigned `u64` id.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a ledger-assigned identifier.
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Return the inner `u64` value.
            pub const fn into_inner(self) -> u64 {
                self.0
            }

            /// Return the id as an `i64` for database binding.
            ///
            /// Ledger ids are small sequential integers; values beyond
            /// `i64::MAX` are clamped rather than panicking.
            pub fn as_db(self) -> i64 {
                i64::try_from(self.0).unwrap_or(i64::MAX)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for an on-ledger identity.
    IdentityId
}

define_id! {
    /// Unique identifier for an agreement between two identities.
    AgreementId
}
