//! Error types for the reputation engine.

use anchor_db::DbError;

/// Errors that can occur while scoring reputation.
#[derive(Debug, thiserror::Error)]
pub enum ReputationError {
    /// A data-layer operation failed.
    #[error("Data layer error: {0}")]
    Db(#[from] DbError),

    /// A stored event kind string was not recognized.
    #[error("Unknown agreement event kind: {0}")]
    UnknownKind(String),

    /// A stored event payload did not deserialize.
    #[error("Malformed event details: {0}")]
    Details(#[from] serde_json::Error),

    /// A persisted snapshot could not be mapped back to components.
    #[error("Corrupt snapshot for identity {identity_id}: {reason}")]
    CorruptSnapshot {
        /// Identity the snapshot belongs to.
        identity_id: i64,
        /// What failed to parse.
        reason: String,
    },
}
