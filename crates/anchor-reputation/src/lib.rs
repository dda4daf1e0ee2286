//! Reputation scoring for ledger identities.
//!
//! Scores are a pure function of an identity's agreement event trail:
//! the trail is replayed into a [`ReputationTally`], folded into four
//! 0 to 100 components, and weighted into a composite score. The
//! [`ReputationEngine`] adds persistence on top: snapshot reads,
//! full-population sweeps, and the leaderboard.

pub mod engine;
pub mod error;
pub mod formula;

pub use engine::{
    DEFAULT_HISTORY_LIMIT, LeaderboardEntry, Reputation, ReputationEngine, rank_leaderboard,
};
pub use error::ReputationError;
pub use formula::{NEUTRAL_COMPONENT, ReputationComponents, ReputationTally};
