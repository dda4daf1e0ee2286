//! Database-bound reputation engine.
//!
//! Wraps the pure formulas with persistence: live calculation from the
//! event trail, snapshot reads, full-population sweeps, and the
//! leaderboard. Concurrent sweeps may write duplicate snapshots; they are
//! consistent because scoring is a pure function of the trail, so no
//! coordination is needed. The engine never mutates ledger-derived state.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;

use anchor_db::{EventStore, IdentityStore, LeaderboardSourceRow, SnapshotRow, SnapshotStore};
use anchor_types::IdentityId;

use crate::error::ReputationError;
use crate::formula::{NEUTRAL_COMPONENT, ReputationComponents, ReputationTally};

/// Snapshots returned by [`ReputationEngine::history`] when no limit is
/// given.
pub const DEFAULT_HISTORY_LIMIT: i64 = 100;

/// A scored reputation, either freshly computed or read from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reputation {
    /// Identity the score belongs to.
    pub identity_id: IdentityId,
    /// Weighted composite, 0 to 100.
    pub score: u8,
    /// Component breakdown.
    pub components: ReputationComponents,
    /// `true` when computed on demand rather than read from a snapshot.
    pub is_live: bool,
    /// When the snapshot was persisted; `None` for live computations.
    pub calculated_at: Option<DateTime<Utc>>,
    /// Checkpoint block the snapshot reflects; `None` for live
    /// computations.
    pub block_number: Option<u64>,
}

/// One leaderboard row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// Positional rank, starting at 1.
    pub rank: u32,
    /// Ranked identity.
    pub identity_id: IdentityId,
    /// Latest snapshot score, or the neutral default if never scored.
    pub score: u8,
    /// When the latest snapshot was computed, if any.
    pub calculated_at: Option<DateTime<Utc>>,
}

/// Rank identities by latest score descending; ties go to the lower
/// identity id. Identities without a snapshot rank with the neutral
/// default score.
pub fn rank_leaderboard(rows: &[LeaderboardSourceRow]) -> Vec<LeaderboardEntry> {
    let mut scored: Vec<(i64, u8, Option<DateTime<Utc>>)> = rows
        .iter()
        .map(|row| {
            let score = row
                .score
                .and_then(|s| u8::try_from(s.clamp(0, 100)).ok())
                .unwrap_or(NEUTRAL_COMPONENT);
            (row.identity_id, score, row.calculated_at)
        })
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    scored
        .into_iter()
        .enumerate()
        .map(|(index, (identity_id, score, calculated_at))| LeaderboardEntry {
            rank: u32::try_from(index.saturating_add(1)).unwrap_or(u32::MAX),
            identity_id: IdentityId::new(u64::try_from(identity_id).unwrap_or_default()),
            score,
            calculated_at,
        })
        .collect()
}

/// Reputation scoring over the persistent event trail.
pub struct ReputationEngine<'a> {
    pool: &'a PgPool,
}

impl<'a> ReputationEngine<'a> {
    /// Create a new engine bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Compute a live score from the identity's full event trail.
    ///
    /// # Errors
    ///
    /// Returns [`ReputationError`] if the trail cannot be fetched or
    /// replayed.
    pub async fn calculate(&self, identity_id: IdentityId) -> Result<Reputation, ReputationError> {
        let events = EventStore::new(self.pool)
            .events_for_identity(identity_id)
            .await?;
        let tally = ReputationTally::replay(identity_id, &events)?;
        let components = ReputationComponents::from_tally(&tally);

        Ok(Reputation {
            identity_id,
            score: components.composite_score(),
            components,
            is_live: true,
            calculated_at: None,
            block_number: None,
        })
    }

    /// Return the most recent snapshot, or a live computation if the
    /// identity has never been scored.
    ///
    /// # Errors
    ///
    /// Returns [`ReputationError`] on data-layer failures or a corrupt
    /// snapshot payload.
    pub async fn reputation(&self, identity_id: IdentityId) -> Result<Reputation, ReputationError> {
        match SnapshotStore::new(self.pool).latest(identity_id).await? {
            Some(row) => parse_snapshot(&row),
            None => self.calculate(identity_id).await,
        }
    }

    /// Return up to `limit` past snapshots, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ReputationError`] on data-layer failures or a corrupt
    /// snapshot payload.
    pub async fn history(
        &self,
        identity_id: IdentityId,
        limit: Option<i64>,
    ) -> Result<Vec<Reputation>, ReputationError> {
        let rows = SnapshotStore::new(self.pool)
            .history(identity_id, limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
            .await?;
        rows.iter().map(parse_snapshot).collect()
    }

    /// Compute and persist a snapshot for every known identity, tagged
    /// with the given block number. Returns the number of identities
    /// scored.
    ///
    /// A crashed sweep leaves earlier snapshots in place and simply
    /// restarts from scratch on the next call.
    ///
    /// # Errors
    ///
    /// Returns [`ReputationError`] if any identity cannot be scored or
    /// persisted; identities already swept keep their new snapshots.
    pub async fn recalculate_all(&self, as_of_block: u64) -> Result<u32, ReputationError> {
        let identities = IdentityStore::new(self.pool).list().await?;
        let snapshots = SnapshotStore::new(self.pool);
        let mut scored = 0u32;

        for identity in &identities {
            let id = IdentityId::new(u64::try_from(identity.id).unwrap_or_default());
            let live = self.calculate(id).await?;
            let components = serde_json::to_value(live.components)?;
            snapshots
                .insert(id, i32::from(live.score), &components, as_of_block)
                .await?;
            scored = scored.saturating_add(1);
            tracing::debug!(identity_id = %id, score = live.score, "Reputation snapshot persisted");
        }

        tracing::info!(
            identities = scored,
            block = as_of_block,
            "Reputation sweep completed"
        );
        Ok(scored)
    }

    /// Return the top `limit` identities by latest snapshot score.
    ///
    /// # Errors
    ///
    /// Returns [`ReputationError`] if the snapshot query fails.
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, ReputationError> {
        let rows = SnapshotStore::new(self.pool).latest_for_all().await?;
        let mut entries = rank_leaderboard(&rows);
        entries.truncate(limit);
        Ok(entries)
    }
}

fn parse_snapshot(row: &SnapshotRow) -> Result<Reputation, ReputationError> {
    let components = ReputationComponents::deserialize(&row.components).map_err(|e| {
        ReputationError::CorruptSnapshot {
            identity_id: row.identity_id,
            reason: e.to_string(),
        }
    })?;

    Ok(Reputation {
        identity_id: IdentityId::new(u64::try_from(row.identity_id).unwrap_or_default()),
        score: u8::try_from(row.score.clamp(0, 100)).unwrap_or(0),
        components,
        is_live: false,
        calculated_at: Some(row.calculated_at),
        block_number: u64::try_from(row.block_number).ok(),
    })
}
