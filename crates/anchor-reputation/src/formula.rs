//! Pure reputation scoring: tally replay and component formulas.
//!
//! Scores are derived entirely from an identity's agreement event trail;
//! nothing here touches the database. The engine feeds event rows in
//! timestamp order, [`ReputationTally::replay`] folds them into counters,
//! and [`ReputationComponents::from_tally`] turns the counters into four
//! 0 to 100 components plus a weighted composite. Components are rounded
//! to whole numbers before weighting, so persisted snapshots and live
//! computations agree exactly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use anchor_db::AgreementEventRow;
use anchor_types::{AgreementEventKind, BreachedDetails, DisputeResolvedDetails, IdentityId};

use crate::error::ReputationError;

/// Neutral score for identities with no dispute history, and the
/// trustworthiness baseline for identities with no agreements.
pub const NEUTRAL_COMPONENT: u8 = 50;

/// Composite weight of the trustworthiness component.
const WEIGHT_TRUSTWORTHINESS: f64 = 0.4;
/// Composite weight of the reliability component.
const WEIGHT_RELIABILITY: f64 = 0.3;
/// Composite weight of the experience component.
const WEIGHT_EXPERIENCE: f64 = 0.2;
/// Composite weight of the disputes component.
const WEIGHT_DISPUTES: f64 = 0.1;

/// Counters folded from one identity's agreement event trail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReputationTally {
    /// Distinct agreements the identity was a party to.
    pub total: u32,
    /// Agreements that reached completion.
    pub completed: u32,
    /// Breaches committed by the identity.
    pub breached_by: u32,
    /// Breaches committed against the identity by a counterparty.
    pub breached_against: u32,
    /// Disputes resolved in the identity's favor.
    pub disputes_won: u32,
    /// Disputes resolved against the identity.
    pub disputes_lost: u32,
}

impl ReputationTally {
    /// Fold an identity's event trail into counters.
    ///
    /// `events` must already be restricted to agreements where the
    /// identity is proposer or acceptor, ordered by timestamp ascending.
    ///
    /// # Errors
    ///
    /// Returns [`ReputationError::UnknownKind`] for an unrecognized kind
    /// string, or [`ReputationError::Details`] if a payload does not
    /// deserialize.
    pub fn replay(identity_id: IdentityId, events: &[AgreementEventRow]) -> Result<Self, ReputationError> {
        let mut tally = Self::default();
        let mut agreements: BTreeSet<i64> = BTreeSet::new();

        for event in events {
            agreements.insert(event.agreement_id);

            let kind = AgreementEventKind::from_db(&event.kind)
                .ok_or_else(|| ReputationError::UnknownKind(event.kind.clone()))?;

            match kind {
                AgreementEventKind::Completed => {
                    tally.completed = tally.completed.saturating_add(1);
                }
                AgreementEventKind::Breached => {
                    let details = BreachedDetails::deserialize(&event.details)?;
                    if details.breached_by == identity_id {
                        tally.breached_by = tally.breached_by.saturating_add(1);
                    } else {
                        tally.breached_against = tally.breached_against.saturating_add(1);
                    }
                }
                AgreementEventKind::DisputeResolved => {
                    let details = DisputeResolvedDetails::deserialize(&event.details)?;
                    let is_proposer = event.proposer_id == identity_id.as_db();
                    if details.proposer_favored == is_proposer {
                        tally.disputes_won = tally.disputes_won.saturating_add(1);
                    } else {
                        tally.disputes_lost = tally.disputes_lost.saturating_add(1);
                    }
                }
                AgreementEventKind::Proposed
                | AgreementEventKind::Accepted
                | AgreementEventKind::DisputeRaised
                | AgreementEventKind::DepositWithdrawn => {}
            }
        }

        tally.total = u32::try_from(agreements.len()).unwrap_or(u32::MAX);
        Ok(tally)
    }
}

/// The four reputation components, each 0 to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationComponents {
    /// Completion ratio penalized by breaches the identity committed.
    pub trustworthiness: u8,
    /// Track-record signal: completions up, breaches suffered and lost
    /// disputes down, from a neutral baseline.
    pub reliability: u8,
    /// Volume signal from agreements entered and completed.
    pub experience: u8,
    /// Dispute win ratio, neutral when there were none.
    pub disputes: u8,
}

impl ReputationComponents {
    /// Compute the four components from a tally.
    pub fn from_tally(tally: &ReputationTally) -> Self {
        Self {
            trustworthiness: trustworthiness(tally),
            reliability: reliability(tally),
            experience: experience(tally),
            disputes: disputes(tally),
        }
    }

    /// Weighted composite of the four components, 0 to 100.
    pub fn composite_score(&self) -> u8 {
        let weighted = WEIGHT_TRUSTWORTHINESS * f64::from(self.trustworthiness)
            + WEIGHT_RELIABILITY * f64::from(self.reliability)
            + WEIGHT_EXPERIENCE * f64::from(self.experience)
            + WEIGHT_DISPUTES * f64::from(self.disputes);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let score = weighted.round() as u8;
        score.min(100)
    }
}

/// Completion ratio scaled to 100, minus 15 per breach committed.
fn trustworthiness(tally: &ReputationTally) -> u8 {
    if tally.total == 0 {
        return NEUTRAL_COMPONENT;
    }
    let ratio = f64::from(tally.completed) / f64::from(tally.total) * 100.0;
    let penalty = f64::from(tally.breached_by) * 15.0;
    round_clamped(ratio - penalty)
}

/// Baseline 50, plus up to 40 for completions, minus 3 per breach
/// suffered and 5 per lost dispute.
fn reliability(tally: &ReputationTally) -> u8 {
    let bonus = i64::from(tally.completed).saturating_mul(5).min(40);
    let breach_penalty = i64::from(tally.breached_against).saturating_mul(3);
    let dispute_penalty = i64::from(tally.disputes_lost).saturating_mul(5);
    let value = 50_i64
        .saturating_add(bonus)
        .saturating_sub(breach_penalty)
        .saturating_sub(dispute_penalty);
    u8::try_from(value.clamp(0, 100)).unwrap_or(0)
}

/// Up to 60 for agreements entered plus up to 40 for completions.
fn experience(tally: &ReputationTally) -> u8 {
    let entered = i64::from(tally.total).saturating_mul(10).min(60);
    let completed = i64::from(tally.completed).saturating_mul(8).min(40);
    u8::try_from(entered.saturating_add(completed).min(100)).unwrap_or(0)
}

/// Win ratio over resolved disputes, neutral 50 with no history.
fn disputes(tally: &ReputationTally) -> u8 {
    let resolved = tally.disputes_won.saturating_add(tally.disputes_lost);
    if resolved == 0 {
        return NEUTRAL_COMPONENT;
    }
    round_clamped(f64::from(tally.disputes_won) / f64::from(resolved) * 100.0)
}

/// Round to the nearest whole number and clamp into 0 to 100.
fn round_clamped(value: f64) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rounded = value.clamp(0.0, 100.0).round() as u8;
    rounded
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn row(
        id: i64,
        agreement_id: i64,
        kind: AgreementEventKind,
        details: serde_json::Value,
        proposer_id: i64,
        acceptor_id: Option<i64>,
    ) -> AgreementEventRow {
        AgreementEventRow {
            id,
            agreement_id,
            kind: kind.as_db().to_owned(),
            details,
            occurred_at: Utc::now() + Duration::seconds(id),
            block_number: id,
            tx_hash: format!("0x{id:064x}"),
            log_index: 0,
            proposer_id,
            acceptor_id,
        }
    }

    #[test]
    fn empty_history_scores_forty() {
        let tally = ReputationTally::replay(IdentityId::new(1), &[]).unwrap();
        assert_eq!(tally, ReputationTally::default());

        let components = ReputationComponents::from_tally(&tally);
        assert_eq!(components.trustworthiness, 50);
        assert_eq!(components.reliability, 50);
        assert_eq!(components.experience, 0);
        assert_eq!(components.disputes, 50);
        assert_eq!(components.composite_score(), 40);
    }

    #[test]
    fn three_clean_completions_score_seventy_five() {
        let identity = IdentityId::new(7);
        let mut events = Vec::new();
        for agreement in 1..=3_i64 {
            events.push(row(
                agreement * 10,
                agreement,
                AgreementEventKind::Proposed,
                serde_json::json!({"proposer_id": 7}),
                7,
                Some(8),
            ));
            events.push(row(
                agreement * 10 + 1,
                agreement,
                AgreementEventKind::Completed,
                serde_json::json!({"completed_by": 8}),
                7,
                Some(8),
            ));
        }

        let tally = ReputationTally::replay(identity, &events).unwrap();
        assert_eq!(tally.total, 3);
        assert_eq!(tally.completed, 3);

        let components = ReputationComponents::from_tally(&tally);
        assert_eq!(components.trustworthiness, 100);
        assert_eq!(components.reliability, 65);
        assert_eq!(components.experience, 54);
        assert_eq!(components.disputes, 50);
        assert_eq!(components.composite_score(), 75);
    }

    #[test]
    fn breach_attribution_depends_on_breaching_party() {
        let identity = IdentityId::new(7);
        let events = vec![
            row(
                1,
                1,
                AgreementEventKind::Breached,
                serde_json::json!({"breached_by": 7}),
                7,
                Some(8),
            ),
            row(
                2,
                2,
                AgreementEventKind::Breached,
                serde_json::json!({"breached_by": 8}),
                7,
                Some(8),
            ),
        ];

        let tally = ReputationTally::replay(identity, &events).unwrap();
        assert_eq!(tally.breached_by, 1);
        assert_eq!(tally.breached_against, 1);
    }

    #[test]
    fn dispute_outcome_follows_role_and_ruling() {
        let identity = IdentityId::new(7);
        let events = vec![
            // Identity is proposer and the ruling favors the proposer.
            row(
                1,
                1,
                AgreementEventKind::DisputeResolved,
                serde_json::json!({"resolver": 99, "proposer_favored": true}),
                7,
                Some(8),
            ),
            // Identity is acceptor and the ruling favors the proposer.
            row(
                2,
                2,
                AgreementEventKind::DisputeResolved,
                serde_json::json!({"resolver": 99, "proposer_favored": true}),
                8,
                Some(7),
            ),
        ];

        let tally = ReputationTally::replay(identity, &events).unwrap();
        assert_eq!(tally.disputes_won, 1);
        assert_eq!(tally.disputes_lost, 1);

        let components = ReputationComponents::from_tally(&tally);
        assert_eq!(components.disputes, 50);
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let mut event = row(
            1,
            1,
            AgreementEventKind::Proposed,
            serde_json::json!({}),
            7,
            None,
        );
        event.kind = "NOT_A_KIND".to_owned();

        let result = ReputationTally::replay(IdentityId::new(7), &[event]);
        assert!(matches!(result, Err(ReputationError::UnknownKind(_))));
    }

    #[test]
    fn components_stay_in_bounds_for_extreme_tallies() {
        let extremes = [
            ReputationTally {
                total: 1_000,
                completed: 1_000,
                ..Default::default()
            },
            ReputationTally {
                total: 50,
                completed: 0,
                breached_by: 50,
                breached_against: 50,
                disputes_won: 0,
                disputes_lost: 50,
            },
            ReputationTally {
                total: u32::MAX,
                completed: u32::MAX,
                breached_by: u32::MAX,
                breached_against: u32::MAX,
                disputes_won: u32::MAX,
                disputes_lost: u32::MAX,
            },
        ];

        for tally in extremes {
            let components = ReputationComponents::from_tally(&tally);
            assert!(components.trustworthiness <= 100);
            assert!(components.reliability <= 100);
            assert!(components.experience <= 100);
            assert!(components.disputes <= 100);
            assert!(components.composite_score() <= 100);
        }
    }

    #[test]
    fn heavy_breacher_bottoms_out() {
        let tally = ReputationTally {
            total: 10,
            completed: 0,
            breached_by: 10,
            breached_against: 0,
            disputes_won: 0,
            disputes_lost: 0,
        };
        let components = ReputationComponents::from_tally(&tally);
        assert_eq!(components.trustworthiness, 0);
    }
}
