//! Disambiguation heuristic for the shared settlement discriminant.
//!
//! The deployed agreements contract emits `AgreementAccepted` and
//! `DepositWithdrawn` under one discriminant with identical two-word
//! payloads, so the kind must be inferred from the first decoded 256-bit
//! value. The contract under test: values at or above
//! [`DEPOSIT_THRESHOLD`] are taken to be deposit amounts in the smallest
//! unit (an acceptance); smaller values are plausible Unix timestamps or
//! small withdrawals (a withdrawal).
//!
//! This is a magnitude heuristic, not a structural guarantee. Values
//! within [`AMBIGUITY_WINDOW`] of the threshold are decoded anyway but
//! flagged ambiguous so operators can audit them.

use anchor_types::Word;

/// First-value boundary between withdrawal payloads and deposit amounts.
///
/// `2_000_000_000` as a Unix timestamp is mid-2033; deposits in the
/// smallest token unit are comfortably above it.
pub const DEPOSIT_THRESHOLD: u64 = 2_000_000_000;

/// Half-width of the band around [`DEPOSIT_THRESHOLD`] in which a value
/// could plausibly be either a timestamp or a small deposit.
pub const AMBIGUITY_WINDOW: u64 = 500_000_000;

/// Which event kind a settlement payload was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementKind {
    /// First value is a deposit amount: `AgreementAccepted`.
    Accepted,
    /// First value is below the threshold: `DepositWithdrawn`.
    DepositWithdrawn,
}

/// Outcome of classifying a settlement payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementClassification {
    /// The inferred event kind.
    pub kind: SettlementKind,
    /// Whether the first value fell inside the ambiguity band.
    pub ambiguous: bool,
}

/// Classify a settlement payload by the magnitude of its first word.
pub fn classify_settlement(first: &Word) -> SettlementClassification {
    let kind = if first.exceeds(DEPOSIT_THRESHOLD) {
        SettlementKind::Accepted
    } else {
        SettlementKind::DepositWithdrawn
    };

    // Values wider than u64 are unambiguously amounts.
    let ambiguous = first.as_u64().is_some_and(|v| {
        v >= DEPOSIT_THRESHOLD.saturating_sub(AMBIGUITY_WINDOW)
            && v < DEPOSIT_THRESHOLD.saturating_add(AMBIGUITY_WINDOW)
    });

    SettlementClassification { kind, ambiguous }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn threshold_value_is_a_deposit() {
        // The documented boundary: 2,000,000,000 decodes as Accepted.
        let classified = classify_settlement(&Word::from_u64(DEPOSIT_THRESHOLD));
        assert_eq!(classified.kind, SettlementKind::Accepted);
    }

    #[test]
    fn plausible_timestamp_is_a_withdrawal() {
        // 1,699,999,999 is a plausible Unix timestamp (late 2023).
        let classified = classify_settlement(&Word::from_u64(1_699_999_999));
        assert_eq!(classified.kind, SettlementKind::DepositWithdrawn);
        assert!(classified.ambiguous);
    }

    #[test]
    fn wide_values_are_unambiguous_deposits() {
        let mut wide = [0u8; 32];
        wide[8] = 1;
        let classified = classify_settlement(&Word::new(wide));
        assert_eq!(classified.kind, SettlementKind::Accepted);
        assert!(!classified.ambiguous);
    }

    #[test]
    fn small_values_are_unambiguous_withdrawals() {
        let classified = classify_settlement(&Word::from_u64(100));
        assert_eq!(classified.kind, SettlementKind::DepositWithdrawn);
        assert!(!classified.ambiguous);
    }
}
