//! Dispatch table and per-kind decoders for raw ledger logs.
//!
//! Topic layout is uniform across both contracts: `topics[0]` is the
//! event kind discriminant, `topics[1]` the primary entity id, and
//! `topics[2]` the secondary value (actor id, owner address, or trait
//! key). Payloads are sequences of 32-byte big-endian words with a fixed
//! length per kind.

use chrono::{DateTime, Utc};

use anchor_types::{
    Address, AgreementId, DecodedLog, IdentityId, LedgerEvent, RawLog, Word,
};

use crate::settlement::{SettlementKind, classify_settlement};

/// Event kind discriminants published by the two contract interfaces.
///
/// These are the `topics[0]` values the contracts emit, hardcoded the
/// same way the ABI is.
pub mod discriminants {
    use anchor_types::Word;

    /// `IdentityCreated(uint256,address,bytes32,uint256)`
    pub const IDENTITY_CREATED: Word = Word::new([
        0x47, 0xc4, 0x7f, 0xed, 0xc0, 0x76, 0x3a, 0xb6, 0x9c, 0x13, 0xcc, 0x97, 0x9a, 0x6a, 0xe3,
        0x09, 0x99, 0x46, 0x63, 0xec, 0xdb, 0xe7, 0x66, 0x4f, 0xf0, 0xc0, 0x06, 0x6c, 0xe2, 0x78,
        0x95, 0xcf,
    ]);

    /// `TraitSet(uint256,bytes32,bytes32,uint256)`
    pub const TRAIT_SET: Word = Word::new([
        0x4f, 0x2f, 0xca, 0xd5, 0x58, 0x34, 0x3c, 0xcb, 0xe0, 0xce, 0xdc, 0x21, 0xba, 0x81, 0x50,
        0xd0, 0x9b, 0xd4, 0x0d, 0xa5, 0x1f, 0x1d, 0xff, 0x9c, 0x70, 0x26, 0xfe, 0x08, 0xd2, 0x4a,
        0x4d, 0xfb,
    ]);

    /// `AgreementProposed(uint256,uint256,bytes32,uint256,uint256,uint256)`
    pub const AGREEMENT_PROPOSED: Word = Word::new([
        0x8a, 0x59, 0x9d, 0xff, 0x5d, 0x42, 0x89, 0x6f, 0x31, 0x7a, 0x54, 0x4d, 0xab, 0x86, 0x4a,
        0xcc, 0x35, 0x0f, 0x7a, 0x50, 0xb4, 0x42, 0x8b, 0x50, 0x74, 0xc6, 0xb8, 0x43, 0x8a, 0x4c,
        0x51, 0x8a,
    ]);

    /// Shared by `AgreementAccepted` and `DepositWithdrawn` -- the
    /// deployed contract reused one discriminant for both settlement
    /// events; see [`crate::settlement`].
    pub const AGREEMENT_SETTLEMENT: Word = Word::new([
        0x14, 0xf7, 0x01, 0xa4, 0x8f, 0x85, 0x03, 0xaa, 0x46, 0xd9, 0x6f, 0x5d, 0x0d, 0xce, 0x57,
        0xb8, 0xc5, 0x98, 0x03, 0xcd, 0x13, 0xc7, 0x49, 0x21, 0xbc, 0x4e, 0xde, 0x13, 0xa7, 0x2c,
        0x48, 0x2c,
    ]);

    /// `AgreementCompleted(uint256,uint256,uint256)`
    pub const AGREEMENT_COMPLETED: Word = Word::new([
        0x40, 0x1f, 0xcb, 0xe2, 0x71, 0x21, 0x4b, 0xb4, 0x0c, 0xee, 0xdf, 0x09, 0x0b, 0x01, 0x78,
        0x44, 0x80, 0x9d, 0xb2, 0xee, 0xbc, 0x5e, 0x8f, 0xd9, 0xf0, 0xf9, 0x1e, 0x1b, 0xc8, 0x0a,
        0xf5, 0xe3,
    ]);

    /// `AgreementBreached(uint256,uint256,uint256)`
    pub const AGREEMENT_BREACHED: Word = Word::new([
        0x3a, 0xe0, 0xda, 0xdd, 0x76, 0x0a, 0x2a, 0x0a, 0xd4, 0x39, 0x34, 0x96, 0x40, 0x84, 0x71,
        0xb0, 0x93, 0xe2, 0x8b, 0xc4, 0x15, 0x96, 0x01, 0x00, 0x9d, 0x1b, 0x3a, 0x2c, 0xce, 0xfe,
        0x2a, 0xf1,
    ]);

    /// `DisputeRaised(uint256,uint256,bytes32,uint256)`
    pub const DISPUTE_RAISED: Word = Word::new([
        0x45, 0x11, 0x5b, 0x20, 0x42, 0xab, 0xb1, 0xfa, 0x1a, 0x13, 0x29, 0x05, 0xa7, 0x8f, 0x8e,
        0xd5, 0xda, 0x2b, 0x4d, 0xdf, 0xe7, 0x1a, 0x65, 0x01, 0x5b, 0xf2, 0xa2, 0x9f, 0x42, 0xe2,
        0x8d, 0x52,
    ]);

    /// `DisputeResolved(uint256,uint256,bool,uint256)`
    pub const DISPUTE_RESOLVED: Word = Word::new([
        0x66, 0xda, 0x28, 0x30, 0x34, 0x4b, 0xfe, 0x22, 0x26, 0x97, 0x8a, 0x71, 0x22, 0xc4, 0x5b,
        0xdf, 0xa5, 0x9c, 0xb0, 0xc6, 0xa5, 0x81, 0x61, 0x5b, 0x9e, 0x51, 0x01, 0xc9, 0xe3, 0x4e,
        0x72, 0x94,
    ]);
}

/// The two contract addresses logs are consumed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sources {
    /// Identity registry contract.
    pub identity: Address,
    /// Agreements contract.
    pub agreements: Address,
}

/// Errors local to decoding one log entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The discriminant in `topics[0]` is not one this source emits.
    #[error("unknown event discriminant {topic}")]
    UnknownKind {
        /// The unrecognized discriminant.
        topic: Word,
    },

    /// The entry did not carry the expected number of indexed topics.
    #[error("expected {expected} topics, got {got}")]
    TopicCount {
        /// Topics required by the kind.
        expected: usize,
        /// Topics present on the entry.
        got: usize,
    },

    /// The payload length did not match the kind's fixed size.
    #[error("{kind}: expected {expected}-byte payload, got {got}")]
    PayloadLength {
        /// Event kind being decoded.
        kind: &'static str,
        /// Required payload bytes.
        expected: usize,
        /// Actual payload bytes.
        got: usize,
    },

    /// An id topic does not fit the ledger's `u64` id space.
    #[error("id topic {topic} overflows u64")]
    IdOverflow {
        /// The oversized topic value.
        topic: Word,
    },

    /// An owner topic was not a left-padded 20-byte address.
    #[error("owner topic {topic} is not an address")]
    OwnerTopic {
        /// The malformed topic value.
        topic: Word,
    },

    /// A timestamp word is outside the representable calendar range.
    #[error("timestamp word {word} is out of range")]
    Timestamp {
        /// The out-of-range word.
        word: Word,
    },
}

/// Decode one raw log entry into a typed event.
///
/// Returns `Ok(None)` for logs emitted by addresses outside the two
/// known sources. All other failures are [`DecodeError`]s scoped to this
/// entry alone.
pub fn decode(raw: &RawLog, sources: &Sources) -> Result<Option<DecodedLog>, DecodeError> {
    let event = if raw.address == sources.identity {
        decode_identity(raw)?
    } else if raw.address == sources.agreements {
        decode_agreement(raw)?
    } else {
        return Ok(None);
    };

    Ok(Some(DecodedLog {
        provenance: raw.provenance(),
        event,
    }))
}

/// Decode a log from the identity registry.
fn decode_identity(raw: &RawLog) -> Result<LedgerEvent, DecodeError> {
    let (discriminant, primary, secondary) = topics3(raw)?;
    let identity_id = IdentityId::new(id_from(primary)?);

    if discriminant == discriminants::IDENTITY_CREATED {
        let [name_hash, ts] = payload_words::<2>("IdentityCreated", &raw.data)?;
        let owner = secondary
            .as_address()
            .ok_or(DecodeError::OwnerTopic { topic: secondary })?;
        Ok(LedgerEvent::IdentityCreated {
            identity_id,
            owner,
            name_hash: name_hash.into_hash(),
            timestamp: timestamp_from(ts)?,
        })
    } else if discriminant == discriminants::TRAIT_SET {
        let [trait_value, ts] = payload_words::<2>("TraitSet", &raw.data)?;
        Ok(LedgerEvent::TraitSet {
            identity_id,
            trait_key: secondary.into_hash(),
            trait_value: trait_value.into_hash(),
            timestamp: timestamp_from(ts)?,
        })
    } else {
        Err(DecodeError::UnknownKind {
            topic: discriminant,
        })
    }
}

/// Decode a log from the agreements contract.
fn decode_agreement(raw: &RawLog) -> Result<LedgerEvent, DecodeError> {
    let (discriminant, primary, secondary) = topics3(raw)?;
    let agreement_id = AgreementId::new(id_from(primary)?);
    let actor_id = IdentityId::new(id_from(secondary)?);

    if discriminant == discriminants::AGREEMENT_PROPOSED {
        let [terms_hash, deposit, deadline, ts] =
            payload_words::<4>("AgreementProposed", &raw.data)?;
        Ok(LedgerEvent::AgreementProposed {
            agreement_id,
            proposer_id: actor_id,
            terms_hash: terms_hash.into_hash(),
            required_deposit: deposit.into_amount(),
            deadline: timestamp_from(deadline)?,
            timestamp: timestamp_from(ts)?,
        })
    } else if discriminant == discriminants::AGREEMENT_SETTLEMENT {
        let [value, ts] = payload_words::<2>("AgreementSettlement", &raw.data)?;
        let classified = classify_settlement(&value);
        if classified.ambiguous {
            tracing::warn!(
                agreement_id = %agreement_id,
                first_value = %value,
                tx_hash = %raw.tx_hash,
                "settlement payload near deposit threshold, classification is ambiguous"
            );
        }
        match classified.kind {
            SettlementKind::Accepted => Ok(LedgerEvent::AgreementAccepted {
                agreement_id,
                acceptor_id: actor_id,
                deposit: value.into_amount(),
                timestamp: timestamp_from(ts)?,
            }),
            SettlementKind::DepositWithdrawn => Ok(LedgerEvent::DepositWithdrawn {
                agreement_id,
                identity_id: actor_id,
                amount: value.into_amount(),
                timestamp: timestamp_from(ts)?,
            }),
        }
    } else if discriminant == discriminants::AGREEMENT_COMPLETED {
        let [ts] = payload_words::<1>("AgreementCompleted", &raw.data)?;
        Ok(LedgerEvent::AgreementCompleted {
            agreement_id,
            completed_by: actor_id,
            timestamp: timestamp_from(ts)?,
        })
    } else if discriminant == discriminants::AGREEMENT_BREACHED {
        let [ts] = payload_words::<1>("AgreementBreached", &raw.data)?;
        Ok(LedgerEvent::AgreementBreached {
            agreement_id,
            breached_by: actor_id,
            timestamp: timestamp_from(ts)?,
        })
    } else if discriminant == discriminants::DISPUTE_RAISED {
        let [reason_hash, ts] = payload_words::<2>("DisputeRaised", &raw.data)?;
        Ok(LedgerEvent::DisputeRaised {
            agreement_id,
            raised_by: actor_id,
            reason_hash: reason_hash.into_hash(),
            timestamp: timestamp_from(ts)?,
        })
    } else if discriminant == discriminants::DISPUTE_RESOLVED {
        let [flag, ts] = payload_words::<2>("DisputeResolved", &raw.data)?;
        Ok(LedgerEvent::DisputeResolved {
            agreement_id,
            resolver: actor_id,
            proposer_favored: flag.as_bool(),
            timestamp: timestamp_from(ts)?,
        })
    } else {
        Err(DecodeError::UnknownKind {
            topic: discriminant,
        })
    }
}

/// Every known kind indexes exactly three topics.
fn topics3(raw: &RawLog) -> Result<(Word, Word, Word), DecodeError> {
    match raw.topics.as_slice() {
        [discriminant, primary, secondary] => Ok((*discriminant, *primary, *secondary)),
        other => Err(DecodeError::TopicCount {
            expected: 3,
            got: other.len(),
        }),
    }
}

/// An id topic must fit the ledger's `u64` id space.
fn id_from(topic: Word) -> Result<u64, DecodeError> {
    topic.as_u64().ok_or(DecodeError::IdOverflow { topic })
}

/// Decode a Unix-seconds word into calendar time.
fn timestamp_from(word: Word) -> Result<DateTime<Utc>, DecodeError> {
    let secs = word.as_u64().ok_or(DecodeError::Timestamp { word })?;
    let secs = i64::try_from(secs).map_err(|_| DecodeError::Timestamp { word })?;
    DateTime::from_timestamp(secs, 0).ok_or(DecodeError::Timestamp { word })
}

/// Split a payload into exactly `N` 32-byte words.
fn payload_words<const N: usize>(
    kind: &'static str,
    data: &[u8],
) -> Result<[Word; N], DecodeError> {
    let expected = N.saturating_mul(Word::LEN);
    if data.len() != expected {
        return Err(DecodeError::PayloadLength {
            kind,
            expected,
            got: data.len(),
        });
    }

    let mut words = [Word::default(); N];
    for (slot, chunk) in words.iter_mut().zip(data.chunks_exact(Word::LEN)) {
        // chunks_exact guarantees 32 bytes per chunk.
        *slot = Word::from_slice(chunk).unwrap_or_default();
    }
    Ok(words)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use anchor_types::Hash32;

    use super::*;
    use crate::settlement::{AMBIGUITY_WINDOW, DEPOSIT_THRESHOLD};

    const IDENTITY_ADDR: [u8; 20] = [0xaa; 20];
    const AGREEMENTS_ADDR: [u8; 20] = [0xbb; 20];

    fn sources() -> Sources {
        Sources {
            identity: Address::new(IDENTITY_ADDR),
            agreements: Address::new(AGREEMENTS_ADDR),
        }
    }

    fn make_log(address: Address, topics: Vec<Word>, payload: &[Word]) -> RawLog {
        let mut data = Vec::with_capacity(payload.len() * Word::LEN);
        for word in payload {
            data.extend_from_slice(word.as_bytes());
        }
        RawLog {
            address,
            topics,
            data,
            block_number: 10,
            log_index: 3,
            tx_hash: Hash32::from_u64(0xabcd),
        }
    }

    fn owner_topic(addr: [u8; 20]) -> Word {
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(&addr);
        Word::new(bytes)
    }

    #[test]
    fn unknown_address_yields_no_event() {
        let log = make_log(
            Address::new([0xcc; 20]),
            vec![discriminants::IDENTITY_CREATED, Word::from_u64(1), Word::from_u64(2)],
            &[Word::from_u64(0), Word::from_u64(1_700_000_000)],
        );
        assert_eq!(decode(&log, &sources()).unwrap(), None);
    }

    #[test]
    fn decodes_identity_created() {
        let log = make_log(
            Address::new(IDENTITY_ADDR),
            vec![
                discriminants::IDENTITY_CREATED,
                Word::from_u64(7),
                owner_topic([0x11; 20]),
            ],
            &[Word::from_u64(0xfeed), Word::from_u64(1_700_000_000)],
        );

        let decoded = decode(&log, &sources()).unwrap().unwrap();
        assert_eq!(decoded.provenance.block_number, 10);
        assert_eq!(decoded.provenance.log_index, 3);
        match decoded.event {
            LedgerEvent::IdentityCreated {
                identity_id,
                owner,
                name_hash,
                timestamp,
            } => {
                assert_eq!(identity_id, IdentityId::new(7));
                assert_eq!(owner, Address::new([0x11; 20]));
                assert_eq!(name_hash, Hash32::from_u64(0xfeed));
                assert_eq!(timestamp.timestamp(), 1_700_000_000);
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn decodes_trait_set() {
        let log = make_log(
            Address::new(IDENTITY_ADDR),
            vec![
                discriminants::TRAIT_SET,
                Word::from_u64(7),
                Word::from_u64(0x6b65),
            ],
            &[Word::from_u64(0x7a1e), Word::from_u64(1_700_000_100)],
        );

        let decoded = decode(&log, &sources()).unwrap().unwrap();
        match decoded.event {
            LedgerEvent::TraitSet {
                identity_id,
                trait_key,
                trait_value,
                ..
            } => {
                assert_eq!(identity_id, IdentityId::new(7));
                assert_eq!(trait_key, Hash32::from_u64(0x6b65));
                assert_eq!(trait_value, Hash32::from_u64(0x7a1e));
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn decodes_agreement_proposed() {
        let log = make_log(
            Address::new(AGREEMENTS_ADDR),
            vec![
                discriminants::AGREEMENT_PROPOSED,
                Word::from_u64(100),
                Word::from_u64(7),
            ],
            &[
                Word::from_u64(0x7e45),
                Word::from_u64(5_000_000_000),
                Word::from_u64(1_800_000_000),
                Word::from_u64(1_700_000_000),
            ],
        );

        let decoded = decode(&log, &sources()).unwrap().unwrap();
        match decoded.event {
            LedgerEvent::AgreementProposed {
                agreement_id,
                proposer_id,
                required_deposit,
                deadline,
                ..
            } => {
                assert_eq!(agreement_id, AgreementId::new(100));
                assert_eq!(proposer_id, IdentityId::new(7));
                assert_eq!(required_deposit.as_u64(), Some(5_000_000_000));
                assert_eq!(deadline.timestamp(), 1_800_000_000);
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn settlement_above_threshold_is_accepted() {
        // Documented boundary: first value 2,000,000,000 decodes as
        // Accepted with that value as the deposit amount.
        let log = make_log(
            Address::new(AGREEMENTS_ADDR),
            vec![
                discriminants::AGREEMENT_SETTLEMENT,
                Word::from_u64(100),
                Word::from_u64(8),
            ],
            &[Word::from_u64(2_000_000_000), Word::from_u64(1_700_000_000)],
        );

        let decoded = decode(&log, &sources()).unwrap().unwrap();
        match decoded.event {
            LedgerEvent::AgreementAccepted {
                acceptor_id,
                deposit,
                ..
            } => {
                assert_eq!(acceptor_id, IdentityId::new(8));
                assert_eq!(deposit.as_u64(), Some(2_000_000_000));
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn settlement_below_threshold_is_withdrawal() {
        // 1,699,999,999 reads as a plausible Unix timestamp and must
        // decode as DepositWithdrawn.
        let log = make_log(
            Address::new(AGREEMENTS_ADDR),
            vec![
                discriminants::AGREEMENT_SETTLEMENT,
                Word::from_u64(100),
                Word::from_u64(8),
            ],
            &[Word::from_u64(1_699_999_999), Word::from_u64(1_700_000_000)],
        );

        let decoded = decode(&log, &sources()).unwrap().unwrap();
        match decoded.event {
            LedgerEvent::DepositWithdrawn {
                identity_id,
                amount,
                ..
            } => {
                assert_eq!(identity_id, IdentityId::new(8));
                assert_eq!(amount.as_u64(), Some(1_699_999_999));
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn decodes_completed_and_breached() {
        for (discriminant, expect_breach) in [
            (discriminants::AGREEMENT_COMPLETED, false),
            (discriminants::AGREEMENT_BREACHED, true),
        ] {
            let log = make_log(
                Address::new(AGREEMENTS_ADDR),
                vec![discriminant, Word::from_u64(100), Word::from_u64(9)],
                &[Word::from_u64(1_700_000_000)],
            );
            let decoded = decode(&log, &sources()).unwrap().unwrap();
            match decoded.event {
                LedgerEvent::AgreementCompleted { completed_by, .. } if !expect_breach => {
                    assert_eq!(completed_by, IdentityId::new(9));
                }
                LedgerEvent::AgreementBreached { breached_by, .. } if expect_breach => {
                    assert_eq!(breached_by, IdentityId::new(9));
                }
                other => panic!("wrong event: {other:?}"),
            }
        }
    }

    #[test]
    fn decodes_dispute_lifecycle() {
        let raised = make_log(
            Address::new(AGREEMENTS_ADDR),
            vec![
                discriminants::DISPUTE_RAISED,
                Word::from_u64(100),
                Word::from_u64(7),
            ],
            &[Word::from_u64(0xdead), Word::from_u64(1_700_000_000)],
        );
        match decode(&raised, &sources()).unwrap().unwrap().event {
            LedgerEvent::DisputeRaised {
                raised_by,
                reason_hash,
                ..
            } => {
                assert_eq!(raised_by, IdentityId::new(7));
                assert_eq!(reason_hash, Hash32::from_u64(0xdead));
            }
            other => panic!("wrong event: {other:?}"),
        }

        let resolved = make_log(
            Address::new(AGREEMENTS_ADDR),
            vec![
                discriminants::DISPUTE_RESOLVED,
                Word::from_u64(100),
                Word::from_u64(3),
            ],
            &[Word::from_u64(1), Word::from_u64(1_700_000_000)],
        );
        match decode(&resolved, &sources()).unwrap().unwrap().event {
            LedgerEvent::DisputeResolved {
                resolver,
                proposer_favored,
                ..
            } => {
                assert_eq!(resolver, IdentityId::new(3));
                assert!(proposer_favored);
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn wrong_payload_length_is_local_error() {
        let log = make_log(
            Address::new(AGREEMENTS_ADDR),
            vec![
                discriminants::AGREEMENT_PROPOSED,
                Word::from_u64(100),
                Word::from_u64(7),
            ],
            &[Word::from_u64(1), Word::from_u64(2)],
        );
        let err = decode(&log, &sources()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::PayloadLength {
                kind: "AgreementProposed",
                expected: 128,
                got: 64,
            }
        );
    }

    #[test]
    fn missing_topics_is_local_error() {
        let log = make_log(
            Address::new(AGREEMENTS_ADDR),
            vec![discriminants::AGREEMENT_COMPLETED, Word::from_u64(100)],
            &[Word::from_u64(1_700_000_000)],
        );
        assert_eq!(
            decode(&log, &sources()).unwrap_err(),
            DecodeError::TopicCount {
                expected: 3,
                got: 2
            }
        );
    }

    #[test]
    fn unknown_discriminant_is_local_error() {
        let log = make_log(
            Address::new(AGREEMENTS_ADDR),
            vec![Word::from_u64(0x9999), Word::from_u64(100), Word::from_u64(7)],
            &[],
        );
        assert!(matches!(
            decode(&log, &sources()).unwrap_err(),
            DecodeError::UnknownKind { .. }
        ));
    }

    #[test]
    fn oversized_id_topic_is_rejected() {
        let mut wide = [0u8; 32];
        wide[0] = 1;
        let log = make_log(
            Address::new(AGREEMENTS_ADDR),
            vec![
                discriminants::AGREEMENT_COMPLETED,
                Word::new(wide),
                Word::from_u64(7),
            ],
            &[Word::from_u64(1_700_000_000)],
        );
        assert!(matches!(
            decode(&log, &sources()).unwrap_err(),
            DecodeError::IdOverflow { .. }
        ));
    }

    #[test]
    fn malformed_owner_topic_is_rejected() {
        let mut tainted = [0u8; 32];
        tainted[0] = 0xff;
        let log = make_log(
            Address::new(IDENTITY_ADDR),
            vec![
                discriminants::IDENTITY_CREATED,
                Word::from_u64(7),
                Word::new(tainted),
            ],
            &[Word::from_u64(0xfeed), Word::from_u64(1_700_000_000)],
        );
        assert!(matches!(
            decode(&log, &sources()).unwrap_err(),
            DecodeError::OwnerTopic { .. }
        ));
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;
        use crate::settlement::classify_settlement;

        proptest! {
            /// Any first value inside the ambiguity band must carry the
            /// ambiguous flag, regardless of which side of the threshold
            /// it lands on.
            #[test]
            fn near_threshold_values_are_flagged(
                offset in 0..(2 * AMBIGUITY_WINDOW)
            ) {
                let value = DEPOSIT_THRESHOLD - AMBIGUITY_WINDOW + offset;
                let classified = classify_settlement(&Word::from_u64(value));
                prop_assert!(classified.ambiguous);
            }

            /// Values far from the threshold are never flagged.
            #[test]
            fn distant_values_are_unambiguous(
                value in prop_oneof![
                    0..(DEPOSIT_THRESHOLD - AMBIGUITY_WINDOW),
                    (DEPOSIT_THRESHOLD + AMBIGUITY_WINDOW)..u64::MAX,
                ]
            ) {
                let classified = classify_settlement(&Word::from_u64(value));
                prop_assert!(!classified.ambiguous);
            }
        }
    }
}
