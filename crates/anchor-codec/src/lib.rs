//! Decoder/dispatcher for raw ledger log entries.
//!
//! Routing is two-stage: first by emitting contract address (identity
//! registry vs. agreements contract), then by the event kind discriminant
//! in `topics[0]`. Each kind then validates a fixed payload byte length
//! before decoding its non-indexed words.
//!
//! One entry decodes to zero or one typed event. Failures are local
//! [`DecodeError`]s -- a malformed entry never aborts the surrounding
//! batch; the synchronizer logs it with its transaction reference and
//! moves on.
//!
//! # Modules
//!
//! - [`decoder`] -- The dispatch table and per-kind decoders
//! - [`settlement`] -- The shared-discriminant magnitude heuristic

pub mod decoder;
pub mod settlement;

pub use decoder::{DecodeError, Sources, decode, discriminants};
pub use settlement::{
    AMBIGUITY_WINDOW, DEPOSIT_THRESHOLD, SettlementClassification, SettlementKind,
    classify_settlement,
};
