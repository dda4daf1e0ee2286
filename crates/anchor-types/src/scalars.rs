//! Fixed-width binary scalars used throughout the ledger wire format.
//!
//! Ledger log entries carry 32-byte words: indexed topics, hash
//! commitments, token amounts, and timestamps are all encoded as
//! big-endian 256-bit values. This module keeps them at full width --
//! amounts in particular must never be narrowed, because deposits are
//! denominated in the smallest token unit and can exceed 64 bits.
//!
//! All scalars render as lowercase `0x`-prefixed hex and serialize as
//! hex strings, which is also how amounts are persisted (TEXT columns).

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors produced when parsing fixed-width scalars.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ScalarError {
    /// The input had the wrong number of bytes.
    #[error("expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Required byte length.
        expected: usize,
        /// Actual byte length.
        got: usize,
    },

    /// The input was not valid hexadecimal.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Generates a newtype wrapper around a big-endian `[u8; 32]` word.
macro_rules! define_word32 {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Byte width of this scalar.
            pub const LEN: usize = 32;

            /// Wrap a raw 32-byte big-endian value.
            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Construct from a `u64`, zero-extended on the left.
            pub fn from_u64(value: u64) -> Self {
                let mut bytes = [0u8; 32];
                bytes[24..].copy_from_slice(&value.to_be_bytes());
                Self(bytes)
            }

            /// Return the raw bytes.
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Parse from a byte slice that must be exactly 32 bytes.
            pub fn from_slice(slice: &[u8]) -> Result<Self, ScalarError> {
                let bytes: [u8; 32] =
                    slice
                        .try_into()
                        .map_err(|_| ScalarError::InvalidLength {
                            expected: Self::LEN,
                            got: slice.len(),
                        })?;
                Ok(Self(bytes))
            }

            /// Parse from a hex string, with or without a `0x` prefix.
            pub fn from_hex(s: &str) -> Result<Self, ScalarError> {
                let stripped = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(stripped)?;
                Self::from_slice(&bytes)
            }

            /// Render as a lowercase `0x`-prefixed hex string.
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }

            /// Whether every byte is zero.
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            /// The value as a `u64`, if it fits (high 24 bytes all zero).
            pub fn as_u64(&self) -> Option<u64> {
                let (high, low) = self.0.split_at(24);
                if high.iter().any(|b| *b != 0) {
                    return None;
                }
                let low: [u8; 8] = low.try_into().ok()?;
                Some(u64::from_be_bytes(low))
            }

            /// Whether the full 256-bit value is `>= threshold`.
            ///
            /// Values wider than 64 bits trivially exceed any `u64`
            /// threshold.
            pub fn exceeds(&self, threshold: u64) -> bool {
                self.as_u64().is_none_or(|v| v >= threshold)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl core::str::FromStr for $name {
            type Err = ScalarError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(D::Error::custom)
            }
        }
    };
}

define_word32! {
    /// A raw 32-byte word from a log topic or payload slot.
    Word
}

define_word32! {
    /// An opaque 32-byte commitment (name hash, terms hash, reason hash,
    /// trait key/value).
    Hash32
}

define_word32! {
    /// An unsigned 256-bit token amount in the smallest unit.
    ///
    /// Stored big-endian, so the derived byte-lexicographic ordering is
    /// the numeric ordering. Persisted as a hex TEXT column to avoid any
    /// precision loss.
    Amount
}

impl Word {
    /// Reinterpret this word as an opaque hash commitment.
    pub const fn into_hash(self) -> Hash32 {
        Hash32::new(self.0)
    }

    /// Reinterpret this word as a token amount.
    pub const fn into_amount(self) -> Amount {
        Amount::new(self.0)
    }

    /// The low 20 bytes as an address, if the high 12 bytes are zero.
    pub fn as_address(&self) -> Option<Address> {
        let (high, low) = self.0.split_at(12);
        if high.iter().any(|b| *b != 0) {
            return None;
        }
        let low: [u8; 20] = low.try_into().ok()?;
        Some(Address::new(low))
    }

    /// Interpret the word as an ABI-encoded boolean (any nonzero bit).
    pub fn as_bool(&self) -> bool {
        !self.is_zero()
    }
}

/// A 20-byte account or contract address.
///
/// Parsed case-insensitively; rendered and serialized as lowercase
/// `0x`-prefixed hex, matching how owners are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 20]);

impl Address {
    /// Byte width of an address.
    pub const LEN: usize = 20;

    /// Wrap raw address bytes.
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Return the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Parse from a hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, ScalarError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)?;
        let bytes: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ScalarError::InvalidLength {
                expected: Self::LEN,
                got: bytes.len(),
            })?;
        Ok(Self(bytes))
    }

    /// Render as a lowercase `0x`-prefixed hex string.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl core::str::FromStr for Address {
    type Err = ScalarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(D::Error::custom)
    }
}
