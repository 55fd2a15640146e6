//! Fixed-size, hex-encoded identifiers
//!
//! Addresses, encrypted handles and transaction hashes are all opaque byte
//! strings that travel as `0x`-prefixed lowercase hex. Keeping them as
//! distinct newtypes means a handle can never be passed where an address is
//! expected.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::BillsError;

/// Macro to generate fixed-size hex newtypes
macro_rules! define_bytes {
    ($(#[$meta:meta])* $name:ident, $len:literal, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; $len]);

        impl $name {
            /// The all-zero value
            pub const ZERO: Self = Self([0u8; $len]);

            /// Wrap raw bytes
            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Get the raw bytes
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Check whether every byte is zero
            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            /// Shortened form for terminal output (`0x1234…abcd`)
            pub fn short(&self) -> String {
                let full = self.to_string();
                format!("{}…{}", &full[..6], &full[full.len() - 4..])
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::ZERO
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = BillsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                let digits = trimmed
                    .strip_prefix("0x")
                    .or_else(|| trimmed.strip_prefix("0X"))
                    .unwrap_or(trimmed);
                let mut bytes = [0u8; $len];
                hex::decode_to_slice(digits, &mut bytes).map_err(|e| {
                    BillsError::validation(format!("Invalid {} '{}': {}", $label, s, e))
                })?;
                Ok(Self(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_bytes!(
    /// A 20-byte account or contract address
    Address,
    20,
    "address"
);

define_bytes!(
    /// Opaque reference to an encrypted value held by the ledger
    ///
    /// The zero handle is the sentinel for "no value": it always decrypts to
    /// zero and is never sent to the decryption service.
    EncryptedHandle,
    32,
    "handle"
);

define_bytes!(
    /// Hash identifying a submitted ledger transaction
    TxHash,
    32,
    "transaction hash"
);
