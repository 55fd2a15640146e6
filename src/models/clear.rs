//! Clear (decrypted) values
//!
//! A clear value remembers the handle it was decrypted from. It is only
//! presentable while that handle is still the current handle for its query;
//! a refresh that changes the handle makes it stale without any purge.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::EncryptedHandle;

/// A decrypted scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ClearScalar {
    /// An encrypted 64-bit unsigned integer
    Uint(u64),
    /// An encrypted boolean
    Bool(bool),
}

impl ClearScalar {
    /// The value a zero handle decrypts to
    pub const fn zero() -> Self {
        Self::Uint(0)
    }

    /// Numeric view (`true` counts as 1)
    pub fn as_u64(&self) -> u64 {
        match self {
            Self::Uint(v) => *v,
            Self::Bool(b) => u64::from(*b),
        }
    }
}

impl fmt::Display for ClearScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(v) => write!(f, "{}", v),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// A clear value and the handle it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearValue {
    pub source_handle: EncryptedHandle,
    pub value: ClearScalar,
}

impl ClearValue {
    /// Pair a value with its source handle
    pub fn new(source_handle: EncryptedHandle, value: ClearScalar) -> Self {
        Self {
            source_handle,
            value,
        }
    }

    /// The clear value of the zero sentinel
    pub fn zero() -> Self {
        Self::new(EncryptedHandle::ZERO, ClearScalar::zero())
    }

    /// Whether this value may be presented given the query's current handle
    pub fn is_fresh_for(&self, current: Option<&EncryptedHandle>) -> bool {
        current.is_some_and(|handle| *handle == self.source_handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness() {
        let h1 = EncryptedHandle::from_bytes([1; 32]);
        let h2 = EncryptedHandle::from_bytes([2; 32]);
        let value = ClearValue::new(h1, ClearScalar::Uint(500));

        assert!(value.is_fresh_for(Some(&h1)));
        assert!(!value.is_fresh_for(Some(&h2)));
        assert!(!value.is_fresh_for(None));
    }

    #[test]
    fn test_zero_value() {
        let zero = ClearValue::zero();
        assert!(zero.source_handle.is_zero());
        assert_eq!(zero.value.as_u64(), 0);
    }

    #[test]
    fn test_bool_as_number() {
        assert_eq!(ClearScalar::Bool(true).as_u64(), 1);
        assert_eq!(ClearScalar::Bool(false).to_string(), "false");
    }
}
