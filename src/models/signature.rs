//! Decryption signatures
//!
//! A decryption signature is a time-boxed authorization letting one signer
//! decrypt handles belonging to one exact set of contracts. It is bound to
//! that (signer, contract set) pair for its whole life.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

use super::Address;
use crate::error::{BillsError, BillsResult};

/// Seconds in one day
const SECONDS_PER_DAY: u64 = 86_400;

/// Exact (signer, contract set) scope of a signature
///
/// The contract set is normalized (sorted, de-duplicated) so that two
/// requests for the same set compare equal regardless of argument order.
/// Comparison is plain equality: a key for `{A, B}` never matches `{A}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureKey {
    signer: Address,
    contracts: Vec<Address>,
}

impl SignatureKey {
    /// Build a key for the given contracts and signer
    pub fn new(contracts: &[Address], signer: Address) -> BillsResult<Self> {
        if contracts.is_empty() {
            return Err(BillsError::validation(
                "A decryption signature must cover at least one contract",
            ));
        }
        if contracts.iter().any(Address::is_zero) || signer.is_zero() {
            return Err(BillsError::validation(
                "A decryption signature cannot be bound to the zero address",
            ));
        }
        let mut contracts = contracts.to_vec();
        contracts.sort();
        contracts.dedup();
        Ok(Self { signer, contracts })
    }

    /// The bound signer
    pub fn signer(&self) -> Address {
        self.signer
    }

    /// The bound contracts, sorted
    pub fn contracts(&self) -> &[Address] {
        &self.contracts
    }

    /// Stable string form used by persistent stores
    pub fn storage_key(&self) -> String {
        let contracts: Vec<String> = self.contracts.iter().map(|c| c.to_string()).collect();
        format!("{}:{}", self.signer, contracts.join(","))
    }
}

impl fmt::Display for SignatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {} contract(s)", self.signer.short(), self.contracts.len())
    }
}

/// A time-boxed decryption authorization
#[derive(Clone, Serialize, Deserialize)]
pub struct DecryptionSignature {
    /// Ephemeral private key the service re-encrypts results to
    pub private_key: String,
    /// Public half of the ephemeral key pair
    pub public_key: String,
    /// Signer's signature over the authorization
    pub signature: String,
    /// Contracts the authorization covers
    pub contract_addresses: Vec<Address>,
    /// The signer
    pub user_address: Address,
    /// Start of validity, in seconds since the Unix epoch
    pub start_timestamp: u64,
    /// Validity window in days
    pub duration_days: u32,
}

impl DecryptionSignature {
    /// The exact scope this signature was issued for
    pub fn key(&self) -> BillsResult<SignatureKey> {
        SignatureKey::new(&self.contract_addresses, self.user_address)
    }

    /// Whether this signature was issued for exactly `key`
    pub fn binds(&self, key: &SignatureKey) -> bool {
        self.key().map(|own| own == *key).unwrap_or(false)
    }

    /// End of validity, in seconds since the Unix epoch
    pub fn expires_at(&self) -> u64 {
        self.start_timestamp
            .saturating_add(u64::from(self.duration_days) * SECONDS_PER_DAY)
    }

    /// Whether the signature is expired at `now` (seconds since the epoch)
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires_at()
    }

    /// Whether the signature is expired right now
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_seconds())
    }
}

impl Drop for DecryptionSignature {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

// Never print the private key
impl fmt::Debug for DecryptionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionSignature")
            .field("public_key", &self.public_key)
            .field("contract_addresses", &self.contract_addresses)
            .field("user_address", &self.user_address)
            .field("start_timestamp", &self.start_timestamp)
            .field("duration_days", &self.duration_days)
            .finish_non_exhaustive()
    }
}

/// Current time in seconds since the Unix epoch
pub fn now_seconds() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}
