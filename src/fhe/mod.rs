//! Decryption service and client-side encryption seams
//!
//! The homomorphic scheme itself is opaque to this crate. These traits are
//! the only way in: `DecryptionService` issues decryption signatures and
//! re-encrypts handles for their owner, `InputEncryptor` turns a clear amount
//! into a ciphertext handle plus an input proof bound to (contract, caller).

use std::collections::HashMap;

use crate::error::BillsResult;
use crate::models::{Address, ClearScalar, DecryptionSignature, EncryptedHandle};

/// One handle to decrypt and the contract that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecryptRequest {
    pub handle: EncryptedHandle,
    pub contract: Address,
}

/// The off-chain decryption protocol
#[async_trait::async_trait]
pub trait DecryptionService: Send + Sync {
    /// Create a fresh decryption signature for `signer` over `contracts`
    ///
    /// Errors are reported as `BillsError::Authorization`.
    async fn issue_signature(
        &self,
        contracts: &[Address],
        signer: Address,
    ) -> BillsResult<DecryptionSignature>;

    /// Decrypt a batch of handles for the signature's owner
    ///
    /// The returned map is keyed by handle; its iteration order carries no
    /// meaning.
    async fn user_decrypt(
        &self,
        requests: &[DecryptRequest],
        signature: &DecryptionSignature,
    ) -> BillsResult<HashMap<EncryptedHandle, ClearScalar>>;
}

/// Values to encrypt for one (contract, caller) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInputBuilder {
    contract: Address,
    caller: Address,
    values: Vec<u64>,
}

impl EncryptedInputBuilder {
    /// Start an input bound to a contract and caller
    pub fn new(contract: Address, caller: Address) -> Self {
        Self {
            contract,
            caller,
            values: Vec::new(),
        }
    }

    /// Append a 64-bit unsigned value
    pub fn add64(mut self, value: u64) -> Self {
        self.values.push(value);
        self
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn caller(&self) -> Address {
        self.caller
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }
}

/// Ciphertext handles (one per added value) and the proof covering them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedInput {
    pub handles: Vec<EncryptedHandle>,
    pub input_proof: Vec<u8>,
}

/// Client-side encryption primitive
#[async_trait::async_trait]
pub trait InputEncryptor: Send + Sync {
    async fn encrypt(&self, input: EncryptedInputBuilder) -> BillsResult<EncryptedInput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accumulates_values() {
        let contract = Address::from_bytes([1; 20]);
        let caller = Address::from_bytes([2; 20]);
        let input = EncryptedInputBuilder::new(contract, caller).add64(500).add64(7);

        assert_eq!(input.values(), &[500, 7]);
        assert_eq!(input.contract(), contract);
        assert_eq!(input.caller(), caller);
    }
}
