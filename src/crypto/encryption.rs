//! AES-256-GCM sealing of local secrets
//!
//! Two things are sealed at rest: decryption signatures in `signatures.json`
//! (they carry the ephemeral private key the decryption service trusts) and
//! the devnet's clear aggregates in `devnet.json`. Both embed a `SealedData`
//! document, so it serializes as plain JSON with base64 fields.
//!
//! Every seal draws a fresh 96-bit nonce.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{BillsError, BillsResult};

use super::{random_bytes, DerivedKey};

const NONCE_SIZE: usize = 12;
const SEAL_VERSION: u8 = 1;

/// One sealed value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedData {
    /// base64 nonce
    pub nonce: String,
    /// base64 ciphertext followed by the GCM tag
    pub ciphertext: String,
    #[serde(default = "seal_version")]
    pub version: u8,
}

fn seal_version() -> u8 {
    SEAL_VERSION
}

fn sealing_error(what: impl std::fmt::Display) -> BillsError {
    BillsError::Encryption(what.to_string())
}

fn cipher(key: &DerivedKey) -> BillsResult<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| sealing_error(format!("Failed to create cipher: {}", e)))
}

/// Seal raw bytes under `key`
pub fn seal(plaintext: &[u8], key: &DerivedKey) -> BillsResult<SealedData> {
    let nonce: [u8; NONCE_SIZE] = random_bytes();
    let ciphertext = cipher(key)?
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| sealing_error(format!("Sealing failed: {}", e)))?;

    Ok(SealedData {
        nonce: STANDARD.encode(nonce),
        ciphertext: STANDARD.encode(ciphertext),
        version: SEAL_VERSION,
    })
}

/// Open a sealed value; a wrong key and a tampered ciphertext look the same
pub fn open(sealed: &SealedData, key: &DerivedKey) -> BillsResult<Vec<u8>> {
    if sealed.version != SEAL_VERSION {
        return Err(sealing_error(format!(
            "Unsupported seal version: {}",
            sealed.version
        )));
    }
    let nonce = STANDARD
        .decode(&sealed.nonce)
        .map_err(|e| sealing_error(format!("Invalid nonce encoding: {}", e)))?;
    if nonce.len() != NONCE_SIZE {
        return Err(sealing_error(format!(
            "Invalid nonce size: expected {}, got {}",
            NONCE_SIZE,
            nonce.len()
        )));
    }
    let ciphertext = STANDARD
        .decode(&sealed.ciphertext)
        .map_err(|e| sealing_error(format!("Invalid ciphertext encoding: {}", e)))?;

    cipher(key)?
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
        .map_err(|_| sealing_error("Unsealing failed: invalid key or corrupted data"))
}

/// Seal a devnet aggregate
pub fn seal_u64(value: u64, key: &DerivedKey) -> BillsResult<SealedData> {
    seal(&value.to_be_bytes(), key)
}

pub fn open_u64(sealed: &SealedData, key: &DerivedKey) -> BillsResult<u64> {
    let bytes: [u8; 8] = open(sealed, key)?
        .try_into()
        .map_err(|_| sealing_error("Sealed value has the wrong length"))?;
    Ok(u64::from_be_bytes(bytes))
}

/// Seal any serializable value as JSON
pub fn seal_json<T: Serialize>(value: &T, key: &DerivedKey) -> BillsResult<SealedData> {
    seal(&serde_json::to_vec(value)?, key)
}

pub fn open_json<T: DeserializeOwned>(sealed: &SealedData, key: &DerivedKey) -> BillsResult<T> {
    Ok(serde_json::from_slice(&open(sealed, key)?)?)
}
