//! Signature stores
//!
//! A store persists decryption signatures across runs. `load` only ever
//! returns entries that are still valid; expired ones are treated as absent.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto::{open_json, seal_json, DerivedKey, SealedData};
use crate::error::{BillsError, BillsResult};
use crate::models::{DecryptionSignature, SignatureKey};
use crate::storage::{read_json, write_json_atomic};

/// Persistence for decryption signatures
#[async_trait::async_trait]
pub trait SignatureStore: Send + Sync {
    /// The stored, non-expired signature for `key`, if any
    async fn load(&self, key: &SignatureKey) -> BillsResult<Option<DecryptionSignature>>;

    /// Store `signature` under `key`, replacing any previous entry
    async fn save(&self, key: &SignatureKey, signature: &DecryptionSignature) -> BillsResult<()>;
}

/// Process-local store
#[derive(Default)]
pub struct InMemorySignatureStore {
    entries: Mutex<HashMap<String, DecryptionSignature>>,
}

impl InMemorySignatureStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SignatureStore for InMemorySignatureStore {
    async fn load(&self, key: &SignatureKey) -> BillsResult<Option<DecryptionSignature>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| BillsError::Storage(format!("Signature store lock poisoned: {}", e)))?;
        Ok(entries
            .get(&key.storage_key())
            .filter(|sig| !sig.is_expired())
            .cloned())
    }

    async fn save(&self, key: &SignatureKey, signature: &DecryptionSignature) -> BillsResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| BillsError::Storage(format!("Signature store lock poisoned: {}", e)))?;
        entries.insert(key.storage_key(), signature.clone());
        Ok(())
    }
}

/// On-disk form of one entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "format", content = "data", rename_all = "lowercase")]
enum StoredSignature {
    Plain(DecryptionSignature),
    Sealed(SealedData),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SignatureFile {
    #[serde(default)]
    entries: BTreeMap<String, StoredSignature>,
}

/// Store backed by `signatures.json`
///
/// With a key, entries are sealed with AES-256-GCM; the signature's private
/// key never touches the disk in the clear.
pub struct JsonFileSignatureStore {
    path: PathBuf,
    key: Option<DerivedKey>,
}

impl JsonFileSignatureStore {
    /// Store writing plain entries
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key: None,
        }
    }

    /// Store sealing entries under `key`
    pub fn sealed(path: impl Into<PathBuf>, key: DerivedKey) -> Self {
        Self {
            path: path.into(),
            key: Some(key),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self, stored: &StoredSignature) -> BillsResult<DecryptionSignature> {
        match (stored, &self.key) {
            (StoredSignature::Plain(sig), _) => Ok(sig.clone()),
            (StoredSignature::Sealed(data), Some(key)) => open_json(data, key),
            (StoredSignature::Sealed(_), None) => Err(BillsError::Encryption(
                "Signature store is encrypted; a passphrase is required".into(),
            )),
        }
    }

    fn seal(&self, signature: &DecryptionSignature) -> BillsResult<StoredSignature> {
        match &self.key {
            Some(key) => Ok(StoredSignature::Sealed(seal_json(signature, key)?)),
            None => Ok(StoredSignature::Plain(signature.clone())),
        }
    }
}

#[async_trait::async_trait]
impl SignatureStore for JsonFileSignatureStore {
    async fn load(&self, key: &SignatureKey) -> BillsResult<Option<DecryptionSignature>> {
        let file: SignatureFile = read_json(&self.path)?;
        let Some(stored) = file.entries.get(&key.storage_key()) else {
            return Ok(None);
        };
        let signature = self.open(stored)?;
        if signature.is_expired() {
            debug!(%key, "stored signature expired");
            return Ok(None);
        }
        Ok(Some(signature))
    }

    async fn save(&self, key: &SignatureKey, signature: &DecryptionSignature) -> BillsResult<()> {
        let mut file: SignatureFile = read_json(&self.path)?;
        // Drop entries that can no longer be used
        file.entries.retain(|_, stored| match self.open(stored) {
            Ok(sig) => !sig.is_expired(),
            Err(_) => true,
        });
        file.entries.insert(key.storage_key(), self.seal(signature)?);
        write_json_atomic(&self.path, &file)
    }
}
