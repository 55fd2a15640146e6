//! In-process signature cache in front of a `SignatureStore`

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use super::store::SignatureStore;
use crate::error::{BillsError, BillsResult};
use crate::fhe::DecryptionService;
use crate::models::{Address, DecryptionSignature, SignatureKey};

/// Exact-scope cache of decryption signatures
///
/// Lookup order is memory, then the injected store, then a fresh signature
/// from the decryption service. An entry is only ever returned for the exact
/// (signer, contract set) it was issued for.
pub struct SignatureCache {
    entries: Mutex<HashMap<SignatureKey, DecryptionSignature>>,
    store: Arc<dyn SignatureStore>,
}

impl SignatureCache {
    pub fn new(store: Arc<dyn SignatureStore>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            store,
        }
    }

    fn cached(&self, key: &SignatureKey) -> BillsResult<Option<DecryptionSignature>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| BillsError::Storage(format!("Signature cache lock poisoned: {}", e)))?;
        Ok(entries
            .get(key)
            .filter(|sig| sig.binds(key) && !sig.is_expired())
            .cloned())
    }

    fn remember(&self, key: SignatureKey, signature: DecryptionSignature) -> BillsResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| BillsError::Storage(format!("Signature cache lock poisoned: {}", e)))?;
        entries.insert(key, signature);
        Ok(())
    }

    /// A valid signature for exactly `contracts` and `signer`
    ///
    /// # Errors
    ///
    /// `Authorization` if no signature could be produced.
    pub async fn get_or_create(
        &self,
        contracts: &[Address],
        signer: Address,
        service: &dyn DecryptionService,
    ) -> BillsResult<DecryptionSignature> {
        let key = SignatureKey::new(contracts, signer)
            .map_err(|e| BillsError::Authorization(e.to_string()))?;

        if let Some(signature) = self.cached(&key)? {
            debug!(%key, "signature cache hit");
            return Ok(signature);
        }

        match self.store.load(&key).await {
            Ok(Some(signature)) if signature.binds(&key) && !signature.is_expired() => {
                debug!(%key, "signature loaded from store");
                self.remember(key, signature.clone())?;
                return Ok(signature);
            }
            Ok(Some(_)) => debug!(%key, "stored signature does not match, replacing"),
            Ok(None) => {}
            Err(err) => warn!(%key, error = %err, "could not read signature store"),
        }

        let signature = service
            .issue_signature(key.contracts(), signer)
            .await
            .map_err(|e| match e {
                BillsError::Authorization(_) => e,
                other => BillsError::Authorization(other.to_string()),
            })?;

        if !signature.binds(&key) {
            return Err(BillsError::Authorization(
                "decryption service returned a signature for a different signer or contract set"
                    .into(),
            ));
        }

        if let Err(err) = self.store.save(&key, &signature).await {
            warn!(%key, error = %err, "could not persist signature");
        }
        info!(%key, "issued new decryption signature");
        self.remember(key, signature.clone())?;
        Ok(signature)
    }
}
