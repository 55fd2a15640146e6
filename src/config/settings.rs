//! User settings for PrivateBills
//!
//! The active network and signer, how long decryption signatures stay valid,
//! and whether the signature store is sealed at rest.

use serde::{Deserialize, Serialize};

use super::paths::BillsPaths;
use crate::crypto::key_derivation::KeyDerivationParams;
use crate::error::{BillsError, BillsResult};
use crate::models::Address;

/// Chain id of the local development network
pub const DEVNET_CHAIN_ID: u64 = 31337;

/// Signature store sealing settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EncryptionSettings {
    /// Whether the signature store is sealed
    #[serde(default)]
    pub enabled: bool,

    /// Key derivation parameters (salt, memory cost, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_params: Option<KeyDerivationParams>,

    /// A known plaintext sealed with the key, used to check the passphrase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_hash: Option<String>,
}

/// User settings for PrivateBills
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Active network
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Active signer; nothing identity-bound can run without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<Address>,

    /// Validity window requested for new decryption signatures
    #[serde(default = "default_signature_duration_days")]
    pub signature_duration_days: u32,

    /// Signature store sealing
    #[serde(default)]
    pub encryption: EncryptionSettings,

    /// Currency symbol used when printing amounts
    #[serde(default = "default_currency")]
    pub currency_symbol: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_chain_id() -> u64 {
    DEVNET_CHAIN_ID
}

fn default_signature_duration_days() -> u32 {
    365
}

fn default_currency() -> String {
    "$".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            chain_id: default_chain_id(),
            signer: None,
            signature_duration_days: default_signature_duration_days(),
            encryption: EncryptionSettings::default(),
            currency_symbol: default_currency(),
        }
    }
}

impl Settings {
    /// Whether the signature store is sealed
    pub fn is_encryption_enabled(&self) -> bool {
        self.encryption.enabled
    }

    /// Load settings from disk, or defaults if the file doesn't exist
    pub fn load_or_create(paths: &BillsPaths) -> BillsResult<Self> {
        let settings_path = paths.settings_file();

        if !settings_path.exists() {
            return Ok(Settings::default());
        }

        let contents = std::fs::read_to_string(&settings_path)
            .map_err(|e| BillsError::Io(format!("Failed to read settings file: {}", e)))?;

        let settings: Settings = serde_json::from_str(&contents)
            .map_err(|e| BillsError::Config(format!("Failed to parse settings file: {}", e)))?;

        if settings.signature_duration_days == 0 {
            return Err(BillsError::Config(
                "signature_duration_days must be at least 1".into(),
            ));
        }

        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self, paths: &BillsPaths) -> BillsResult<()> {
        paths.ensure_directories()?;
        crate::storage::write_json_atomic(paths.settings_file(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.chain_id, 31337);
        assert_eq!(settings.signer, None);
        assert_eq!(settings.signature_duration_days, 365);
        assert!(!settings.is_encryption_enabled());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let paths = BillsPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.chain_id = 11155111;
        settings.signer = Some(Address::from_bytes([7; 20]));
        settings.save(&paths).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.chain_id, 11155111);
        assert_eq!(loaded.signer, Some(Address::from_bytes([7; 20])));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"chain_id": 1}"#).unwrap();
        assert_eq!(settings.chain_id, 1);
        assert_eq!(settings.signature_duration_days, 365);
        assert_eq!(settings.currency_symbol, "$");
    }

    #[test]
    fn test_zero_duration_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let paths = BillsPaths::with_base_dir(temp_dir.path().to_path_buf());
        std::fs::write(paths.settings_file(), r#"{"signature_duration_days": 0}"#).unwrap();

        assert!(Settings::load_or_create(&paths).is_err());
    }
}
