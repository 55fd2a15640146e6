//! Encryption CLI commands
//!
//! Seals the stored decryption signatures under a passphrase.

use clap::Subcommand;

use crate::config::{BillsPaths, Settings};
use crate::crypto::{
    derive_key, open_json, seal_json, DerivedKey, KeyDerivationParams, SealedData, SecureString,
};
use crate::error::{BillsError, BillsResult};

/// Environment variable read instead of prompting for the passphrase
pub const PASSPHRASE_ENV: &str = "PRIVATE_BILLS_PASSPHRASE";

const VERIFY_PLAINTEXT: &str = "private_bills_verify";

/// Encryption management commands
#[derive(Subcommand)]
pub enum EncryptCommands {
    /// Seal stored decryption signatures with a passphrase
    Enable,

    /// Show encryption status
    Status,

    /// Verify your passphrase is correct
    Verify,
}

/// Handle encryption commands
pub fn handle_encrypt_command(
    paths: &BillsPaths,
    settings: &mut Settings,
    cmd: EncryptCommands,
) -> BillsResult<()> {
    match cmd {
        EncryptCommands::Enable => enable_encryption(paths, settings),
        EncryptCommands::Status => show_status(settings),
        EncryptCommands::Verify => verify_passphrase(settings),
    }
}

fn enable_encryption(paths: &BillsPaths, settings: &mut Settings) -> BillsResult<()> {
    if settings.is_encryption_enabled() {
        println!("Encryption is already enabled.");
        return Ok(());
    }

    println!("Enable Encryption");
    println!("=================");
    println!();
    println!("Decryption signatures will be stored sealed with AES-256-GCM.");
    println!("Commands that decrypt values will ask for your passphrase.");
    println!();

    let passphrase = read_new_passphrase()?;
    let key_params = KeyDerivationParams::new();

    println!("Deriving encryption key...");
    let key = derive_key(&passphrase, &key_params)?;

    let verification = seal_json(&VERIFY_PLAINTEXT, &key)?;
    let verification_json = serde_json::to_string(&verification)
        .map_err(|e| BillsError::Encryption(format!("Failed to serialize verification: {}", e)))?;

    settings.encryption.enabled = true;
    settings.encryption.key_params = Some(key_params);
    settings.encryption.verification_hash = Some(verification_json);
    settings.save(paths)?;

    println!();
    println!("Encryption enabled successfully!");
    println!("New signatures are sealed; existing ones are resealed when replaced.");

    Ok(())
}

fn show_status(settings: &Settings) -> BillsResult<()> {
    println!("Encryption Status");
    println!("=================");
    println!();

    if settings.is_encryption_enabled() {
        println!("Status: ENABLED");
        if let Some(ref params) = settings.encryption.key_params {
            println!();
            println!("Key Derivation Parameters:");
            println!("  Algorithm: Argon2id");
            println!("  Memory Cost: {} KiB", params.memory_cost);
            println!("  Time Cost: {} iterations", params.time_cost);
            println!("  Parallelism: {} threads", params.parallelism);
        }
    } else {
        println!("Status: DISABLED");
        println!();
        println!("Decryption signatures are stored unencrypted.");
        println!("Run 'bills encrypt enable' to seal them.");
    }

    Ok(())
}

fn verify_passphrase(settings: &Settings) -> BillsResult<()> {
    if !settings.is_encryption_enabled() {
        println!("Encryption is not enabled.");
        return Ok(());
    }

    let passphrase = read_passphrase("Enter passphrase: ")?;
    match check_passphrase(settings, &passphrase) {
        Ok(_) => {
            println!("Passphrase is correct!");
            Ok(())
        }
        Err(err) => {
            println!("Passphrase is incorrect.");
            Err(err)
        }
    }
}

/// Derive the key and check it against the stored verification blob
fn check_passphrase(settings: &Settings, passphrase: &str) -> BillsResult<DerivedKey> {
    let key_params = settings
        .encryption
        .key_params
        .as_ref()
        .ok_or_else(|| BillsError::Encryption("No key parameters found".to_string()))?;
    let verification_json = settings
        .encryption
        .verification_hash
        .as_ref()
        .ok_or_else(|| BillsError::Encryption("No verification hash found".to_string()))?;

    let sealed: SealedData = serde_json::from_str(verification_json)
        .map_err(|e| BillsError::Encryption(format!("Invalid verification data: {}", e)))?;
    let key = derive_key(passphrase, key_params)?;

    match open_json::<String>(&sealed, &key) {
        Ok(text) if text == VERIFY_PLAINTEXT => Ok(key),
        _ => Err(BillsError::Encryption("Invalid passphrase".to_string())),
    }
}

/// Key sealing the signature store, from the environment or a prompt
pub fn unlock_key(settings: &Settings) -> BillsResult<DerivedKey> {
    let passphrase = read_passphrase("Signature store passphrase: ")?;
    check_passphrase(settings, &passphrase)
}

fn read_new_passphrase() -> BillsResult<SecureString> {
    if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
        return validate_new_passphrase(passphrase.into());
    }
    loop {
        let first = read_passphrase("Enter new passphrase: ")?;
        if first.len() < 8 {
            println!("Passphrase must be at least 8 characters. Please try again.");
            continue;
        }
        let second = read_passphrase("Confirm passphrase: ")?;
        if first.as_str() != second.as_str() {
            println!("Passphrases do not match. Please try again.");
            continue;
        }
        return Ok(first);
    }
}

fn validate_new_passphrase(passphrase: SecureString) -> BillsResult<SecureString> {
    if passphrase.len() < 8 {
        return Err(BillsError::validation(
            "Passphrase must be at least 8 characters",
        ));
    }
    Ok(passphrase)
}

fn read_passphrase(prompt: &str) -> BillsResult<SecureString> {
    if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
        return Ok(passphrase.into());
    }
    rpassword::prompt_password(prompt)
        .map(SecureString::from)
        .map_err(|e| BillsError::Encryption(format!("Failed to read passphrase: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealed_settings(passphrase: &str) -> Settings {
        let params = KeyDerivationParams::fast();
        let key = derive_key(passphrase, &params).unwrap();
        let mut settings = Settings::default();
        settings.encryption.enabled = true;
        settings.encryption.verification_hash = Some(
            serde_json::to_string(&seal_json(&VERIFY_PLAINTEXT, &key).unwrap()).unwrap(),
        );
        settings.encryption.key_params = Some(params);
        settings
    }

    #[test]
    fn test_check_passphrase() {
        let settings = sealed_settings("correct horse");
        assert!(check_passphrase(&settings, "correct horse").is_ok());
        assert!(check_passphrase(&settings, "wrong horse").is_err());
    }

    #[test]
    fn test_short_passphrase_rejected() {
        assert!(validate_new_passphrase(SecureString::new("short"))
            .unwrap_err()
            .is_validation());
        assert!(validate_new_passphrase(SecureString::new("long enough")).is_ok());
    }
}
