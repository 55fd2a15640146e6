//! Path management for PrivateBills
//!
//! ## Path Resolution Order
//!
//! 1. `PRIVATE_BILLS_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/private-bills` or `~/.config/private-bills`
//! 3. Windows: `%APPDATA%\private-bills`

use std::path::PathBuf;

use crate::error::{BillsError, BillsResult};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "PRIVATE_BILLS_DATA_DIR";

/// Manages all paths used by PrivateBills
#[derive(Debug, Clone)]
pub struct BillsPaths {
    base_dir: PathBuf,
}

impl BillsPaths {
    /// Resolve the base directory from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> BillsResult<Self> {
        let base_dir = match std::env::var(DATA_DIR_ENV) {
            Ok(custom) if !custom.is_empty() => PathBuf::from(custom),
            _ => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Use an explicit base directory (tests, `--data-dir`)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// The base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Contract addresses per chain
    pub fn deployments_file(&self) -> PathBuf {
        self.base_dir.join("deployments.json")
    }

    /// Persisted decryption signatures
    pub fn signatures_file(&self) -> PathBuf {
        self.base_dir.join("signatures.json")
    }

    /// State of the local development network
    pub fn devnet_file(&self) -> PathBuf {
        self.base_dir.join("devnet.json")
    }

    /// Append-only submission audit log
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    /// Ensure the base directory exists
    pub fn ensure_directories(&self) -> BillsResult<()> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| BillsError::Io(format!("Failed to create base directory: {}", e)))
    }

    /// Check if PrivateBills has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

#[cfg(not(windows))]
fn resolve_default_path() -> BillsResult<PathBuf> {
    let config_base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg),
        _ => {
            let home = std::env::var("HOME").map_err(|_| {
                BillsError::Config("HOME environment variable not set".into())
            })?;
            PathBuf::from(home).join(".config")
        }
    };
    Ok(config_base.join("private-bills"))
}

#[cfg(windows)]
fn resolve_default_path() -> BillsResult<PathBuf> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| BillsError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("private-bills"))
}
