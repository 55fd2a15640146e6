//! Configuration module for PrivateBills
//!
//! - XDG-compliant path resolution
//! - User settings persistence (active network, signer, signature policy)

pub mod paths;
pub mod settings;

pub use paths::BillsPaths;
pub use settings::{EncryptionSettings, Settings, DEVNET_CHAIN_ID};
