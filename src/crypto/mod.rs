//! At-rest cryptography
//!
//! AES-256-GCM sealing with Argon2id key derivation. Used to protect the
//! signature store (decryption signatures carry an ephemeral private key) and
//! to seal the local development network's stored values.
//!
//! This is not the homomorphic scheme; that lives behind the `fhe` traits.

pub mod encryption;
pub mod key_derivation;
pub mod secure_memory;

pub use encryption::{open, open_json, open_u64, seal, seal_json, seal_u64, SealedData};
pub use key_derivation::{derive_key, random_bytes, DerivedKey, KeyDerivationParams};
pub use secure_memory::SecureString;
