//! Decryption signature cache and persistence

pub mod cache;
pub mod store;

pub use cache::SignatureCache;
pub use store::{InMemorySignatureStore, JsonFileSignatureStore, SignatureStore};
