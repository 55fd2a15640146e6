//! Core data models for PrivateBills
//!
//! Opaque identifiers (addresses, handles, transaction hashes), the logical
//! queries the client asks the ledger, decryption signatures, clear values
//! and records.

pub mod bytes;
pub mod clear;
pub mod ids;
pub mod month;
pub mod query;
pub mod record;
pub mod signature;
pub mod tag;

pub use bytes::{Address, EncryptedHandle, TxHash};
pub use clear::{ClearScalar, ClearValue};
pub use ids::{RequestId, SubmissionId};
pub use month::MonthKey;
pub use query::LogicalQuery;
pub use record::{NewRecord, RecordEntry, RecordMeta};
pub use signature::{now_seconds, DecryptionSignature, SignatureKey};
pub use tag::{RecordSide, Tag, EXPENSE_TAGS, INCOME_TAGS};
