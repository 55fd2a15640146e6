//! Ledger access
//!
//! `contract` is the raw RPC-style surface of the deployed PrivateBills
//! contract; `facade` is the typed layer the rest of the crate talks to.

pub mod contract;
pub mod facade;

pub use contract::{AddRecordArgs, CallContext, CallError, LedgerContract, Receipt};
pub use facade::{unavailable_advisory, Fetched, LedgerFacade};
