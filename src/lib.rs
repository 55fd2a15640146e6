//! PrivateBills - encrypted on-chain bills ledger client
//!
//! This library provides the client side of PrivateBills: a ledger contract
//! that stores income and expense amounts only as encrypted handles, and a
//! decryption service that turns handles back into numbers for their owner.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Handles, month keys, tags, queries and records
//! - `ledger`: Ledger contract seam and the facade over it
//! - `fhe`: Decryption service and input encryption seams
//! - `signature`: Decryption signature cache and stores
//! - `handles`: Handle store and clear value cache
//! - `orchestrator`: Fetch and decryption state machine
//! - `pipeline`: Record submission and the refresh that follows it
//! - `reports`: Tag breakdowns and monthly summaries
//! - `devnet`: In-process development network
//! - `audit`: Audit log of record submissions
//!
//! # Example
//!
//! ```rust,ignore
//! use private_bills::cli::{Session, Signatures};
//! use private_bills::config::BillsPaths;
//! use private_bills::models::LogicalQuery;
//!
//! let session = Session::open(BillsPaths::new()?, Signatures::Needed)?;
//! session.orchestrator().refresh(&[LogicalQuery::Balance]).await?;
//! session.orchestrator().decrypt(&[LogicalQuery::Balance]).await?;
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod deployment;
pub mod devnet;
pub mod display;
pub mod error;
pub mod fhe;
pub mod handles;
pub mod ledger;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod reports;
pub mod signature;
pub mod storage;

#[cfg(test)]
mod testing;

pub use error::BillsError;
