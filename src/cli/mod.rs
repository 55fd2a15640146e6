//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the orchestrator and pipeline.

pub mod account;
pub mod encrypt;
pub mod history;
pub mod ledger;
pub mod network;
pub mod record;
pub mod report;
pub mod session;

pub use account::{handle_account_command, AccountCommands};
pub use encrypt::{handle_encrypt_command, EncryptCommands};
pub use history::handle_history;
pub use ledger::{handle_balance, handle_monthly};
pub use network::{handle_deploy, handle_network_command, NetworkCommands};
pub use record::{handle_record_command, handle_tags, RecordCommands};
pub use report::{handle_report_command, ReportCommands};
pub use session::{Session, Signatures};
