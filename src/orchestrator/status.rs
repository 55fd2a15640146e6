//! Query phases, request outcomes and the user-facing status line

use std::fmt;

use crate::ledger::Receipt;
use crate::models::TxHash;

/// Lifecycle of one logical query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryPhase {
    /// Never fetched in this session
    #[default]
    Idle,
    Fetching,
    /// A handle is present, no fresh clear value
    Handled,
    Decrypting,
    /// A clear value fresh for the current handle is present
    Decrypted,
    /// The last decryption attempt failed
    Failed,
}

impl fmt::Display for QueryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Handled => "encrypted",
            Self::Decrypting => "decrypting",
            Self::Decrypted => "decrypted",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Severity of a status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    /// Recoverable condition the user should act on (redeploy, switch network)
    Advisory,
    Error,
}

/// The single observable message describing the last transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            text: text.into(),
        }
    }

    pub fn advisory(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Advisory,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Error,
            text: text.into(),
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Result of a handle refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Handles committed; `advisories` lists operations that were unavailable
    Fetched { count: usize, advisories: Vec<String> },
    /// Another fetch is in flight
    Busy,
    /// Nothing deployed on the active chain, or no signer
    Unavailable,
    /// The session changed mid-flight; nothing was committed
    Stale,
    /// The ledger call failed; nothing was committed
    Failed(String),
}

/// Result of a decryption request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptOutcome {
    /// Clear values committed for `count` queries
    Decrypted { count: usize },
    /// None of the queries has a handle to decrypt
    NoHandles,
    /// A fetch or another decryption is in flight
    Busy,
    Unavailable,
    Stale,
    Failed(String),
}

/// Result of a record submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Final on the ledger; `cascade` is the follow-up refresh
    Confirmed {
        tx_hash: TxHash,
        receipt: Receipt,
        cascade: FetchOutcome,
    },
    /// A submission or a fetch is in flight
    Busy,
    Unavailable,
    /// Encryption, submission or confirmation failed; caches untouched
    Failed(String),
}
