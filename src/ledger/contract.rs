//! The remote ledger's contract surface
//!
//! Arguments here are wire-level (`u32` month keys, tag strings); the facade
//! is responsible for only ever passing validated values.

use thiserror::Error;

use crate::models::{Address, EncryptedHandle, RecordMeta, TxHash};

/// Who is calling which contract
///
/// Identity-dependent reads are simulated through the signer, so `from` is
/// always the signer, never an anonymous caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub contract: Address,
    pub from: Address,
}

/// Failure of a single contract call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The call returned no data: nothing deployed at the address, or the
    /// deployed code lacks the operation
    #[error("could not decode result data (empty return)")]
    EmptyReturn,

    /// The contract rejected the call
    #[error("execution reverted: {0}")]
    Reverted(String),

    /// Network or node failure
    #[error("{0}")]
    Transport(String),
}

/// Arguments of `addRecord`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddRecordArgs {
    pub encrypted_amount: EncryptedHandle,
    pub input_proof: Vec<u8>,
    pub is_income: bool,
    pub timestamp: u64,
    pub tag: String,
    pub month_key: u32,
}

/// Outcome of a mined transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// `false` if the transaction was mined but reverted
    pub success: bool,
}

#[async_trait::async_trait]
pub trait LedgerContract: Send + Sync {
    async fn add_record(&self, ctx: CallContext, args: AddRecordArgs) -> Result<TxHash, CallError>;

    /// Wait until the transaction is final
    async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt, CallError>;

    async fn get_my_balance(&self, ctx: CallContext) -> Result<EncryptedHandle, CallError>;

    async fn get_my_monthly_net(
        &self,
        ctx: CallContext,
        month_key: u32,
    ) -> Result<EncryptedHandle, CallError>;

    async fn get_my_monthly_expense_by_tag(
        &self,
        ctx: CallContext,
        month_key: u32,
        tag: &str,
    ) -> Result<EncryptedHandle, CallError>;

    async fn get_my_monthly_income_by_tag(
        &self,
        ctx: CallContext,
        month_key: u32,
        tag: &str,
    ) -> Result<EncryptedHandle, CallError>;

    async fn get_my_record_count(&self, ctx: CallContext) -> Result<u64, CallError>;

    async fn get_my_record_amount(
        &self,
        ctx: CallContext,
        index: u64,
    ) -> Result<EncryptedHandle, CallError>;

    async fn get_my_record_meta(&self, ctx: CallContext, index: u64)
        -> Result<RecordMeta, CallError>;
}
