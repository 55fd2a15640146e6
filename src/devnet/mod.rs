//! Local development network
//!
//! An in-process stand-in for a chain with id 31337: it implements the
//! ledger contract, the decryption service and client-side encryption over
//! a state file (`devnet.json`). Values are sealed at rest, every update
//! yields a fresh handle, never-written aggregates read as the zero handle,
//! and decryption checks both the signature and each handle's access list.
//!
//! Calls to an address with no deployed contract return no data, the same
//! way a real node answers a call to an empty account.

pub mod state;

pub use state::DevnetState;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info};

use crate::crypto::random_bytes;
use crate::error::{BillsError, BillsResult};
use crate::fhe::{DecryptRequest, DecryptionService, EncryptedInput, EncryptedInputBuilder, InputEncryptor};
use crate::ledger::{AddRecordArgs, CallContext, CallError, LedgerContract, Receipt};
use crate::models::{
    now_seconds, Address, ClearScalar, DecryptionSignature, EncryptedHandle, RecordMeta,
    RecordSide, Tag, TxHash,
};
use crate::storage::{read_json, write_json_atomic};

use state::{Grant, UserLedger};

/// Chain name recorded for devnet deployments
pub const DEVNET_CHAIN_NAME: &str = "devnet";

/// Proof binding an input handle to (contract, caller)
fn input_proof(handle: &EncryptedHandle, contract: Address, caller: Address) -> Vec<u8> {
    let mut proof = Vec::with_capacity(72);
    proof.extend_from_slice(contract.as_bytes());
    proof.extend_from_slice(caller.as_bytes());
    proof.extend_from_slice(handle.as_bytes());
    proof
}

fn transport(err: BillsError) -> CallError {
    CallError::Transport(err.to_string())
}

pub struct Devnet {
    path: Option<PathBuf>,
    state: Mutex<DevnetState>,
    signature_duration_days: u32,
}

impl Devnet {
    /// Open (or create) the devnet stored at `path`
    pub fn open(path: &Path, signature_duration_days: u32) -> BillsResult<Self> {
        let state: DevnetState = read_json(path)?;
        debug!(path = %path.display(), contracts = state.contracts.len(), "devnet opened");
        Ok(Self {
            path: Some(path.to_path_buf()),
            state: Mutex::new(state),
            signature_duration_days,
        })
    }

    /// A devnet that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(DevnetState::default()),
            signature_duration_days: 1,
        }
    }

    fn lock(&self) -> BillsResult<MutexGuard<'_, DevnetState>> {
        self.state
            .lock()
            .map_err(|e| BillsError::Storage(format!("Devnet lock poisoned: {}", e)))
    }

    fn persist(&self, state: &DevnetState) -> BillsResult<()> {
        match &self.path {
            Some(path) => write_json_atomic(path, state),
            None => Ok(()),
        }
    }

    /// Deploy a new ledger contract
    pub fn deploy(&self) -> BillsResult<Address> {
        let mut state = self.lock()?;
        let address = state.deploy();
        self.persist(&state)?;
        info!(%address, "ledger contract deployed on devnet");
        Ok(address)
    }

    pub fn is_deployed(&self, contract: &Address) -> BillsResult<bool> {
        Ok(self.lock()?.contracts.contains_key(contract))
    }

    /// Read from one user's ledger in a deployed contract
    fn read<T>(
        &self,
        ctx: CallContext,
        answer: impl FnOnce(&UserLedger) -> Result<T, CallError>,
    ) -> Result<T, CallError> {
        let state = self.lock().map_err(transport)?;
        let contract = state
            .contracts
            .get(&ctx.contract)
            .ok_or(CallError::EmptyReturn)?;
        let empty = UserLedger::default();
        answer(contract.users.get(&ctx.from).unwrap_or(&empty))
    }

    fn read_handle(
        &self,
        ctx: CallContext,
        handle: impl FnOnce(&UserLedger) -> Option<EncryptedHandle>,
    ) -> Result<EncryptedHandle, CallError> {
        self.read(ctx, |ledger| Ok(handle(ledger).unwrap_or(EncryptedHandle::ZERO)))
    }

    fn check_input(
        state: &DevnetState,
        ctx: CallContext,
        args: &AddRecordArgs,
    ) -> Result<(), CallError> {
        let ciphertext = state
            .ciphertexts
            .get(&args.encrypted_amount)
            .ok_or_else(|| CallError::Reverted("unknown input handle".into()))?;
        if !ciphertext.allows(ctx.contract, ctx.from)
            || args.input_proof != input_proof(&args.encrypted_amount, ctx.contract, ctx.from)
        {
            return Err(CallError::Reverted("invalid input proof".into()));
        }
        let side = RecordSide::from_is_income(args.is_income);
        Tag::for_side(side, &args.tag).map_err(|e| CallError::Reverted(e.to_string()))?;
        crate::models::MonthKey::new(args.month_key)
            .map_err(|e| CallError::Reverted(e.to_string()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl LedgerContract for Devnet {
    async fn add_record(&self, ctx: CallContext, args: AddRecordArgs) -> Result<TxHash, CallError> {
        let mut state = self.lock().map_err(transport)?;
        if !state.contracts.contains_key(&ctx.contract) {
            return Err(CallError::EmptyReturn);
        }
        Self::check_input(&state, ctx, &args)?;

        let amount = state.open(&args.encrypted_amount).map_err(transport)?;
        let meta = RecordMeta {
            is_income: args.is_income,
            timestamp: args.timestamp,
            tag: args.tag,
            month_key: args.month_key,
        };
        state
            .add_record(ctx.contract, ctx.from, amount, meta)
            .map_err(transport)?;
        let tx = state.mine(true);
        self.persist(&state).map_err(transport)?;
        debug!(%tx, block = state.block_number, "addRecord mined");
        Ok(tx)
    }

    async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt, CallError> {
        let state = self.lock().map_err(transport)?;
        let mined = state
            .transactions
            .get(&tx)
            .ok_or_else(|| CallError::Transport(format!("transaction {} not found", tx.short())))?;
        Ok(Receipt {
            tx_hash: tx,
            block_number: mined.block_number,
            success: mined.success,
        })
    }

    async fn get_my_balance(&self, ctx: CallContext) -> Result<EncryptedHandle, CallError> {
        self.read_handle(ctx, |ledger| ledger.balance)
    }

    async fn get_my_monthly_net(
        &self,
        ctx: CallContext,
        month_key: u32,
    ) -> Result<EncryptedHandle, CallError> {
        self.read_handle(ctx, |ledger| ledger.monthly_net.get(&month_key).copied())
    }

    async fn get_my_monthly_expense_by_tag(
        &self,
        ctx: CallContext,
        month_key: u32,
        tag: &str,
    ) -> Result<EncryptedHandle, CallError> {
        self.read_handle(ctx, |ledger| ledger.by_tag(RecordSide::Expense, month_key, tag))
    }

    async fn get_my_monthly_income_by_tag(
        &self,
        ctx: CallContext,
        month_key: u32,
        tag: &str,
    ) -> Result<EncryptedHandle, CallError> {
        self.read_handle(ctx, |ledger| ledger.by_tag(RecordSide::Income, month_key, tag))
    }

    async fn get_my_record_count(&self, ctx: CallContext) -> Result<u64, CallError> {
        self.read(ctx, |ledger| Ok(ledger.records.len() as u64))
    }

    async fn get_my_record_amount(
        &self,
        ctx: CallContext,
        index: u64,
    ) -> Result<EncryptedHandle, CallError> {
        self.read(ctx, |ledger| {
            usize::try_from(index)
                .ok()
                .and_then(|i| ledger.records.get(i))
                .map(|record| record.amount)
                .ok_or_else(|| CallError::Reverted("record index out of range".into()))
        })
    }

    async fn get_my_record_meta(&self, ctx: CallContext, index: u64) -> Result<RecordMeta, CallError> {
        self.read(ctx, |ledger| {
            usize::try_from(index)
                .ok()
                .and_then(|i| ledger.records.get(i))
                .map(|record| record.meta.clone())
                .ok_or_else(|| CallError::Reverted("record index out of range".into()))
        })
    }
}

#[async_trait::async_trait]
impl DecryptionService for Devnet {
    async fn issue_signature(
        &self,
        contracts: &[Address],
        signer: Address,
    ) -> BillsResult<DecryptionSignature> {
        let mut state = self.lock()?;
        if let Some(missing) = contracts.iter().find(|c| !state.contracts.contains_key(*c)) {
            return Err(BillsError::Authorization(format!(
                "no contract deployed at {}",
                missing
            )));
        }

        let public_key = hex::encode(random_bytes::<32>());
        let signature = format!("0x{}", hex::encode(random_bytes::<65>()));
        state.grants.insert(
            signature.clone(),
            Grant {
                user: signer,
                contracts: contracts.to_vec(),
                public_key: public_key.clone(),
            },
        );
        self.persist(&state)?;

        Ok(DecryptionSignature {
            private_key: hex::encode(random_bytes::<32>()),
            public_key,
            signature,
            contract_addresses: contracts.to_vec(),
            user_address: signer,
            start_timestamp: now_seconds(),
            duration_days: self.signature_duration_days,
        })
    }

    async fn user_decrypt(
        &self,
        requests: &[DecryptRequest],
        signature: &DecryptionSignature,
    ) -> BillsResult<HashMap<EncryptedHandle, ClearScalar>> {
        let state = self.lock()?;
        if signature.is_expired() {
            return Err(BillsError::Call("decryption signature expired".into()));
        }
        let grant = state
            .grants
            .get(&signature.signature)
            .filter(|grant| {
                grant.user == signature.user_address
                    && grant.contracts == signature.contract_addresses
                    && grant.public_key == signature.public_key
            })
            .ok_or_else(|| BillsError::Call("invalid decryption signature".into()))?;

        let mut results = HashMap::with_capacity(requests.len());
        for request in requests {
            let allowed = grant.contracts.contains(&request.contract)
                && state
                    .ciphertexts
                    .get(&request.handle)
                    .is_some_and(|c| c.allows(request.contract, grant.user));
            if !allowed {
                return Err(BillsError::Call(format!(
                    "{} is not authorized to decrypt handle {}",
                    grant.user.short(),
                    request.handle.short()
                )));
            }
            let value = state
                .open(&request.handle)
                .map_err(|e| BillsError::Call(e.to_string()))?;
            results.insert(request.handle, ClearScalar::Uint(value));
        }
        Ok(results)
    }
}

#[async_trait::async_trait]
impl InputEncryptor for Devnet {
    async fn encrypt(&self, input: EncryptedInputBuilder) -> BillsResult<EncryptedInput> {
        let mut state = self.lock()?;
        let mut handles = Vec::with_capacity(input.values().len());
        let mut input_proof_bytes = Vec::new();
        for value in input.values() {
            let handle = state.seal(*value, input.contract(), input.caller())?;
            input_proof_bytes = input_proof(&handle, input.contract(), input.caller());
            handles.push(handle);
        }
        self.persist(&state)?;
        Ok(EncryptedInput {
            handles,
            input_proof: input_proof_bytes,
        })
    }
}
