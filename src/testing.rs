//! Test doubles for the ledger, decryption and encryption seams
//!
//! Each fake counts its calls and can hold its next call in flight behind a
//! [`Gate`], so tests can interleave a session switch with a pending request.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Semaphore;

use crate::error::{BillsError, BillsResult};
use crate::fhe::{DecryptRequest, DecryptionService, EncryptedInput, EncryptedInputBuilder, InputEncryptor};
use crate::ledger::{AddRecordArgs, CallContext, CallError, LedgerContract, Receipt};
use crate::models::{
    now_seconds, Address, ClearScalar, DecryptionSignature, EncryptedHandle, LogicalQuery,
    MonthKey, RecordMeta, RecordSide, Tag, TxHash,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

/// Handle with `n` in its first eight bytes
pub fn numbered_handle(n: u64) -> EncryptedHandle {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&n.to_be_bytes());
    bytes[31] = 0x5a;
    EncryptedHandle::from_bytes(bytes)
}

/// Holds one call until the test opens it
///
/// Both sides are zero-permit semaphores; a permit added before the other
/// side waits is kept, so `open` may come before the call arrives.
#[derive(Clone)]
pub struct Gate {
    entered: Arc<Semaphore>,
    release: Arc<Semaphore>,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            entered: Arc::new(Semaphore::new(0)),
            release: Arc::new(Semaphore::new(0)),
        }
    }
}

impl Gate {
    async fn pass(&self) {
        self.entered.add_permits(1);
        self.release.acquire().await.unwrap().forget();
    }

    /// Wait until the held call has reached the gate
    pub async fn entered(&self) {
        self.entered.acquire().await.unwrap().forget();
    }

    /// Let the held call continue
    pub fn open(&self) {
        self.release.add_permits(1);
    }
}

#[derive(Default)]
struct LedgerState {
    handles: HashMap<LogicalQuery, EncryptedHandle>,
    records: Vec<RecordMeta>,
    unavailable: HashSet<String>,
    read_failure: Option<CallError>,
    add_failure: Option<CallError>,
    receipt_failure: Option<CallError>,
    revert_next: bool,
    read_gate: Option<Gate>,
    receipt_gate: Option<Gate>,
    reads: usize,
    added: Vec<(CallContext, AddRecordArgs)>,
    next_handle: u64,
}

/// In-memory ledger contract
///
/// Unset aggregates read as the zero handle. `add_record` behaves like the
/// real ledger: it appends a record and moves every aggregate the record
/// touches to a fresh handle.
#[derive(Clone)]
pub struct FakeLedger {
    address: Address,
    state: Arc<Mutex<LedgerState>>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self {
            address: Address::from_bytes([0xc0; 20]),
            state: Arc::new(Mutex::new(LedgerState {
                next_handle: 1_000,
                ..LedgerState::default()
            })),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn into_contract(self) -> Arc<dyn LedgerContract> {
        Arc::new(self)
    }

    pub fn set_handle(&self, query: &LogicalQuery, handle: EncryptedHandle) {
        lock(&self.state).handles.insert(query.clone(), handle);
    }

    /// Append a stored record with its amount handle
    pub fn push_record(&self, meta: RecordMeta, amount: EncryptedHandle) {
        let mut state = lock(&self.state);
        let index = state.records.len() as u64;
        state.records.push(meta);
        state
            .handles
            .insert(LogicalQuery::RecordAmount { index }, amount);
    }

    /// Every call of `operation` returns no data from now on
    pub fn make_unavailable(&self, operation: &str) {
        lock(&self.state).unavailable.insert(operation.to_string());
    }

    /// Every read fails with `err` from now on
    pub fn fail_with(&self, err: CallError) {
        lock(&self.state).read_failure = Some(err);
    }

    pub fn fail_add_with(&self, err: CallError) {
        lock(&self.state).add_failure = Some(err);
    }

    pub fn fail_receipt_with(&self, err: CallError) {
        lock(&self.state).receipt_failure = Some(err);
    }

    pub fn revert_next_receipt(&self) {
        lock(&self.state).revert_next = true;
    }

    /// Hold the next read until the returned gate is opened
    pub fn hold_next_read(&self) -> Gate {
        let gate = Gate::default();
        lock(&self.state).read_gate = Some(gate.clone());
        gate
    }

    /// Hold the next receipt wait until the returned gate is opened
    pub fn hold_next_receipt(&self) -> Gate {
        let gate = Gate::default();
        lock(&self.state).receipt_gate = Some(gate.clone());
        gate
    }

    /// Number of handle, count and meta reads so far
    pub fn read_count(&self) -> usize {
        lock(&self.state).reads
    }

    /// Submitted `addRecord` calls
    pub fn added(&self) -> Vec<(CallContext, AddRecordArgs)> {
        lock(&self.state).added.clone()
    }

    pub fn handle(&self, query: &LogicalQuery) -> EncryptedHandle {
        lock(&self.state)
            .handles
            .get(query)
            .copied()
            .unwrap_or(EncryptedHandle::ZERO)
    }

    async fn read<T>(
        &self,
        operation: &str,
        answer: impl FnOnce(&LedgerState) -> T,
    ) -> Result<T, CallError> {
        let gate = {
            let mut state = lock(&self.state);
            state.reads += 1;
            state.read_gate.take()
        };
        if let Some(gate) = gate {
            gate.pass().await;
        }

        let state = lock(&self.state);
        if let Some(err) = &state.read_failure {
            return Err(err.clone());
        }
        if state.unavailable.contains(operation) {
            return Err(CallError::EmptyReturn);
        }
        Ok(answer(&state))
    }

    async fn read_handle(
        &self,
        operation: &str,
        query: Option<LogicalQuery>,
    ) -> Result<EncryptedHandle, CallError> {
        self.read(operation, |state| {
            query
                .and_then(|q| state.handles.get(&q).copied())
                .unwrap_or(EncryptedHandle::ZERO)
        })
        .await
    }
}

#[async_trait::async_trait]
impl LedgerContract for FakeLedger {
    async fn add_record(&self, ctx: CallContext, args: AddRecordArgs) -> Result<TxHash, CallError> {
        let mut state = lock(&self.state);
        if let Some(err) = &state.add_failure {
            return Err(err.clone());
        }
        state.added.push((ctx, args.clone()));

        let side = RecordSide::from_is_income(args.is_income);
        let mut touched = vec![LogicalQuery::Balance];
        if let Ok(month) = MonthKey::new(args.month_key) {
            touched.push(LogicalQuery::MonthlyNet { month });
            touched.push(LogicalQuery::by_tag(side, month, Tag::from_ledger(args.tag.clone())));
        }
        let index = state.records.len() as u64;
        touched.push(LogicalQuery::RecordAmount { index });
        state.records.push(RecordMeta {
            is_income: args.is_income,
            timestamp: args.timestamp,
            tag: args.tag,
            month_key: args.month_key,
        });
        for query in touched {
            state.next_handle += 1;
            let handle = numbered_handle(state.next_handle);
            state.handles.insert(query, handle);
        }

        Ok(TxHash::from_bytes([state.added.len() as u8; 32]))
    }

    async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt, CallError> {
        let gate = lock(&self.state).receipt_gate.take();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        let mut state = lock(&self.state);
        if let Some(err) = &state.receipt_failure {
            return Err(err.clone());
        }
        let success = !std::mem::take(&mut state.revert_next);
        Ok(Receipt {
            tx_hash: tx,
            block_number: state.added.len() as u64,
            success,
        })
    }

    async fn get_my_balance(&self, _ctx: CallContext) -> Result<EncryptedHandle, CallError> {
        self.read_handle("getMyBalance", Some(LogicalQuery::Balance))
            .await
    }

    async fn get_my_monthly_net(
        &self,
        _ctx: CallContext,
        month_key: u32,
    ) -> Result<EncryptedHandle, CallError> {
        let query = MonthKey::new(month_key)
            .ok()
            .map(|month| LogicalQuery::MonthlyNet { month });
        self.read_handle("getMyMonthlyNet", query).await
    }

    async fn get_my_monthly_expense_by_tag(
        &self,
        _ctx: CallContext,
        month_key: u32,
        tag: &str,
    ) -> Result<EncryptedHandle, CallError> {
        let query = MonthKey::new(month_key).ok().map(|month| LogicalQuery::ExpenseByTag {
            month,
            tag: Tag::from_ledger(tag),
        });
        self.read_handle("getMyMonthlyExpenseByTag", query).await
    }

    async fn get_my_monthly_income_by_tag(
        &self,
        _ctx: CallContext,
        month_key: u32,
        tag: &str,
    ) -> Result<EncryptedHandle, CallError> {
        let query = MonthKey::new(month_key).ok().map(|month| LogicalQuery::IncomeByTag {
            month,
            tag: Tag::from_ledger(tag),
        });
        self.read_handle("getMyMonthlyIncomeByTag", query).await
    }

    async fn get_my_record_count(&self, _ctx: CallContext) -> Result<u64, CallError> {
        self.read("getMyRecordCount", |state| state.records.len() as u64)
            .await
    }

    async fn get_my_record_amount(
        &self,
        _ctx: CallContext,
        index: u64,
    ) -> Result<EncryptedHandle, CallError> {
        self.read_handle("getMyRecordAmount", Some(LogicalQuery::RecordAmount { index }))
            .await
    }

    async fn get_my_record_meta(
        &self,
        _ctx: CallContext,
        index: u64,
    ) -> Result<RecordMeta, CallError> {
        let meta = self
            .read("getMyRecordMeta", |state| {
                usize::try_from(index)
                    .ok()
                    .and_then(|i| state.records.get(i).cloned())
            })
            .await?;
        meta.ok_or_else(|| CallError::Reverted("record index out of range".into()))
    }
}

#[derive(Default)]
struct ServiceState {
    values: HashMap<EncryptedHandle, ClearScalar>,
    omitted: HashSet<EncryptedHandle>,
    signature_failure: Option<String>,
    decrypt_failure: Option<String>,
    signature_gate: Option<Gate>,
    decrypt_gate: Option<Gate>,
    issued: usize,
    batches: Vec<Vec<DecryptRequest>>,
}

/// In-memory decryption service
///
/// Handles without a configured value decrypt to 0.
#[derive(Clone, Default)]
pub struct FakeDecryptionService {
    state: Arc<Mutex<ServiceState>>,
}

impl FakeDecryptionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&self, handle: EncryptedHandle, value: ClearScalar) {
        lock(&self.state).values.insert(handle, value);
    }

    /// Leave `handle` out of every result map
    pub fn omit_result(&self, handle: EncryptedHandle) {
        lock(&self.state).omitted.insert(handle);
    }

    pub fn fail_signatures(&self, message: &str) {
        lock(&self.state).signature_failure = Some(message.to_string());
    }

    pub fn fail_decrypt(&self, message: &str) {
        lock(&self.state).decrypt_failure = Some(message.to_string());
    }

    pub fn hold_next_signature(&self) -> Gate {
        let gate = Gate::default();
        lock(&self.state).signature_gate = Some(gate.clone());
        gate
    }

    pub fn hold_next_decrypt(&self) -> Gate {
        let gate = Gate::default();
        lock(&self.state).decrypt_gate = Some(gate.clone());
        gate
    }

    pub fn issue_count(&self) -> usize {
        lock(&self.state).issued
    }

    pub fn decrypt_count(&self) -> usize {
        lock(&self.state).batches.len()
    }

    /// Requests of every `user_decrypt` call, in call order
    pub fn batches(&self) -> Vec<Vec<DecryptRequest>> {
        lock(&self.state).batches.clone()
    }
}

#[async_trait::async_trait]
impl DecryptionService for FakeDecryptionService {
    async fn issue_signature(
        &self,
        contracts: &[Address],
        signer: Address,
    ) -> BillsResult<DecryptionSignature> {
        let gate = {
            let mut state = lock(&self.state);
            state.issued += 1;
            state.signature_gate.take()
        };
        if let Some(gate) = gate {
            gate.pass().await;
        }

        let state = lock(&self.state);
        if let Some(message) = &state.signature_failure {
            return Err(BillsError::Authorization(message.clone()));
        }
        Ok(DecryptionSignature {
            private_key: format!("private-{}", state.issued),
            public_key: format!("public-{}", state.issued),
            signature: format!("sig-{}", state.issued),
            contract_addresses: contracts.to_vec(),
            user_address: signer,
            start_timestamp: now_seconds(),
            duration_days: 1,
        })
    }

    async fn user_decrypt(
        &self,
        requests: &[DecryptRequest],
        _signature: &DecryptionSignature,
    ) -> BillsResult<HashMap<EncryptedHandle, ClearScalar>> {
        let gate = {
            let mut state = lock(&self.state);
            state.batches.push(requests.to_vec());
            state.decrypt_gate.take()
        };
        if let Some(gate) = gate {
            gate.pass().await;
        }

        let state = lock(&self.state);
        if let Some(message) = &state.decrypt_failure {
            return Err(BillsError::Call(message.clone()));
        }
        Ok(requests
            .iter()
            .filter(|request| !state.omitted.contains(&request.handle))
            .map(|request| {
                let value = state
                    .values
                    .get(&request.handle)
                    .copied()
                    .unwrap_or(ClearScalar::Uint(0));
                (request.handle, value)
            })
            .collect())
    }
}

#[derive(Default)]
struct EncryptorState {
    failure: Option<String>,
    inputs: Vec<EncryptedInputBuilder>,
}

/// Client-side encryptor producing numbered handles
#[derive(Clone, Default)]
pub struct FakeEncryptor {
    state: Arc<Mutex<EncryptorState>>,
}

impl FakeEncryptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, message: &str) {
        lock(&self.state).failure = Some(message.to_string());
    }

    /// Inputs passed to `encrypt`, in call order
    pub fn inputs(&self) -> Vec<EncryptedInputBuilder> {
        lock(&self.state).inputs.clone()
    }
}

#[async_trait::async_trait]
impl InputEncryptor for FakeEncryptor {
    async fn encrypt(&self, input: EncryptedInputBuilder) -> BillsResult<EncryptedInput> {
        let mut state = lock(&self.state);
        if let Some(message) = &state.failure {
            return Err(BillsError::Encryption(message.clone()));
        }
        let base = state.inputs.len() as u64 * 16;
        let handles = (0..input.values().len() as u64)
            .map(|i| numbered_handle(500 + base + i))
            .collect();
        state.inputs.push(input);
        Ok(EncryptedInput {
            handles,
            input_proof: vec![0xde, 0xad],
        })
    }
}
