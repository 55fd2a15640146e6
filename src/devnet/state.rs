//! Persisted state of the local development network
//!
//! Every encrypted value is a ciphertext sealed with AES-256-GCM under the
//! network's master key, plus an access list of (contract, user) pairs
//! allowed to use or decrypt it. Aggregates are updated by sealing a new
//! ciphertext under a fresh random handle; old ciphertexts are kept.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::crypto::{open_u64, random_bytes, seal_u64, DerivedKey, SealedData};
use crate::error::{BillsError, BillsResult};
use crate::models::{Address, EncryptedHandle, RecordMeta, RecordSide, TxHash};

/// Current devnet state format
pub const DEVNET_SCHEMA_VERSION: u32 = 1;

/// A sealed value and who may use it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ciphertext {
    pub sealed: SealedData,
    pub contract: Address,
    pub allowed: BTreeSet<Address>,
}

impl Ciphertext {
    pub fn allows(&self, contract: Address, user: Address) -> bool {
        self.contract == contract && self.allowed.contains(&user)
    }
}

/// One stored record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub meta: RecordMeta,
    pub amount: EncryptedHandle,
}

/// Everything one user has in one contract
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserLedger {
    pub balance: Option<EncryptedHandle>,
    #[serde(default)]
    pub monthly_net: BTreeMap<u32, EncryptedHandle>,
    #[serde(default)]
    pub expense_by_tag: BTreeMap<u32, BTreeMap<String, EncryptedHandle>>,
    #[serde(default)]
    pub income_by_tag: BTreeMap<u32, BTreeMap<String, EncryptedHandle>>,
    #[serde(default)]
    pub records: Vec<StoredRecord>,
}

impl UserLedger {
    pub fn by_tag(&self, side: RecordSide, month_key: u32, tag: &str) -> Option<EncryptedHandle> {
        let table = match side {
            RecordSide::Expense => &self.expense_by_tag,
            RecordSide::Income => &self.income_by_tag,
        };
        table.get(&month_key).and_then(|tags| tags.get(tag)).copied()
    }

    fn by_tag_mut(&mut self, side: RecordSide, month_key: u32) -> &mut BTreeMap<String, EncryptedHandle> {
        let table = match side {
            RecordSide::Expense => &mut self.expense_by_tag,
            RecordSide::Income => &mut self.income_by_tag,
        };
        table.entry(month_key).or_default()
    }
}

/// One deployed ledger contract
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractState {
    #[serde(default)]
    pub users: BTreeMap<Address, UserLedger>,
}

/// A mined transaction
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MinedTx {
    pub block_number: u64,
    pub success: bool,
}

/// A decryption authorization the devnet handed out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub user: Address,
    pub contracts: Vec<Address>,
    pub public_key: String,
}

/// The whole simulated chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevnetState {
    pub schema_version: u32,
    /// Hex-encoded master key sealing every ciphertext
    master_key: String,
    #[serde(default)]
    pub block_number: u64,
    #[serde(default)]
    pub contracts: BTreeMap<Address, ContractState>,
    #[serde(default)]
    pub ciphertexts: BTreeMap<EncryptedHandle, Ciphertext>,
    #[serde(default)]
    pub transactions: BTreeMap<TxHash, MinedTx>,
    /// Issued grants, keyed by signature
    #[serde(default)]
    pub grants: BTreeMap<String, Grant>,
}

impl Default for DevnetState {
    fn default() -> Self {
        Self {
            schema_version: DEVNET_SCHEMA_VERSION,
            master_key: hex::encode(random_bytes::<32>()),
            block_number: 0,
            contracts: BTreeMap::new(),
            ciphertexts: BTreeMap::new(),
            transactions: BTreeMap::new(),
            grants: BTreeMap::new(),
        }
    }
}

/// A fresh non-zero handle
pub fn fresh_handle() -> EncryptedHandle {
    loop {
        let handle = EncryptedHandle::from_bytes(random_bytes());
        if !handle.is_zero() {
            return handle;
        }
    }
}

impl DevnetState {
    fn master_key(&self) -> BillsResult<DerivedKey> {
        let mut key = [0u8; 32];
        hex::decode_to_slice(&self.master_key, &mut key)
            .map_err(|e| BillsError::Storage(format!("Corrupt devnet master key: {}", e)))?;
        Ok(DerivedKey::from_bytes(key))
    }

    /// Deploy a new, empty contract
    pub fn deploy(&mut self) -> Address {
        let address = loop {
            let candidate = Address::from_bytes(random_bytes());
            if !candidate.is_zero() && !self.contracts.contains_key(&candidate) {
                break candidate;
            }
        };
        self.contracts.insert(address, ContractState::default());
        address
    }

    /// Seal `value` under a fresh handle usable by `user` through `contract`
    pub fn seal(&mut self, value: u64, contract: Address, user: Address) -> BillsResult<EncryptedHandle> {
        let key = self.master_key()?;
        let handle = fresh_handle();
        self.ciphertexts.insert(
            handle,
            Ciphertext {
                sealed: seal_u64(value, &key)?,
                contract,
                allowed: BTreeSet::from([user]),
            },
        );
        Ok(handle)
    }

    /// Clear value behind a handle; the zero handle is 0
    pub fn open(&self, handle: &EncryptedHandle) -> BillsResult<u64> {
        if handle.is_zero() {
            return Ok(0);
        }
        let ciphertext = self
            .ciphertexts
            .get(handle)
            .ok_or_else(|| BillsError::Encryption(format!("Unknown handle {}", handle.short())))?;
        open_u64(&ciphertext.sealed, &self.master_key()?)
    }

    /// Apply `op` to the value behind `current` and seal the result
    fn update(
        &mut self,
        current: Option<EncryptedHandle>,
        contract: Address,
        user: Address,
        op: impl FnOnce(u64) -> u64,
    ) -> BillsResult<EncryptedHandle> {
        let value = match current {
            Some(handle) => self.open(&handle)?,
            None => 0,
        };
        self.seal(op(value), contract, user)
    }

    /// Store a record and update every aggregate it touches
    ///
    /// Arithmetic wraps like the ledger's 64-bit encrypted integers.
    pub fn add_record(
        &mut self,
        contract: Address,
        user: Address,
        amount: u64,
        meta: RecordMeta,
    ) -> BillsResult<()> {
        let side = meta.side();
        let ledger = self
            .contracts
            .get(&contract)
            .and_then(|c| c.users.get(&user))
            .cloned()
            .unwrap_or_default();
        let signed = |value: u64| match side {
            RecordSide::Income => value.wrapping_add(amount),
            RecordSide::Expense => value.wrapping_sub(amount),
        };

        let balance = self.update(ledger.balance, contract, user, signed)?;
        let net = self.update(
            ledger.monthly_net.get(&meta.month_key).copied(),
            contract,
            user,
            signed,
        )?;
        let tag_total = self.update(
            ledger.by_tag(side, meta.month_key, &meta.tag),
            contract,
            user,
            |value| value.wrapping_add(amount),
        )?;
        let record_amount = self.seal(amount, contract, user)?;

        let ledger = self
            .contracts
            .entry(contract)
            .or_default()
            .users
            .entry(user)
            .or_default();
        ledger.balance = Some(balance);
        ledger.monthly_net.insert(meta.month_key, net);
        ledger
            .by_tag_mut(side, meta.month_key)
            .insert(meta.tag.clone(), tag_total);
        ledger.records.push(StoredRecord {
            meta,
            amount: record_amount,
        });
        Ok(())
    }

    /// Record a mined transaction and return its hash
    pub fn mine(&mut self, success: bool) -> TxHash {
        self.block_number += 1;
        let tx = TxHash::from_bytes(random_bytes());
        self.transactions.insert(
            tx,
            MinedTx {
                block_number: self.block_number,
                success,
            },
        );
        tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn meta(is_income: bool, tag: &str) -> RecordMeta {
        RecordMeta {
            is_income,
            timestamp: 1_704_067_200,
            tag: tag.into(),
            month_key: 202401,
        }
    }

    #[test]
    fn test_seal_and_open() {
        let mut state = DevnetState::default();
        let handle = state.seal(42, addr(1), addr(9)).unwrap();
        assert_eq!(state.open(&handle).unwrap(), 42);
        assert_eq!(state.open(&EncryptedHandle::ZERO).unwrap(), 0);
        assert!(state.ciphertexts[&handle].allows(addr(1), addr(9)));
        assert!(!state.ciphertexts[&handle].allows(addr(1), addr(8)));
    }

    #[test]
    fn test_every_update_gets_a_new_handle() {
        let mut state = DevnetState::default();
        let contract = state.deploy();
        state.add_record(contract, addr(9), 3000, meta(true, "Salary")).unwrap();
        let first = state.contracts[&contract].users[&addr(9)].balance.unwrap();
        state.add_record(contract, addr(9), 1000, meta(false, "Rent")).unwrap();
        let ledger = &state.contracts[&contract].users[&addr(9)];

        assert_ne!(ledger.balance.unwrap(), first);
        assert_eq!(state.open(&ledger.balance.unwrap()).unwrap(), 2000);
        assert_eq!(state.open(&ledger.monthly_net[&202401]).unwrap(), 2000);
        assert_eq!(
            state
                .open(&ledger.by_tag(RecordSide::Expense, 202401, "Rent").unwrap())
                .unwrap(),
            1000
        );
        assert_eq!(ledger.records.len(), 2);
        assert_eq!(state.open(&ledger.records[1].amount).unwrap(), 1000);
    }

    #[test]
    fn test_negative_net_wraps() {
        let mut state = DevnetState::default();
        let contract = state.deploy();
        state.add_record(contract, addr(9), 500, meta(false, "Food & Dining")).unwrap();
        let ledger = &state.contracts[&contract].users[&addr(9)];
        let net = state.open(&ledger.monthly_net[&202401]).unwrap();
        assert_eq!(net as i64, -500);
    }

    #[test]
    fn test_state_survives_serialization() {
        let mut state = DevnetState::default();
        let handle = state.seal(7, addr(1), addr(9)).unwrap();
        let json = serde_json::to_string(&state).unwrap();
        let restored: DevnetState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.open(&handle).unwrap(), 7);
    }
}
