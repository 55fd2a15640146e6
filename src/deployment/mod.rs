//! Deployment registry
//!
//! Maps a chain id to the PrivateBills contract deployed on it. A chain with
//! no entry, or whose entry holds the zero address, is "not deployed": a
//! recoverable condition that disables queries rather than failing them.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BillsError, BillsResult};
use crate::models::Address;
use crate::storage::{read_json, write_json_atomic};

/// One registered deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentEntry {
    pub address: Address,
    #[serde(default)]
    pub chain_name: String,
}

/// A deployment that passed resolution (non-zero address)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDeployment {
    pub chain_id: u64,
    pub address: Address,
}

/// Chain id → deployment, persisted as `deployments.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRegistry {
    #[serde(default)]
    chains: BTreeMap<u64, DeploymentEntry>,
}

impl DeploymentRegistry {
    /// Load the registry, or an empty one if the file doesn't exist
    pub fn load(path: &Path) -> BillsResult<Self> {
        read_json(path)
    }

    /// Persist the registry
    pub fn save(&self, path: &Path) -> BillsResult<()> {
        write_json_atomic(path, self)
    }

    /// Register (or replace) the deployment for a chain
    pub fn register(&mut self, chain_id: u64, address: Address, chain_name: impl Into<String>) {
        self.chains.insert(
            chain_id,
            DeploymentEntry {
                address,
                chain_name: chain_name.into(),
            },
        );
    }

    /// Raw entry for a chain
    pub fn entry(&self, chain_id: u64) -> Option<&DeploymentEntry> {
        self.chains.get(&chain_id)
    }

    /// Resolve the contract for a chain
    ///
    /// # Errors
    ///
    /// `NotDeployed` when the chain has no entry or its address is zero.
    pub fn resolve(&self, chain_id: u64) -> BillsResult<ResolvedDeployment> {
        match self.chains.get(&chain_id) {
            Some(entry) if !entry.address.is_zero() => Ok(ResolvedDeployment {
                chain_id,
                address: entry.address,
            }),
            _ => Err(BillsError::not_deployed(chain_id)),
        }
    }

    /// Whether a usable contract is registered for a chain
    pub fn is_deployed(&self, chain_id: u64) -> bool {
        self.resolve(chain_id).is_ok()
    }

    /// All registered chains, ordered by chain id
    pub fn iter(&self) -> impl Iterator<Item = (u64, &DeploymentEntry)> {
        self.chains.iter().map(|(id, entry)| (*id, entry))
    }
}
