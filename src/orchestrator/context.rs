//! Session identity and request tokens
//!
//! `SessionContext` is the live (network, contract, signer) the user is
//! working with; it can change at any time. Every request captures a
//! `RequestContext` when it starts and compares it against the live session
//! before committing anything.

use std::sync::{Arc, RwLock};

use tracing::info;

use crate::error::{BillsError, BillsResult};
use crate::ledger::CallContext;
use crate::models::{Address, RequestId};

/// The identity requests are made under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionIdentity {
    pub chain_id: u64,
    /// Resolved contract; `None` when nothing is deployed on the chain
    pub contract: Option<Address>,
    pub signer: Option<Address>,
}

impl SessionIdentity {
    pub fn is_deployed(&self) -> bool {
        self.contract.is_some()
    }
}

/// Shared, switchable session identity
#[derive(Debug, Clone)]
pub struct SessionContext {
    inner: Arc<RwLock<SessionIdentity>>,
}

impl SessionContext {
    pub fn new(chain_id: u64, contract: Option<Address>, signer: Option<Address>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionIdentity {
                chain_id,
                contract: contract.filter(|c| !c.is_zero()),
                signer,
            })),
        }
    }

    /// Current identity
    pub fn current(&self) -> BillsResult<SessionIdentity> {
        self.inner
            .read()
            .map(|identity| *identity)
            .map_err(|e| BillsError::Storage(format!("Session lock poisoned: {}", e)))
    }

    fn update(&self, apply: impl FnOnce(&mut SessionIdentity)) -> BillsResult<()> {
        let mut identity = self
            .inner
            .write()
            .map_err(|e| BillsError::Storage(format!("Session lock poisoned: {}", e)))?;
        apply(&mut identity);
        info!(
            chain_id = identity.chain_id,
            contract = ?identity.contract,
            signer = ?identity.signer,
            "session switched"
        );
        Ok(())
    }

    /// Move to another network and its resolved contract
    pub fn switch_chain(&self, chain_id: u64, contract: Option<Address>) -> BillsResult<()> {
        self.update(|identity| {
            identity.chain_id = chain_id;
            identity.contract = contract.filter(|c| !c.is_zero());
        })
    }

    /// Change (or disconnect) the signer
    pub fn switch_signer(&self, signer: Option<Address>) -> BillsResult<()> {
        self.update(|identity| identity.signer = signer)
    }

    /// Capture a request token, or `None` if no request can be made
    /// (nothing deployed, or no signer)
    pub fn capture(&self) -> BillsResult<Option<RequestContext>> {
        let identity = self.current()?;
        Ok(match (identity.contract, identity.signer) {
            (Some(contract), Some(signer)) => Some(RequestContext {
                id: RequestId::new(),
                chain_id: identity.chain_id,
                contract,
                signer,
            }),
            _ => None,
        })
    }
}

/// The identity a request started under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub id: RequestId,
    pub chain_id: u64,
    pub contract: Address,
    pub signer: Address,
}

impl RequestContext {
    /// Whether the live session still matches this request
    pub fn is_current(&self, session: &SessionContext) -> BillsResult<bool> {
        let identity = session.current()?;
        Ok(identity.chain_id == self.chain_id
            && identity.contract == Some(self.contract)
            && identity.signer == Some(self.signer))
    }

    /// Contract call context (the signer is the caller)
    pub fn call_context(&self) -> CallContext {
        CallContext {
            contract: self.contract,
            from: self.signer,
        }
    }

    /// The identity this request was made under
    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity {
            chain_id: self.chain_id,
            contract: Some(self.contract),
            signer: Some(self.signer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[test]
    fn test_capture_requires_contract_and_signer() {
        let no_contract = SessionContext::new(1, None, Some(addr(9)));
        assert!(no_contract.capture().unwrap().is_none());

        let zero_contract = SessionContext::new(1, Some(Address::ZERO), Some(addr(9)));
        assert!(zero_contract.capture().unwrap().is_none());

        let no_signer = SessionContext::new(1, Some(addr(1)), None);
        assert!(no_signer.capture().unwrap().is_none());

        let ready = SessionContext::new(1, Some(addr(1)), Some(addr(9)));
        let request = ready.capture().unwrap().unwrap();
        assert_eq!(request.call_context().from, addr(9));
    }

    #[test]
    fn test_request_goes_stale_on_switch() {
        let session = SessionContext::new(1, Some(addr(1)), Some(addr(9)));
        let request = session.capture().unwrap().unwrap();
        assert!(request.is_current(&session).unwrap());

        session.switch_signer(Some(addr(8))).unwrap();
        assert!(!request.is_current(&session).unwrap());

        // Switching back makes it current again
        session.switch_signer(Some(addr(9))).unwrap();
        assert!(request.is_current(&session).unwrap());

        session.switch_chain(2, Some(addr(1))).unwrap();
        assert!(!request.is_current(&session).unwrap());
    }

    #[test]
    fn test_clones_share_state() {
        let session = SessionContext::new(1, Some(addr(1)), Some(addr(9)));
        let other = session.clone();
        other.switch_chain(5, None).unwrap();
        assert_eq!(session.current().unwrap().chain_id, 5);
        assert!(!session.current().unwrap().is_deployed());
    }
}
