//! Session wiring for CLI commands
//!
//! Loads settings and the deployment registry, opens the devnet and the
//! signature store, and builds the orchestrator and pipeline around them.

use std::sync::Arc;

use crate::audit::AuditLogger;
use crate::config::{BillsPaths, Settings};
use crate::deployment::DeploymentRegistry;
use crate::devnet::Devnet;
use crate::display::format_status;
use crate::error::BillsResult;
use crate::ledger::LedgerFacade;
use crate::orchestrator::{DecryptionOrchestrator, SessionContext};
use crate::pipeline::MutationPipeline;
use crate::signature::{
    InMemorySignatureStore, JsonFileSignatureStore, SignatureCache, SignatureStore,
};

use super::encrypt::unlock_key;

/// Whether a command will ask for decryption signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signatures {
    Needed,
    Unused,
}

pub struct Session {
    pub paths: BillsPaths,
    pub settings: Settings,
    pub registry: DeploymentRegistry,
    pipeline: MutationPipeline,
}

impl Session {
    /// Build a session for the active network and signer
    ///
    /// A sealed signature store is only unlocked when `signatures` is
    /// `Needed`; otherwise signatures live in memory for this run.
    pub fn open(paths: BillsPaths, signatures: Signatures) -> BillsResult<Self> {
        let settings = Settings::load_or_create(&paths)?;
        let registry = DeploymentRegistry::load(&paths.deployments_file())?;
        let contract = registry
            .resolve(settings.chain_id)
            .ok()
            .map(|deployment| deployment.address);

        let devnet = Arc::new(Devnet::open(
            &paths.devnet_file(),
            settings.signature_duration_days,
        )?);

        let store: Arc<dyn SignatureStore> = match (settings.is_encryption_enabled(), signatures) {
            (false, _) => Arc::new(JsonFileSignatureStore::new(paths.signatures_file())),
            (true, Signatures::Needed) => Arc::new(JsonFileSignatureStore::sealed(
                paths.signatures_file(),
                unlock_key(&settings)?,
            )),
            (true, Signatures::Unused) => Arc::new(InMemorySignatureStore::new()),
        };

        let orchestrator = Arc::new(DecryptionOrchestrator::new(
            SessionContext::new(settings.chain_id, contract, settings.signer),
            LedgerFacade::new(devnet.clone()),
            devnet.clone(),
            SignatureCache::new(store),
        ));
        let pipeline = MutationPipeline::new(orchestrator, devnet)
            .with_audit(AuditLogger::new(paths.audit_log()));

        Ok(Self {
            paths,
            settings,
            registry,
            pipeline,
        })
    }

    pub fn orchestrator(&self) -> &Arc<DecryptionOrchestrator> {
        self.pipeline.orchestrator()
    }

    pub fn pipeline(&self) -> &MutationPipeline {
        &self.pipeline
    }

    pub fn currency(&self) -> &str {
        &self.settings.currency_symbol
    }

    /// Print the last status message, if any
    pub fn print_status(&self) -> BillsResult<()> {
        if let Some(status) = self.orchestrator().status()? {
            println!("{}", format_status(&status));
        }
        Ok(())
    }
}
