//! Account CLI commands
//!
//! Selects the signer every ledger call and decryption is made as.

use clap::Subcommand;

use crate::config::{BillsPaths, Settings};
use crate::deployment::DeploymentRegistry;
use crate::display::format_identity;
use crate::error::{BillsError, BillsResult};
use crate::models::Address;
use crate::orchestrator::SessionIdentity;

/// Account subcommands
#[derive(Subcommand)]
pub enum AccountCommands {
    /// Use an address as the active signer
    Use {
        /// Signer address (0x-prefixed hex)
        address: String,
    },
    /// Show the active network, contract and signer
    Show,
}

/// Handle an account command
pub fn handle_account_command(
    paths: &BillsPaths,
    settings: &mut Settings,
    cmd: AccountCommands,
) -> BillsResult<()> {
    match cmd {
        AccountCommands::Use { address } => {
            let signer: Address = address.parse()?;
            if signer.is_zero() {
                return Err(BillsError::validation("The zero address cannot sign"));
            }
            settings.signer = Some(signer);
            settings.save(paths)?;
            println!("Active signer: {}", signer);
        }
        AccountCommands::Show => {
            let registry = DeploymentRegistry::load(&paths.deployments_file())?;
            print!("{}", format_identity(&identity(settings, &registry)));
        }
    }
    Ok(())
}

/// Identity the next session would run under
pub fn identity(settings: &Settings, registry: &DeploymentRegistry) -> SessionIdentity {
    SessionIdentity {
        chain_id: settings.chain_id,
        contract: registry
            .resolve(settings.chain_id)
            .ok()
            .map(|deployment| deployment.address),
        signer: settings.signer,
    }
}
