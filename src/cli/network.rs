//! Network CLI commands
//!
//! Switches the active chain and deploys the ledger contract on the devnet.

use clap::Subcommand;
use tracing::info;

use crate::config::{BillsPaths, Settings, DEVNET_CHAIN_ID};
use crate::deployment::DeploymentRegistry;
use crate::devnet::{Devnet, DEVNET_CHAIN_NAME};
use crate::error::{BillsError, BillsResult};

/// Network subcommands
#[derive(Subcommand)]
pub enum NetworkCommands {
    /// Switch the active chain
    Use {
        /// Chain id (31337 is the local devnet)
        chain_id: u64,
    },
    /// List chains with a registered deployment
    #[command(alias = "ls")]
    List,
}

/// Handle a network command
pub fn handle_network_command(
    paths: &BillsPaths,
    settings: &mut Settings,
    cmd: NetworkCommands,
) -> BillsResult<()> {
    let registry = DeploymentRegistry::load(&paths.deployments_file())?;

    match cmd {
        NetworkCommands::Use { chain_id } => {
            settings.chain_id = chain_id;
            settings.save(paths)?;
            println!("Active network: chainId={}", chain_id);
            match registry.resolve(chain_id) {
                Ok(deployment) => println!("Contract:       {}", deployment.address),
                Err(err) => println!("Note: {}.", err),
            }
        }
        NetworkCommands::List => {
            let mut any = false;
            for (chain_id, entry) in registry.iter() {
                any = true;
                let marker = if chain_id == settings.chain_id { "*" } else { " " };
                println!(
                    "{} {:>10}  {:<10} {}",
                    marker, chain_id, entry.chain_name, entry.address
                );
            }
            if !any {
                println!("No deployments registered. Run 'bills deploy' first.");
            }
        }
    }
    Ok(())
}

/// Deploy a fresh ledger contract on the devnet and register it
pub fn handle_deploy(paths: &BillsPaths, settings: &Settings) -> BillsResult<()> {
    if settings.chain_id != DEVNET_CHAIN_ID {
        return Err(BillsError::Config(format!(
            "Only the local devnet (chainId={}) can be deployed to; active chainId={}",
            DEVNET_CHAIN_ID, settings.chain_id
        )));
    }
    paths.ensure_directories()?;

    let devnet = Devnet::open(&paths.devnet_file(), settings.signature_duration_days)?;
    let address = devnet.deploy()?;

    let mut registry = DeploymentRegistry::load(&paths.deployments_file())?;
    registry.register(DEVNET_CHAIN_ID, address, DEVNET_CHAIN_NAME);
    registry.save(&paths.deployments_file())?;
    info!(%address, "deployment registered");

    println!("PrivateBills deployed to {}", address);
    println!("  chainId={} ({})", DEVNET_CHAIN_ID, DEVNET_CHAIN_NAME);
    Ok(())
}
