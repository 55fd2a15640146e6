use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use private_bills::cli::{
    handle_account_command, handle_balance, handle_deploy, handle_encrypt_command, handle_history,
    handle_monthly, handle_network_command, handle_record_command, handle_report_command,
    handle_tags, AccountCommands, EncryptCommands, NetworkCommands, RecordCommands,
    ReportCommands, Session, Signatures,
};
use private_bills::config::{BillsPaths, Settings};
use private_bills::deployment::DeploymentRegistry;

#[derive(Parser)]
#[command(
    name = "bills",
    author = "Kaylee Beyene",
    version,
    about = "Private on-chain bills ledger with encrypted amounts",
    long_about = "PrivateBills keeps your income and expenses on a ledger contract \
                  that only ever stores encrypted amounts. Totals are computed on \
                  ciphertexts; only you can decrypt them."
)]
struct Cli {
    /// Log orchestration steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory
    Init,

    /// Show current configuration and paths
    Config,

    /// Deploy the ledger contract on the local devnet
    Deploy,

    /// Network selection
    #[command(subcommand)]
    Network(NetworkCommands),

    /// Signer selection
    #[command(subcommand)]
    Account(AccountCommands),

    /// Show your encrypted balance
    Balance {
        /// Decrypt the balance
        #[arg(short, long)]
        decrypt: bool,
    },

    /// Show the net of one month
    Monthly {
        /// Month (YYYY-MM), defaults to the current month
        #[arg(short, long)]
        month: Option<String>,
        /// Decrypt the net and every tag total
        #[arg(short, long)]
        decrypt: bool,
    },

    /// Record management commands
    #[command(subcommand)]
    Record(RecordCommands),

    /// Tag breakdown reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// List the tags for income and expenses
    Tags,

    /// Show recent record submissions
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,
    },

    /// Signature store encryption
    #[command(subcommand)]
    Encrypt(EncryptCommands),
}

impl Commands {
    fn signatures(&self) -> Signatures {
        let needed = match self {
            Commands::Balance { decrypt } | Commands::Monthly { decrypt, .. } => *decrypt,
            Commands::Record(RecordCommands::List { decrypt }) => *decrypt,
            Commands::Report(_) => true,
            _ => false,
        };
        if needed {
            Signatures::Needed
        } else {
            Signatures::Unused
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("private_bills=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("private_bills=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let paths = BillsPaths::new()?;
    let mut settings = Settings::load_or_create(&paths)?;

    let Some(command) = cli.command else {
        println!("PrivateBills - encrypted on-chain bills ledger");
        println!();
        println!("Run 'bills --help' for usage information.");
        println!("Run 'bills init' and 'bills deploy' to get started on the devnet.");
        return Ok(());
    };

    let signatures = command.signatures();
    match command {
        Commands::Init => {
            println!("Initializing PrivateBills at: {}", paths.base_dir().display());
            paths.ensure_directories()?;
            settings.save(&paths)?;
            let registry = DeploymentRegistry::load(&paths.deployments_file())?;
            registry.save(&paths.deployments_file())?;
            println!("Initialization complete!");
            println!();
            println!("Next steps:");
            println!("  bills deploy                 deploy the ledger on the devnet");
            println!("  bills account use <address>  choose your signer");
        }
        Commands::Config => {
            println!("PrivateBills Configuration");
            println!("==========================");
            println!("Data directory:  {}", paths.base_dir().display());
            println!("Settings:        {}", paths.settings_file().display());
            println!("Deployments:     {}", paths.deployments_file().display());
            println!("Signatures:      {}", paths.signatures_file().display());
            println!("Devnet state:    {}", paths.devnet_file().display());
            println!("Audit log:       {}", paths.audit_log().display());
            println!();
            println!("Settings:");
            println!("  Chain id:            {}", settings.chain_id);
            match settings.signer {
                Some(signer) => println!("  Signer:              {}", signer),
                None => println!("  Signer:              (none)"),
            }
            println!(
                "  Signature validity:  {} days",
                settings.signature_duration_days
            );
            println!(
                "  Encryption enabled:  {}",
                settings.is_encryption_enabled()
            );
        }
        Commands::Deploy => handle_deploy(&paths, &settings)?,
        Commands::Network(cmd) => handle_network_command(&paths, &mut settings, cmd)?,
        Commands::Account(cmd) => handle_account_command(&paths, &mut settings, cmd)?,
        Commands::Tags => handle_tags(),
        Commands::History { count } => handle_history(&paths, count)?,
        Commands::Encrypt(cmd) => handle_encrypt_command(&paths, &mut settings, cmd)?,
        Commands::Balance { decrypt } => {
            let session = Session::open(paths, signatures)?;
            handle_balance(&session, decrypt).await?;
        }
        Commands::Monthly { month, decrypt } => {
            let session = Session::open(paths, signatures)?;
            handle_monthly(&session, month, decrypt).await?;
        }
        Commands::Record(cmd) => {
            let session = Session::open(paths, signatures)?;
            handle_record_command(&session, cmd).await?;
        }
        Commands::Report(cmd) => {
            let session = Session::open(paths, signatures)?;
            handle_report_command(&session, cmd).await?;
        }
    }

    Ok(())
}
