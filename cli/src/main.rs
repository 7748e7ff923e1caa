use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use reward_pool::constants::DEFAULT_PLATFORM_FEE_PERCENTAGE;
use reward_pool_cli::{commands, config, config::Config, wallet};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reward-pool-cli")]
#[command(author = "AEGIS Team")]
#[command(version = "0.1.0")]
#[command(about = "Reward pool CLI - record farmer rewards, withdraw, administer pools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the reward pool for the configured mint
    InitPool {
        /// Platform fee percentage (0-100)
        #[arg(long, default_value_t = DEFAULT_PLATFORM_FEE_PERCENTAGE)]
        fee: u8,

        /// Token account that funds rewards and keeps fees
        #[arg(long)]
        treasury: String,
    },

    /// Record a reward for a farmer's completed task
    RecordReward {
        /// Farmer wallet address
        #[arg(long)]
        farmer: String,

        /// Gross reward amount in base units
        #[arg(long)]
        amount: u64,

        /// Task identifier
        #[arg(long)]
        task: String,
    },

    /// Withdraw accrued rewards
    Withdraw {
        /// Amount in base units
        #[arg(long)]
        amount: u64,

        /// Unique nonce for this withdrawal
        #[arg(long)]
        nonce: u64,

        /// Owner of the destination reward account; must not be your own wallet
        #[arg(long)]
        destination: String,
    },

    /// Update the platform fee percentage
    SetFee {
        #[arg(long)]
        fee: u8,
    },

    /// Pause reward recording and withdrawals
    Pause,

    /// Resume a paused pool
    Resume,

    /// Show pool state and totals
    Status,

    /// Show the reward token balance of an owner
    Balance {
        /// Owner address (defaults to your wallet)
        #[arg(long)]
        owner: Option<String>,
    },

    /// Wallet management commands
    Wallet {
        #[command(subcommand)]
        action: WalletCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Create a new wallet
    Create,

    /// Import wallet from keypair file
    Import {
        /// Path to keypair JSON file
        #[arg(long)]
        keypair: String,
    },

    /// Show wallet address
    Address,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set Solana cluster (devnet/mainnet-beta/localnet)
    SetCluster {
        /// Cluster name
        cluster: String,
    },

    /// Set the reward mint the CLI operates on
    SetMint {
        /// Mint address
        mint: String,
    },

    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    println!("{}", "╔════════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║        Reward Pool CLI - Operator Tool     ║".bright_cyan());
    println!("{}", "╚════════════════════════════════════════════╝".bright_cyan());
    println!();

    let cli = Cli::parse();

    match cli.command {
        Commands::Wallet { action } => match action {
            WalletCommands::Create => wallet::create()?,
            WalletCommands::Import { keypair } => wallet::import(&keypair)?,
            WalletCommands::Address => wallet::show_address()?,
        },
        Commands::Config { action } => match action {
            ConfigCommands::SetCluster { cluster } => config::set_cluster(&cluster)?,
            ConfigCommands::SetMint { mint } => config::set_mint(&mint)?,
            ConfigCommands::Show => config::show()?,
        },
        Commands::InitPool { fee, treasury } => {
            commands::pool::init(&Config::load()?, fee, &treasury).await?
        }
        Commands::RecordReward { farmer, amount, task } => {
            commands::rewards::record(&Config::load()?, &farmer, amount, &task).await?
        }
        Commands::Withdraw { amount, nonce, destination } => {
            commands::rewards::withdraw(&Config::load()?, amount, nonce, &destination).await?
        }
        Commands::SetFee { fee } => commands::pool::set_fee(&Config::load()?, fee).await?,
        Commands::Pause => commands::pool::set_paused(&Config::load()?, true).await?,
        Commands::Resume => commands::pool::set_paused(&Config::load()?, false).await?,
        Commands::Status => commands::pool::status(&Config::load()?).await?,
        Commands::Balance { owner } => {
            commands::rewards::balance(&Config::load()?, owner.as_deref()).await?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_verification() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_has_version() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_version().unwrap(), "0.1.0");
    }

    #[test]
    fn test_init_pool_default_fee() {
        let cli = Cli::try_parse_from(["reward-pool-cli", "init-pool", "--treasury", "abc"]).unwrap();
        match cli.command {
            Commands::InitPool { fee, treasury } => {
                assert_eq!(fee, DEFAULT_PLATFORM_FEE_PERCENTAGE);
                assert_eq!(treasury, "abc");
            }
            _ => panic!("expected init-pool"),
        }
    }

    #[test]
    fn test_withdraw_requires_nonce() {
        assert!(Cli::try_parse_from(["reward-pool-cli", "withdraw", "--amount", "5"]).is_err());
    }

    #[test]
    fn test_withdraw_requires_destination() {
        let args = ["reward-pool-cli", "withdraw", "--amount", "5", "--nonce", "1"];
        assert!(Cli::try_parse_from(args).is_err());

        let cli = Cli::try_parse_from(["reward-pool-cli", "withdraw", "--amount", "5", "--nonce", "1", "--destination", "abc"])
            .unwrap();
        match cli.command {
            Commands::Withdraw { amount, nonce, destination } => {
                assert_eq!((amount, nonce), (5, 1));
                assert_eq!(destination, "abc");
            }
            _ => panic!("expected withdraw"),
        }
    }
}
