use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::CliError;

/// Configuration for the reward pool CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub cluster: String,
    pub wallet_path: Option<PathBuf>,
    pub rpc_url: String,
    #[serde(default = "default_program_id")]
    pub program_id: String,
    #[serde(default)]
    pub reward_mint: Option<String>,
}

fn default_program_id() -> String {
    reward_pool::id().to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster: "devnet".to_string(),
            wallet_path: None,
            rpc_url: "https://api.devnet.solana.com".to_string(),
            program_id: default_program_id(),
            reward_mint: None,
        }
    }
}

impl Config {
    /// Directory holding the config file and the default wallet
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find config directory"))?;
        Ok(config_dir.join("reward-pool-cli"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from file, writing the defaults on first use
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        Ok(())
    }

    pub fn set_cluster(&mut self, cluster: &str) -> Result<()> {
        let rpc_url = match cluster {
            "devnet" => "https://api.devnet.solana.com",
            "mainnet-beta" => "https://api.mainnet-beta.solana.com",
            "localnet" => "http://127.0.0.1:8899",
            _ => return Err(CliError::InvalidCluster(cluster.to_string()).into()),
        };

        self.cluster = cluster.to_string();
        self.rpc_url = rpc_url.to_string();

        Ok(())
    }

    pub fn set_reward_mint(&mut self, mint: &str) -> Result<()> {
        parse_pubkey(mint)?;
        self.reward_mint = Some(mint.to_string());
        Ok(())
    }

    pub fn program_id(&self) -> Result<Pubkey> {
        parse_pubkey(&self.program_id)
    }

    pub fn reward_mint(&self) -> Result<Pubkey> {
        let mint = self.reward_mint.as_deref().ok_or(CliError::RewardMintNotSet)?;
        parse_pubkey(mint)
    }
}

pub fn parse_pubkey(value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).map_err(|_| CliError::InvalidPubkey(value.to_string()).into())
}

/// Set cluster configuration
pub fn set_cluster(cluster: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set_cluster(cluster)?;
    config.save()?;

    println!("{}", format!("✓ Cluster set to: {}", cluster).green());
    println!("  RPC URL: {}", config.rpc_url);

    Ok(())
}

/// Set the reward mint the CLI operates on
pub fn set_mint(mint: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set_reward_mint(mint)?;
    config.save()?;

    println!("{}", format!("✓ Reward mint set to: {}", mint).green());

    Ok(())
}

/// Show current configuration
pub fn show() -> Result<()> {
    let config = Config::load()?;

    println!("{}", "Reward Pool CLI Configuration".bright_cyan().bold());
    println!("  Cluster:      {}", config.cluster.bright_yellow());
    println!("  RPC URL:      {}", config.rpc_url);
    println!("  Program ID:   {}", config.program_id);
    println!("  Reward Mint:  {}", config.reward_mint.as_deref().unwrap_or("Not set"));
    println!("  Wallet Path:  {}",
        config.wallet_path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "Not set".to_string())
    );

    Ok(())
}
