pub mod pool;
pub mod rewards;

use anyhow::Result;
use colored::Colorize;
use solana_sdk::signature::Signature;
use std::sync::Arc;

use crate::config::Config;
use crate::contracts::RewardPoolClient;
use crate::errors::ClientError;
use crate::ledger::RpcLedger;
use crate::token_accounts::AssociatedTokenService;

pub type RpcPoolClient = RewardPoolClient<RpcLedger, AssociatedTokenService<RpcLedger>>;

/// Client for the configured cluster, program and reward mint
pub fn connect(config: &Config) -> Result<RpcPoolClient> {
    let program_id = config.program_id()?;
    let reward_mint = config.reward_mint()?;

    let ledger = Arc::new(RpcLedger::new(config.rpc_url.clone(), program_id));
    let tokens = AssociatedTokenService::new(ledger.clone());

    Ok(RewardPoolClient::new(ledger, tokens, program_id, reward_mint))
}

pub fn explorer_url(signature: &Signature, cluster: &str) -> String {
    match cluster {
        "mainnet-beta" => format!("https://explorer.solana.com/tx/{}", signature),
        "localnet" => format!(
            "https://explorer.solana.com/tx/{}?cluster=custom&customUrl=http%3A%2F%2F127.0.0.1%3A8899",
            signature
        ),
        _ => format!("https://explorer.solana.com/tx/{}?cluster={}", signature, cluster),
    }
}

fn print_success(message: &str, signature: &Signature, config: &Config) {
    println!();
    println!("{}", format!("✅ {}", message).bright_green());
    println!("  Transaction: {}", signature.to_string().bright_yellow());
    println!("  Explorer:    {}", explorer_url(signature, &config.cluster).bright_blue());
}

fn print_failure(title: &str, err: &ClientError) {
    println!();
    println!("{}", format!("❌ {}", title).bright_red());
    println!("  Error: {}", err);
    if let Some(code) = err.code {
        println!("  Program error code: {}", code.to_string().yellow());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explorer_url_per_cluster() {
        let sig = Signature::default();
        assert!(explorer_url(&sig, "devnet").ends_with("?cluster=devnet"));
        assert!(!explorer_url(&sig, "mainnet-beta").contains("cluster="));
        assert!(explorer_url(&sig, "localnet").contains("customUrl"));
    }

    #[test]
    fn test_connect_requires_mint() {
        let config = Config::default();
        let err = connect(&config).err().unwrap();
        assert!(err.to_string().contains("Reward mint not configured"));
    }
}
