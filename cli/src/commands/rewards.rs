use anyhow::Result;
use colored::Colorize;
use solana_sdk::signature::Signer;

use super::{connect, print_failure, print_success};
use crate::config::{parse_pubkey, Config};
use crate::errors::CliError;
use crate::wallet;

/// Record a reward for a farmer, signed by the wallet as platform authority
pub async fn record(config: &Config, farmer: &str, amount: u64, task: &str) -> Result<()> {
    let authority = wallet::load_wallet()?;
    let farmer = parse_pubkey(farmer)?;
    let client = connect(config)?;

    let pool = client
        .get_pool_data()
        .await?
        .ok_or_else(|| CliError::PoolNotFound(client.reward_mint().to_string()))?;

    println!("{}", "Recording reward...".bright_cyan());
    println!("  Farmer:       {}", farmer.to_string().bright_yellow());
    println!("  Task:         {}", task);
    println!("  Gross Amount: {}", amount);
    println!("  Platform Fee: {}%", pool.platform_fee_percentage);

    match client
        .record_reward(&authority, &pool.platform_treasury, &farmer, amount, task)
        .await
    {
        Ok(signature) => {
            print_success("Reward recorded", &signature, config);
            Ok(())
        }
        Err(e) => {
            print_failure("Recording failed", &e);
            Err(e.into())
        }
    }
}

/// Withdraw accrued rewards from the wallet's reward account to the reward
/// account of `destination`
pub async fn withdraw(config: &Config, amount: u64, nonce: u64, destination: &str) -> Result<()> {
    let farmer = wallet::load_wallet()?;
    let destination = parse_pubkey(destination)?;
    let client = connect(config)?;

    println!("{}", "Withdrawing rewards...".bright_cyan());
    println!("  Farmer:      {}", farmer.pubkey().to_string().bright_yellow());
    println!("  Amount:      {}", amount);
    println!("  Nonce:       {}", nonce);
    println!("  Destination: {}", client.reward_account(&destination));

    match client.withdraw_reward(&farmer, amount, nonce, &destination).await {
        Ok(signature) => {
            print_success("Withdrawal completed", &signature, config);
            Ok(())
        }
        Err(e) => {
            print_failure("Withdrawal failed", &e);
            Err(e.into())
        }
    }
}

/// Show the reward token balance of `owner`, defaulting to the wallet
pub async fn balance(config: &Config, owner: Option<&str>) -> Result<()> {
    let owner = match owner {
        Some(owner) => parse_pubkey(owner)?,
        None => wallet::load_wallet()?.pubkey(),
    };
    let client = connect(config)?;

    println!("  Owner:          {}", owner.to_string().bright_yellow());
    println!("  Reward Account: {}", client.reward_account(&owner));

    match client.get_reward_balance(&owner).await? {
        Some(amount) => println!("  Balance:        {}", amount.to_string().bright_green()),
        None => println!("  Balance:        {}", "No reward account yet".dimmed()),
    }

    Ok(())
}
