use anyhow::Result;
use colored::Colorize;
use reward_pool::state::{PoolStatus, RewardPool};
use solana_sdk::signature::Signer;

use super::{connect, print_failure, print_success};
use crate::config::{parse_pubkey, Config};
use crate::errors::CliError;
use crate::wallet;

/// Create the pool for the configured mint, with the wallet as platform authority
pub async fn init(config: &Config, fee: u8, treasury: &str) -> Result<()> {
    let authority = wallet::load_wallet()?;
    let treasury = parse_pubkey(treasury)?;
    let client = connect(config)?;

    println!("{}", "Initializing reward pool...".bright_cyan());
    println!("  Authority:    {}", authority.pubkey().to_string().bright_yellow());
    println!("  Reward Mint:  {}", client.reward_mint());
    println!("  Treasury:     {}", treasury);
    println!("  Platform Fee: {}%", fee);

    match client.initialize_pool(&authority, &treasury, fee).await {
        Ok(signature) => {
            print_success("Reward pool initialized", &signature, config);
            println!("  Pool:        {}", client.pool_address().to_string().bright_yellow());
            Ok(())
        }
        Err(e) => {
            print_failure("Pool initialization failed", &e);
            Err(e.into())
        }
    }
}

pub async fn set_fee(config: &Config, fee: u8) -> Result<()> {
    let authority = wallet::load_wallet()?;
    let client = connect(config)?;

    println!("{}", format!("Updating platform fee to {}%...", fee).bright_cyan());

    match client.update_platform_fee(&authority, fee).await {
        Ok(signature) => {
            print_success("Platform fee updated", &signature, config);
            Ok(())
        }
        Err(e) => {
            print_failure("Fee update failed", &e);
            Err(e.into())
        }
    }
}

/// Pause (`true`) or resume (`false`) the reward paths
pub async fn set_paused(config: &Config, paused: bool) -> Result<()> {
    let authority = wallet::load_wallet()?;
    let client = connect(config)?;

    let result = if paused {
        println!("{}", "Pausing reward pool...".bright_cyan());
        client.pause_pool(&authority).await
    } else {
        println!("{}", "Resuming reward pool...".bright_cyan());
        client.resume_pool(&authority).await
    };

    match result {
        Ok(signature) => {
            let message = if paused { "Reward pool paused" } else { "Reward pool resumed" };
            print_success(message, &signature, config);
            Ok(())
        }
        Err(e) => {
            print_failure("Request failed", &e);
            Err(e.into())
        }
    }
}

pub async fn status(config: &Config) -> Result<()> {
    let client = connect(config)?;

    println!("{}", "═══════════════════════════════════════════════════".bright_cyan());
    println!("{}", "        Reward Pool Status".bright_cyan().bold());
    println!("{}", "═══════════════════════════════════════════════════".bright_cyan());
    println!();
    println!("  Pool:         {}", client.pool_address().to_string().bright_yellow());
    println!("  Reward Mint:  {}", client.reward_mint());
    println!();

    let pool = client
        .get_pool_data()
        .await?
        .ok_or_else(|| CliError::PoolNotFound(client.reward_mint().to_string()))?;

    for line in describe(&pool) {
        println!("{}", line);
    }

    Ok(())
}

fn describe(pool: &RewardPool) -> Vec<String> {
    let status = match pool.status() {
        PoolStatus::Active => "Active".bright_green(),
        PoolStatus::Paused => "Paused".yellow(),
    };

    vec![
        format!("  Status:           {}", status),
        format!("  Authority:        {}", pool.platform_authority),
        format!("  Treasury:         {}", pool.platform_treasury),
        format!("  Platform Fee:     {}%", pool.platform_fee_percentage),
        format!("  Rewards Paid:     {}", pool.total_rewards_distributed),
        format!("  Fees Collected:   {}", pool.total_platform_fees_collected),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;

    #[test]
    fn test_describe_pool() {
        colored::control::set_override(false);
        let pool = RewardPool {
            platform_authority: Pubkey::new_unique(),
            reward_mint: Pubkey::new_unique(),
            platform_treasury: Pubkey::new_unique(),
            platform_fee_percentage: 10,
            total_rewards_distributed: 900_000,
            total_platform_fees_collected: 100_000,
            is_paused: true,
            bump_seed: 254,
        };

        let lines = describe(&pool);
        assert!(lines[0].contains("Paused"));
        assert!(lines[3].contains("10%"));
        assert!(lines[4].contains("900000"));
        assert!(lines[5].contains("100000"));
    }
}
