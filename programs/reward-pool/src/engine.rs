//! Pool state machine.
//!
//! [`apply`] is the whole transition function: it reads the current pool
//! record and the history log, validates the instruction against the accounts
//! the caller presented, and returns the next pool record together with the
//! log writes and token movements the host must carry out. It never mutates
//! anything itself, so the host's per-pool serialization is the only locking
//! required.

use solana_program::pubkey::Pubkey;
use tracing::{debug, info};

use crate::accounting::{checked_total, exhausted_rewards, split, withdrawable_balance};
use crate::constants::{MAX_PLATFORM_FEE_PERCENTAGE, MAX_TASK_ID_LEN};
use crate::errors::{PoolError, ValidationError};
use crate::events::PoolEvent;
use crate::instruction::{AccountRole, RewardPoolInstruction};
use crate::record_log::{RecordLog, RecordWrite};
use crate::state::{PendingReward, RewardPool, WithdrawalRecord};

/// What the host found at the pool address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolSlot {
    Fresh,
    Initialized(RewardPool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAccount {
    pub role: AccountRole,
    pub key: Pubkey,
    pub is_signer: bool,
}

/// Accounts presented by the caller, keyed by role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundAccounts {
    accounts: Vec<BoundAccount>,
}

impl BoundAccounts {
    pub fn new(accounts: Vec<BoundAccount>) -> Self {
        Self { accounts }
    }

    pub fn get(&self, role: AccountRole) -> Option<&BoundAccount> {
        self.accounts.iter().find(|a| a.role == role)
    }

    pub fn key(&self, role: AccountRole) -> Result<Pubkey, ValidationError> {
        self.get(role)
            .map(|a| a.key)
            .ok_or(ValidationError::NotEnoughAccountKeys)
    }

    pub fn is_signer(&self, role: AccountRole) -> bool {
        self.get(role).map(|a| a.is_signer).unwrap_or(false)
    }
}

/// Caller-supplied context for one transition
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub accounts: &'a BoundAccounts,
    /// Bump of the pool PDA, stored on initialization
    pub pool_bump: u8,
    pub unix_timestamp: i64,
}

/// Token movements requested from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenEffect {
    /// Create the owner's reward-bearing account if it does not exist yet
    EnsureTokenAccount {
        owner: Pubkey,
        mint: Pubkey,
        address: Pubkey,
    },
    Transfer {
        source: Pubkey,
        destination: Pubkey,
        authority: Pubkey,
        amount: u64,
    },
    /// Fee stays in the funding treasury
    RetainFee { treasury: Pubkey, amount: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub pool: RewardPool,
    pub writes: Vec<RecordWrite>,
    pub effects: Vec<TokenEffect>,
    pub event: PoolEvent,
}

impl Transition {
    fn state_only(pool: RewardPool, event: PoolEvent) -> Self {
        Self {
            pool,
            writes: Vec::new(),
            effects: Vec::new(),
            event,
        }
    }
}

pub fn apply<L: RecordLog + ?Sized>(
    slot: &PoolSlot,
    log: &L,
    instruction: &RewardPoolInstruction,
    invocation: &Invocation<'_>,
) -> Result<Transition, PoolError> {
    match instruction {
        RewardPoolInstruction::InitializePool { platform_fee_percentage } => {
            initialize_pool(slot, *platform_fee_percentage, invocation)
        }
        RewardPoolInstruction::RecordReward { amount, farmer_pubkey, task_id } => {
            let pool = initialized(slot)?;
            record_reward(pool, log, *amount, farmer_pubkey, task_id, invocation)
        }
        RewardPoolInstruction::WithdrawReward { amount, nonce } => {
            let pool = initialized(slot)?;
            withdraw_reward(pool, log, *amount, *nonce, invocation)
        }
        RewardPoolInstruction::UpdatePlatformFee { new_fee_percentage } => {
            let pool = initialized(slot)?;
            update_platform_fee(pool, *new_fee_percentage, invocation)
        }
        RewardPoolInstruction::PausePool => {
            let pool = initialized(slot)?;
            set_paused(pool, true, invocation)
        }
        RewardPoolInstruction::ResumePool => {
            let pool = initialized(slot)?;
            set_paused(pool, false, invocation)
        }
    }
}

fn initialized(slot: &PoolSlot) -> Result<RewardPool, ValidationError> {
    match slot {
        PoolSlot::Initialized(pool) => Ok(*pool),
        PoolSlot::Fresh => Err(ValidationError::PoolNotInitialized),
    }
}

fn require_authority(pool: &RewardPool, accounts: &BoundAccounts) -> Result<(), ValidationError> {
    let authority = accounts
        .get(AccountRole::Authority)
        .ok_or(ValidationError::NotEnoughAccountKeys)?;

    if !authority.is_signer || authority.key != pool.platform_authority {
        return Err(ValidationError::InvalidAuthority);
    }
    Ok(())
}

fn require_active(pool: &RewardPool) -> Result<(), ValidationError> {
    if pool.is_paused {
        return Err(ValidationError::PoolPaused);
    }
    Ok(())
}

fn require_fee(fee_percentage: u8) -> Result<(), ValidationError> {
    if fee_percentage > MAX_PLATFORM_FEE_PERCENTAGE {
        return Err(ValidationError::InvalidPlatformFee);
    }
    Ok(())
}

fn initialize_pool(
    slot: &PoolSlot,
    platform_fee_percentage: u8,
    invocation: &Invocation<'_>,
) -> Result<Transition, PoolError> {
    if let PoolSlot::Initialized(_) = slot {
        return Err(ValidationError::AlreadyInitialized.into());
    }

    let accounts = invocation.accounts;
    if !accounts.is_signer(AccountRole::Authority) {
        return Err(ValidationError::MissingAuthoritySignature.into());
    }
    require_fee(platform_fee_percentage)?;

    let pool = RewardPool {
        platform_authority: accounts.key(AccountRole::Authority)?,
        reward_mint: accounts.key(AccountRole::Mint)?,
        platform_treasury: accounts.key(AccountRole::Treasury)?,
        platform_fee_percentage,
        total_rewards_distributed: 0,
        total_platform_fees_collected: 0,
        is_paused: false,
        bump_seed: invocation.pool_bump,
    };

    info!(
        "Reward pool initialized for mint {} with {}% platform fee",
        pool.reward_mint, platform_fee_percentage
    );

    Ok(Transition::state_only(
        pool,
        PoolEvent::PoolInitialized {
            authority: pool.platform_authority,
            reward_mint: pool.reward_mint,
            platform_treasury: pool.platform_treasury,
            platform_fee_percentage,
        },
    ))
}

fn record_reward<L: RecordLog + ?Sized>(
    mut pool: RewardPool,
    log: &L,
    amount: u64,
    farmer: &Pubkey,
    task_id: &str,
    invocation: &Invocation<'_>,
) -> Result<Transition, PoolError> {
    let accounts = invocation.accounts;

    require_active(&pool)?;
    require_authority(&pool, accounts)?;

    if amount == 0 {
        return Err(ValidationError::InsufficientAmount.into());
    }
    if accounts.key(AccountRole::Treasury)? != pool.platform_treasury {
        return Err(ValidationError::InvalidTreasuryAccount.into());
    }
    if accounts.key(AccountRole::Mint)? != pool.reward_mint {
        return Err(ValidationError::InvalidMint.into());
    }
    if task_id.is_empty() || task_id.len() > MAX_TASK_ID_LEN {
        return Err(ValidationError::InvalidTaskId.into());
    }
    if log.pending_reward(farmer, task_id).is_some() {
        return Err(ValidationError::RewardAlreadyRecorded.into());
    }

    let fees = split(amount, pool.platform_fee_percentage)?;
    pool.total_rewards_distributed = checked_total(pool.total_rewards_distributed, fees.net)?;
    pool.total_platform_fees_collected =
        checked_total(pool.total_platform_fees_collected, fees.fee)?;

    let reward_account = accounts.key(AccountRole::FarmerRewardAccount)?;
    let mut effects = vec![TokenEffect::EnsureTokenAccount {
        owner: *farmer,
        mint: pool.reward_mint,
        address: reward_account,
    }];
    if fees.net > 0 {
        effects.push(TokenEffect::Transfer {
            source: pool.platform_treasury,
            destination: reward_account,
            authority: pool.platform_authority,
            amount: fees.net,
        });
    }
    if fees.fee > 0 {
        effects.push(TokenEffect::RetainFee {
            treasury: pool.platform_treasury,
            amount: fees.fee,
        });
    }

    let reward = PendingReward {
        farmer_pubkey: *farmer,
        amount: fees.net,
        task_id: task_id.to_string(),
        recorded_at: invocation.unix_timestamp,
        is_withdrawn: false,
    };

    debug!(
        "Reward recorded: {} tokens for farmer {} (fee {}, task {})",
        fees.net, farmer, fees.fee, task_id
    );

    Ok(Transition {
        pool,
        writes: vec![RecordWrite::AppendPendingReward(reward)],
        effects,
        event: PoolEvent::RewardRecorded {
            farmer: *farmer,
            task_id: task_id.to_string(),
            gross_amount: amount,
            net_amount: fees.net,
            platform_fee: fees.fee,
            timestamp: invocation.unix_timestamp,
        },
    })
}

fn withdraw_reward<L: RecordLog + ?Sized>(
    pool: RewardPool,
    log: &L,
    amount: u64,
    nonce: u64,
    invocation: &Invocation<'_>,
) -> Result<Transition, PoolError> {
    let accounts = invocation.accounts;

    require_active(&pool)?;

    let farmer = accounts.key(AccountRole::Farmer)?;
    if !accounts.is_signer(AccountRole::Farmer) {
        return Err(ValidationError::InvalidAuthority.into());
    }
    let source = accounts.key(AccountRole::FarmerRewardAccount)?;
    let destination = accounts.key(AccountRole::FarmerDestinationAccount)?;
    // A self-transfer moves nothing but would still consume the balance
    if source == destination {
        return Err(ValidationError::InvalidDestinationAccount.into());
    }
    if accounts.key(AccountRole::Mint)? != pool.reward_mint {
        return Err(ValidationError::InvalidMint.into());
    }
    if amount == 0 {
        return Err(ValidationError::InsufficientAmount.into());
    }
    // Replays are reported as such even once the balance is exhausted
    if log.withdrawal(&farmer, nonce).is_some() {
        return Err(ValidationError::InvalidNonce.into());
    }

    let available = withdrawable_balance(log.pending_rewards(&farmer), log.withdrawals(&farmer))?;
    if amount > available {
        return Err(ValidationError::InsufficientAmount.into());
    }

    let already_withdrawn = log
        .withdrawals(&farmer)
        .try_fold(0u64, |acc, w| checked_total(acc, w.amount))?;
    let withdrawn_after = checked_total(already_withdrawn, amount)?;

    let record = WithdrawalRecord {
        farmer_pubkey: farmer,
        amount,
        nonce,
        withdrawn_at: invocation.unix_timestamp,
    };

    let mut writes = vec![RecordWrite::AppendWithdrawal(record)];
    writes.extend(
        exhausted_rewards(log.pending_rewards(&farmer), withdrawn_after)?
            .into_iter()
            .map(|task_id| RecordWrite::MarkWithdrawn { farmer, task_id }),
    );

    debug!(
        "Withdrawal accepted: {} tokens for farmer {} (nonce {})",
        amount, farmer, nonce
    );

    Ok(Transition {
        pool,
        writes,
        effects: vec![TokenEffect::Transfer {
            source,
            destination,
            authority: farmer,
            amount,
        }],
        event: PoolEvent::RewardWithdrawn {
            farmer,
            amount,
            nonce,
            timestamp: invocation.unix_timestamp,
        },
    })
}

fn update_platform_fee(
    mut pool: RewardPool,
    new_fee_percentage: u8,
    invocation: &Invocation<'_>,
) -> Result<Transition, PoolError> {
    require_authority(&pool, invocation.accounts)?;
    require_fee(new_fee_percentage)?;

    let old_fee_percentage = pool.platform_fee_percentage;
    pool.platform_fee_percentage = new_fee_percentage;

    info!("Platform fee updated: {}% -> {}%", old_fee_percentage, new_fee_percentage);

    Ok(Transition::state_only(
        pool,
        PoolEvent::PlatformFeeUpdated {
            old_fee_percentage,
            new_fee_percentage,
        },
    ))
}

fn set_paused(
    mut pool: RewardPool,
    paused: bool,
    invocation: &Invocation<'_>,
) -> Result<Transition, PoolError> {
    require_authority(&pool, invocation.accounts)?;

    let changed = pool.is_paused != paused;
    if !changed {
        debug!("Pool already {}", if paused { "paused" } else { "active" });
    }
    pool.is_paused = paused;

    let event = if paused {
        info!("Pool paused");
        PoolEvent::PoolPaused { changed }
    } else {
        info!("Pool resumed");
        PoolEvent::PoolResumed { changed }
    };
    Ok(Transition::state_only(pool, event))
}
