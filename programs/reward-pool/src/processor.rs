//! Account binding and dispatch.
//!
//! The processor turns raw instruction bytes plus the caller's account list
//! into a validated [`Invocation`] for the state machine. Everything that
//! depends on *which* accounts were passed lives here: positional role
//! binding, signer and writable flags, well-known program ids, the pool PDA
//! and the farmer's associated token account.

use solana_program::{account_info::AccountInfo, instruction::AccountMeta, pubkey::Pubkey};
use spl_associated_token_account_client::address::get_associated_token_address_with_program_id;
use tracing::{debug, warn};

use crate::constants::{REWARD_POOL_SEED, TOKEN_PROGRAM_ID};
use crate::engine::{apply, BoundAccount, BoundAccounts, Invocation, PoolSlot, Transition};
use crate::errors::{PoolError, ValidationError};
use crate::instruction::{find_pool_address, well_known_account, AccountRole, RewardPoolInstruction, RoleSpec};
use crate::record_log::RecordLog;
use crate::state::RewardPool;

/// One entry of the caller's account list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInput {
    pub key: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl From<&AccountMeta> for AccountInput {
    fn from(meta: &AccountMeta) -> Self {
        Self {
            key: meta.pubkey,
            is_signer: meta.is_signer,
            is_writable: meta.is_writable,
        }
    }
}

impl From<&AccountInfo<'_>> for AccountInput {
    fn from(info: &AccountInfo<'_>) -> Self {
        Self {
            key: *info.key,
            is_signer: info.is_signer,
            is_writable: info.is_writable,
        }
    }
}

/// Binds accounts to roles by position.
///
/// Extra trailing accounts are ignored. Signer flags are carried through
/// untouched; whether a role must have signed is decided by the state machine.
pub fn bind_accounts(roles: &[RoleSpec], accounts: &[AccountInput]) -> Result<BoundAccounts, ValidationError> {
    if accounts.len() < roles.len() {
        return Err(ValidationError::NotEnoughAccountKeys);
    }

    let mut bound = Vec::with_capacity(roles.len());
    for (spec, account) in roles.iter().zip(accounts) {
        if spec.is_writable && !account.is_writable {
            return Err(ValidationError::AccountNotWritable);
        }
        if let Some(expected) = well_known_account(spec.role) {
            if account.key != expected {
                return Err(ValidationError::InvalidProgramAccount);
            }
        }
        bound.push(BoundAccount {
            role: spec.role,
            key: account.key,
            is_signer: account.is_signer,
        });
    }

    Ok(BoundAccounts::new(bound))
}

/// Reads the pool slot. A missing or zero-filled account has never been initialized.
pub fn load_slot(pool_data: Option<&[u8]>) -> Result<PoolSlot, PoolError> {
    match pool_data {
        None => Ok(PoolSlot::Fresh),
        Some(data) if data.iter().all(|b| *b == 0) => Ok(PoolSlot::Fresh),
        Some(data) => Ok(PoolSlot::Initialized(RewardPool::decode(data)?)),
    }
}

/// Validates one instruction and computes its transition.
///
/// `pool_data` is the current content of the pool account, `None` if it does
/// not exist yet. Nothing is written: the caller commits the returned
/// transition only if every effect can be carried out.
pub fn process_instruction<L: RecordLog + ?Sized>(
    program_id: &Pubkey,
    accounts: &[AccountInput],
    data: &[u8],
    pool_data: Option<&[u8]>,
    log: &L,
    unix_timestamp: i64,
) -> Result<Transition, PoolError> {
    let instruction = RewardPoolInstruction::unpack(data)?;

    let result = dispatch(program_id, accounts, &instruction, pool_data, log, unix_timestamp);
    match &result {
        Ok(_) => debug!("{} accepted", instruction.name()),
        Err(e) => warn!("{} rejected: {} (code {})", instruction.name(), e, e.code()),
    }
    result
}

fn dispatch<L: RecordLog + ?Sized>(
    program_id: &Pubkey,
    accounts: &[AccountInput],
    instruction: &RewardPoolInstruction,
    pool_data: Option<&[u8]>,
    log: &L,
    unix_timestamp: i64,
) -> Result<Transition, PoolError> {
    let bound = bind_accounts(instruction.account_roles(), accounts)?;
    let slot = load_slot(pool_data)?;
    let pool_key = bound.key(AccountRole::Pool)?;

    let pool_bump = match (&slot, instruction) {
        (PoolSlot::Fresh, RewardPoolInstruction::InitializePool { .. }) => {
            let mint = bound.key(AccountRole::Mint)?;
            let (expected, bump) = find_pool_address(program_id, &mint);
            if pool_key != expected {
                return Err(ValidationError::InvalidPoolAddress.into());
            }
            bump
        }
        (PoolSlot::Initialized(pool), _) => {
            verify_pool_address(program_id, &pool_key, pool)?;
            verify_reward_account(instruction, &bound, pool)?;
            pool.bump_seed
        }
        // The state machine reports the uninitialized pool
        (PoolSlot::Fresh, _) => 0,
    };

    let invocation = Invocation {
        accounts: &bound,
        pool_bump,
        unix_timestamp,
    };
    apply(&slot, log, instruction, &invocation)
}

fn verify_pool_address(program_id: &Pubkey, pool_key: &Pubkey, pool: &RewardPool) -> Result<(), ValidationError> {
    let expected = Pubkey::create_program_address(
        &[REWARD_POOL_SEED, pool.reward_mint.as_ref(), &[pool.bump_seed]],
        program_id,
    )
    .map_err(|_| ValidationError::InvalidPoolAddress)?;

    if *pool_key != expected {
        return Err(ValidationError::InvalidPoolAddress);
    }
    Ok(())
}

/// The farmer's reward-bearing account must be their associated token account
/// for the pool mint.
fn verify_reward_account(
    instruction: &RewardPoolInstruction,
    bound: &BoundAccounts,
    pool: &RewardPool,
) -> Result<(), ValidationError> {
    let owner = match instruction {
        RewardPoolInstruction::RecordReward { farmer_pubkey, .. } => *farmer_pubkey,
        RewardPoolInstruction::WithdrawReward { .. } => bound.key(AccountRole::Farmer)?,
        _ => return Ok(()),
    };

    let expected = get_associated_token_address_with_program_id(&owner, &pool.reward_mint, &TOKEN_PROGRAM_ID);
    if bound.key(AccountRole::FarmerRewardAccount)? != expected {
        return Err(ValidationError::InvalidRewardAccount);
    }
    Ok(())
}
