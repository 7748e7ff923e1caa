//! On-chain entrypoint.
//!
//! Runs the state machine against the transaction's accounts and carries the
//! transition out: the pool account holds the pool record followed by its
//! history, token movements go through the SPL token program. Any failed
//! step fails the transaction, so nothing is applied partially.

use solana_program::{
    account_info::AccountInfo,
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction, sysvar,
    sysvar::Sysvar,
};

use crate::constants::{POOL_ACCOUNT_LEN, REWARD_POOL_SEED, TOKEN_PROGRAM_ID};
use crate::engine::{TokenEffect, Transition};
use crate::errors::PoolError;
use crate::instruction::{AccountRole, RewardPoolInstruction};
use crate::processor::{self, AccountInput};
use crate::record_log::{apply_writes, MemoryRecordLog};
use crate::state::RewardPool;

#[cfg(not(feature = "no-entrypoint"))]
solana_program::entrypoint!(process);

pub fn process(program_id: &Pubkey, accounts: &[AccountInfo], data: &[u8]) -> ProgramResult {
    let instruction = RewardPoolInstruction::unpack(data).map_err(PoolError::from)?;
    let pool_info = role_account(accounts, &instruction, AccountRole::Pool)?;
    if !pool_info.data_is_empty() && pool_info.owner != program_id {
        return Err(ProgramError::IllegalOwner);
    }

    // Only recorded rewards and withdrawals carry a timestamp
    let unix_timestamp = match instruction {
        RewardPoolInstruction::RecordReward { .. } | RewardPoolInstruction::WithdrawReward { .. } => {
            Clock::get()?.unix_timestamp
        }
        _ => 0,
    };

    let inputs: Vec<AccountInput> = accounts.iter().map(AccountInput::from).collect();
    let (transition, mut log) = {
        let pool_data = pool_info.try_borrow_data()?;
        let log = MemoryRecordLog::load(pool_data.get(RewardPool::LEN..).unwrap_or(&[])).map_err(PoolError::from)?;
        let current = if pool_data.is_empty() { None } else { Some(&pool_data[..]) };
        let transition = processor::process_instruction(program_id, &inputs, data, current, &log, unix_timestamp)?;
        (transition, log)
    };

    if pool_info.data_is_empty() {
        create_pool_account(program_id, accounts, pool_info, &transition)?;
    }
    for effect in &transition.effects {
        carry_out(accounts, effect)?;
    }

    apply_writes(&mut log, &transition.writes).map_err(PoolError::from)?;
    let header = transition
        .pool
        .encode()
        .map_err(|_| ProgramError::AccountDataTooSmall)?;
    let mut pool_data = pool_info.try_borrow_mut_data()?;
    if pool_data.len() < header.len() {
        return Err(ProgramError::AccountDataTooSmall);
    }
    let (head, history) = pool_data.split_at_mut(header.len());
    head.copy_from_slice(&header);
    log.store(history).map_err(PoolError::from)?;

    msg!("{:?}", transition.event);
    Ok(())
}

fn role_account<'a, 'b>(
    accounts: &'b [AccountInfo<'a>],
    instruction: &RewardPoolInstruction,
    role: AccountRole,
) -> Result<&'b AccountInfo<'a>, ProgramError> {
    instruction
        .account_roles()
        .iter()
        .position(|spec| spec.role == role)
        .and_then(|index| accounts.get(index))
        .ok_or(ProgramError::NotEnoughAccountKeys)
}

fn account_by_key<'a, 'b>(accounts: &'b [AccountInfo<'a>], key: &Pubkey) -> Result<&'b AccountInfo<'a>, ProgramError> {
    accounts
        .iter()
        .find(|info| info.key == key)
        .ok_or(ProgramError::NotEnoughAccountKeys)
}

/// Allocates the pool PDA, paid for by the authority. As fee payer the
/// authority is writable at transaction level.
fn create_pool_account(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    pool_info: &AccountInfo,
    transition: &Transition,
) -> ProgramResult {
    let pool = &transition.pool;
    let rent = Rent::from_account_info(account_by_key(accounts, &sysvar::rent::ID)?)?;
    let create = system_instruction::create_account(
        &pool.platform_authority,
        pool_info.key,
        rent.minimum_balance(POOL_ACCOUNT_LEN),
        POOL_ACCOUNT_LEN as u64,
        program_id,
    );
    invoke_signed(
        &create,
        accounts,
        &[&[REWARD_POOL_SEED, pool.reward_mint.as_ref(), &[pool.bump_seed]]],
    )
}

fn carry_out(accounts: &[AccountInfo], effect: &TokenEffect) -> ProgramResult {
    match effect {
        // The client creates the account earlier in the same transaction
        TokenEffect::EnsureTokenAccount { address, .. } => {
            let info = account_by_key(accounts, address)?;
            if info.data_is_empty() || info.owner != &TOKEN_PROGRAM_ID {
                return Err(ProgramError::UninitializedAccount);
            }
            Ok(())
        }
        TokenEffect::Transfer { source, destination, authority, amount } => {
            let transfer = spl_token::instruction::transfer(&TOKEN_PROGRAM_ID, source, destination, authority, &[], *amount)?;
            invoke(&transfer, accounts)
        }
        TokenEffect::RetainFee { .. } => Ok(()),
    }
}
