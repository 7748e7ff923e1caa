//! In-process ledger host.
//!
//! Runs the reward pool state machine against in-memory accounts with the
//! same all-or-nothing batch semantics as a real cluster. Used for dry runs
//! and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reward_pool::constants::{ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_PROGRAM_ID};
use reward_pool::instruction::{AccountRole, RewardPoolInstruction};
use reward_pool::processor::{process_instruction, AccountInput};
use reward_pool::record_log::apply_writes;
use reward_pool::state::token_account_balance;
use reward_pool::{MemoryRecordLog, PoolError, PoolEvent, TokenEffect, ValidationError};
use solana_sdk::{
    hash::hash,
    instruction::Instruction,
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use spl_associated_token_account_client::address::get_associated_token_address_with_program_id;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::{Account as TokenAccount, AccountState};
use tracing::debug;

use crate::ledger::{first_required_signer, Ledger, TransportError};

/// Initialized SPL token account bytes
pub fn token_account_data(mint: &Pubkey, owner: &Pubkey, amount: u64) -> Vec<u8> {
    let account = TokenAccount {
        mint: *mint,
        owner: *owner,
        amount,
        state: AccountState::Initialized,
        ..TokenAccount::default()
    };
    let mut data = vec![0u8; TokenAccount::LEN];
    account.pack_into_slice(&mut data);
    data
}

fn unpack_token_account(address: &Pubkey, data: &[u8]) -> Result<TokenAccount, TransportError> {
    TokenAccount::unpack(data).map_err(|_| TransportError::TokenAccountNotFound(*address))
}

fn rejected(err: impl Into<PoolError>) -> TransportError {
    TransportError::ProgramRejected(err.into())
}

#[derive(Debug, Clone, Default)]
struct LedgerState {
    accounts: HashMap<Pubkey, Vec<u8>>,
    /// History per pool address
    logs: HashMap<Pubkey, MemoryRecordLog>,
    events: Vec<PoolEvent>,
    clock: Option<i64>,
    slot: u64,
}

impl LedgerState {
    fn now(&self) -> i64 {
        self.clock.unwrap_or_else(|| chrono::Utc::now().timestamp())
    }

    fn execute(&mut self, program_id: &Pubkey, ix: &Instruction) -> Result<(), TransportError> {
        if ix.program_id == *program_id {
            self.execute_pool(program_id, ix)
        } else if ix.program_id == ASSOCIATED_TOKEN_PROGRAM_ID {
            self.create_associated_account(ix)
        } else {
            Err(TransportError::UnsupportedProgram(ix.program_id))
        }
    }

    fn execute_pool(&mut self, program_id: &Pubkey, ix: &Instruction) -> Result<(), TransportError> {
        let decoded = RewardPoolInstruction::unpack(&ix.data).map_err(rejected)?;
        let pool_key = decoded
            .account_roles()
            .iter()
            .position(|spec| spec.role == AccountRole::Pool)
            .and_then(|index| ix.accounts.get(index))
            .map(|meta| meta.pubkey)
            .ok_or_else(|| rejected(ValidationError::NotEnoughAccountKeys))?;

        let inputs: Vec<AccountInput> = ix.accounts.iter().map(AccountInput::from).collect();
        let empty = MemoryRecordLog::new();
        let transition = process_instruction(
            program_id,
            &inputs,
            &ix.data,
            self.accounts.get(&pool_key).map(Vec::as_slice),
            self.logs.get(&pool_key).unwrap_or(&empty),
            self.now(),
        )
        .map_err(rejected)?;

        for effect in &transition.effects {
            self.apply_effect(effect)?;
        }

        apply_writes(self.logs.entry(pool_key).or_default(), &transition.writes).map_err(rejected)?;
        let pool_data = transition
            .pool
            .encode()
            .map_err(|e| TransportError::Unavailable(format!("pool encoding failed: {}", e)))?;
        self.accounts.insert(pool_key, pool_data);
        self.events.push(transition.event);
        Ok(())
    }

    fn apply_effect(&mut self, effect: &TokenEffect) -> Result<(), TransportError> {
        match *effect {
            TokenEffect::EnsureTokenAccount { owner, mint, address } => {
                self.accounts
                    .entry(address)
                    .or_insert_with(|| token_account_data(&mint, &owner, 0));
            }
            TokenEffect::Transfer { source, destination, authority, amount } => {
                self.transfer(&source, &destination, &authority, amount)?;
            }
            TokenEffect::RetainFee { treasury, amount } => {
                debug!("Fee of {} retained in treasury {}", amount, treasury);
            }
        }
        Ok(())
    }

    fn transfer(
        &mut self,
        source: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
    ) -> Result<(), TransportError> {
        let mut source_account = self
            .accounts
            .get(source)
            .ok_or(TransportError::TokenAccountNotFound(*source))
            .and_then(|data| unpack_token_account(source, data))?;
        if source_account.owner != *authority {
            return Err(TransportError::OwnerMismatch(*source));
        }
        let mut destination_account = self
            .accounts
            .get(destination)
            .ok_or(TransportError::TokenAccountNotFound(*destination))
            .and_then(|data| unpack_token_account(destination, data))?;

        if source_account.amount < amount {
            return Err(TransportError::InsufficientFunds(*source));
        }
        if source == destination {
            return Ok(());
        }

        destination_account.amount = destination_account
            .amount
            .checked_add(amount)
            .ok_or_else(|| rejected(reward_pool::AccountingError::Overflow))?;
        source_account.amount -= amount;
        self.store_token_account(source, &source_account);
        self.store_token_account(destination, &destination_account);
        Ok(())
    }

    fn store_token_account(&mut self, address: &Pubkey, account: &TokenAccount) {
        if let Some(data) = self.accounts.get_mut(address) {
            account.pack_into_slice(data);
        }
    }

    /// Idempotent associated token account creation.
    /// Accounts: [payer, associated account, wallet, mint, system program, token program]
    fn create_associated_account(&mut self, ix: &Instruction) -> Result<(), TransportError> {
        let key = |index: usize| {
            ix.accounts
                .get(index)
                .map(|meta| meta.pubkey)
                .ok_or_else(|| TransportError::Rpc {
                    message: "associated token account instruction is missing accounts".to_string(),
                    code: None,
                })
        };
        let address = key(1)?;
        let owner = key(2)?;
        let mint = key(3)?;

        if address != get_associated_token_address_with_program_id(&owner, &mint, &TOKEN_PROGRAM_ID) {
            return Err(TransportError::Rpc {
                message: format!("{} is not the associated token account of {}", address, owner),
                code: None,
            });
        }

        self.accounts
            .entry(address)
            .or_insert_with(|| token_account_data(&mint, &owner, 0));
        Ok(())
    }
}

/// In-memory ledger host for the reward pool program
pub struct LocalLedger {
    program_id: Pubkey,
    state: Mutex<LedgerState>,
}

impl Default for LocalLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalLedger {
    pub fn new() -> Self {
        Self::with_program_id(reward_pool::id())
    }

    pub fn with_program_id(program_id: Pubkey) -> Self {
        Self {
            program_id,
            state: Mutex::new(LedgerState::default()),
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LedgerState>, TransportError> {
        self.state
            .lock()
            .map_err(|_| TransportError::Unavailable("ledger state lock poisoned".to_string()))
    }

    /// Pins the clock used for record timestamps
    pub fn set_clock(&self, unix_timestamp: i64) -> Result<(), TransportError> {
        self.lock()?.clock = Some(unix_timestamp);
        Ok(())
    }

    /// Creates a token account at `address` holding `amount`, replacing any existing one.
    pub fn create_token_account(
        &self,
        address: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
        amount: u64,
    ) -> Result<(), TransportError> {
        self.lock()?
            .accounts
            .insert(*address, token_account_data(mint, owner, amount));
        Ok(())
    }

    pub fn token_balance(&self, address: &Pubkey) -> Result<Option<u64>, TransportError> {
        let state = self.lock()?;
        Ok(state
            .accounts
            .get(address)
            .and_then(|data| token_account_balance(data).ok()))
    }

    /// Snapshot of a pool's history
    pub fn record_log(&self, pool: &Pubkey) -> Result<MemoryRecordLog, TransportError> {
        Ok(self.lock()?.logs.get(pool).cloned().unwrap_or_default())
    }

    /// Events of every accepted transition, oldest first
    pub fn events(&self) -> Result<Vec<PoolEvent>, TransportError> {
        Ok(self.lock()?.events.clone())
    }
}

#[async_trait]
impl Ledger for LocalLedger {
    async fn apply_atomically(
        &self,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> Result<Signature, TransportError> {
        let payer = signers
            .first()
            .ok_or_else(|| TransportError::MissingSignature(first_required_signer(instructions)))?;

        let mut state = self.lock()?;
        let mut next = state.clone();

        for ix in instructions {
            for meta in ix.accounts.iter().filter(|meta| meta.is_signer) {
                if !signers.iter().any(|kp| kp.pubkey() == meta.pubkey) {
                    return Err(TransportError::MissingSignature(meta.pubkey));
                }
            }
            next.execute(&self.program_id, ix)?;
        }

        next.slot += 1;
        let message = Message::new_with_blockhash(
            instructions,
            Some(&payer.pubkey()),
            &hash(&next.slot.to_le_bytes()),
        );
        *state = next;

        debug!("Applied {} instruction(s) at slot {}", instructions.len(), state.slot);
        Ok(payer.sign_message(&message.serialize()))
    }

    async fn read_account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.lock()?.accounts.get(address).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reward_pool::instruction;
    use spl_associated_token_account_client::address::get_associated_token_address;
    use spl_associated_token_account_client::instruction::create_associated_token_account_idempotent;

    #[test]
    fn test_token_account_data_layout() {
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let data = token_account_data(&mint, &owner, 42);

        assert_eq!(data.len(), TokenAccount::LEN);
        let account = TokenAccount::unpack(&data).unwrap();
        assert_eq!(account.mint, mint);
        assert_eq!(account.owner, owner);
        assert_eq!(account.state, AccountState::Initialized);
        assert_eq!(token_account_balance(&data).unwrap(), 42);
    }

    #[tokio::test]
    async fn test_unsigned_batch_rejected() {
        let ledger = LocalLedger::new();
        let authority = Keypair::new();
        let other = Keypair::new();
        let ix = instruction::pause_pool(&ledger.program_id(), &authority.pubkey(), &Pubkey::new_unique());

        let err = ledger.apply_atomically(&[ix], &[&other]).await.unwrap_err();
        assert_eq!(err, TransportError::MissingSignature(authority.pubkey()));
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_no_trace() {
        let ledger = LocalLedger::new();
        let authority = Keypair::new();
        let mint = Pubkey::new_unique();
        let treasury = Pubkey::new_unique();

        let init = instruction::initialize_pool(&ledger.program_id(), &authority.pubkey(), &mint, &treasury, 10);
        let bad_fee = instruction::update_platform_fee(&ledger.program_id(), &authority.pubkey(), &mint, 150);

        let err = ledger.apply_atomically(&[init, bad_fee], &[&authority]).await.unwrap_err();
        assert_eq!(
            err,
            TransportError::ProgramRejected(ValidationError::InvalidPlatformFee.into())
        );

        let (pool, _) = instruction::find_pool_address(&ledger.program_id(), &mint);
        assert!(ledger.read_account(&pool).await.unwrap().is_none());
        assert!(ledger.events().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_associated_account_is_idempotent() {
        let ledger = LocalLedger::new();
        let payer = Keypair::new();
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ix = create_associated_token_account_idempotent(&payer.pubkey(), &owner, &mint, &TOKEN_PROGRAM_ID);

        ledger.apply_atomically(&[ix.clone()], &[&payer]).await.unwrap();
        let address = get_associated_token_address(&owner, &mint);
        assert_eq!(ledger.token_balance(&address).unwrap(), Some(0));

        ledger.create_token_account(&address, &owner, &mint, 7).unwrap();
        ledger.apply_atomically(&[ix], &[&payer]).await.unwrap();
        assert_eq!(ledger.token_balance(&address).unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_unknown_program_rejected() {
        let ledger = LocalLedger::new();
        let payer = Keypair::new();
        let program = Pubkey::new_unique();
        let ix = Instruction {
            program_id: program,
            accounts: vec![],
            data: vec![],
        };

        let err = ledger.apply_atomically(&[ix], &[&payer]).await.unwrap_err();
        assert_eq!(err, TransportError::UnsupportedProgram(program));
    }
}
