use std::sync::Arc;

use async_trait::async_trait;
use reward_pool::constants::TOKEN_PROGRAM_ID;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use spl_associated_token_account_client::{
    address::get_associated_token_address_with_program_id,
    instruction::create_associated_token_account_idempotent,
};

use crate::ledger::{Ledger, TransportError};

/// Derives and provisions reward-bearing token accounts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenAccountService: Send + Sync {
    fn derive_account_address(&self, owner: &Pubkey, mint: &Pubkey) -> Pubkey;

    /// Returns the creation instruction when the account does not exist yet.
    async fn ensure_account_exists(
        &self,
        payer: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Option<Instruction>, TransportError>;
}

/// Associated token accounts, looked up through a ledger
pub struct AssociatedTokenService<L> {
    ledger: Arc<L>,
}

impl<L: Ledger> AssociatedTokenService<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl<L: Ledger> TokenAccountService for AssociatedTokenService<L> {
    fn derive_account_address(&self, owner: &Pubkey, mint: &Pubkey) -> Pubkey {
        get_associated_token_address_with_program_id(owner, mint, &TOKEN_PROGRAM_ID)
    }

    async fn ensure_account_exists(
        &self,
        payer: &Pubkey,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Option<Instruction>, TransportError> {
        let address = self.derive_account_address(owner, mint);
        if self.ledger.read_account(&address).await?.is_some() {
            return Ok(None);
        }

        Ok(Some(create_associated_token_account_idempotent(
            payer,
            owner,
            mint,
            &TOKEN_PROGRAM_ID,
        )))
    }
}
