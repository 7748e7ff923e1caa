use std::sync::Arc;

use reward_pool::instruction::{self, find_pool_address};
use reward_pool::state::{token_account_balance, RewardPool};
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use tracing::debug;

use crate::errors::ClientError;
use crate::ledger::Ledger;
use crate::token_accounts::TokenAccountService;

/// Client for one reward pool, identified by program id and reward mint
pub struct RewardPoolClient<L, T> {
    ledger: Arc<L>,
    tokens: T,
    program_id: Pubkey,
    reward_mint: Pubkey,
}

impl<L: Ledger, T: TokenAccountService> RewardPoolClient<L, T> {
    pub fn new(ledger: Arc<L>, tokens: T, program_id: Pubkey, reward_mint: Pubkey) -> Self {
        Self {
            ledger,
            tokens,
            program_id,
            reward_mint,
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub fn reward_mint(&self) -> Pubkey {
        self.reward_mint
    }

    pub fn pool_address(&self) -> Pubkey {
        find_pool_address(&self.program_id, &self.reward_mint).0
    }

    /// Reward-bearing account of `owner` for this pool's mint
    pub fn reward_account(&self, owner: &Pubkey) -> Pubkey {
        self.tokens.derive_account_address(owner, &self.reward_mint)
    }

    async fn submit(
        &self,
        operation: &str,
        instructions: Vec<Instruction>,
        signers: &[&Keypair],
    ) -> Result<Signature, ClientError> {
        debug!("{}: submitting {} instruction(s)", operation, instructions.len());
        self.ledger
            .apply_atomically(&instructions, signers)
            .await
            .map_err(|e| ClientError::from_transport(operation, e))
    }

    /// Creation instruction for `owner`'s reward account, if it is missing
    async fn ensure_reward_account(
        &self,
        operation: &str,
        payer: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Option<Instruction>, ClientError> {
        self.tokens
            .ensure_account_exists(payer, owner, &self.reward_mint)
            .await
            .map_err(|e| ClientError::from_transport(operation, e))
    }

    pub async fn initialize_pool(
        &self,
        authority: &Keypair,
        platform_treasury: &Pubkey,
        platform_fee_percentage: u8,
    ) -> Result<Signature, ClientError> {
        let ix = instruction::initialize_pool(
            &self.program_id,
            &authority.pubkey(),
            &self.reward_mint,
            platform_treasury,
            platform_fee_percentage,
        );
        self.submit("initialize_pool", vec![ix], &[authority]).await
    }

    pub async fn record_reward(
        &self,
        authority: &Keypair,
        platform_treasury: &Pubkey,
        farmer: &Pubkey,
        amount: u64,
        task_id: &str,
    ) -> Result<Signature, ClientError> {
        let mut instructions: Vec<Instruction> = self
            .ensure_reward_account("record_reward", &authority.pubkey(), farmer)
            .await?
            .into_iter()
            .collect();

        instructions.push(instruction::record_reward(
            &self.program_id,
            &authority.pubkey(),
            &self.reward_mint,
            platform_treasury,
            &self.reward_account(farmer),
            farmer,
            amount,
            task_id,
        ));
        self.submit("record_reward", instructions, &[authority]).await
    }

    /// Withdraws to the reward account of `destination_owner`, creating it when needed.
    pub async fn withdraw_reward(
        &self,
        farmer: &Keypair,
        amount: u64,
        nonce: u64,
        destination_owner: &Pubkey,
    ) -> Result<Signature, ClientError> {
        let mut instructions: Vec<Instruction> = self
            .ensure_reward_account("withdraw_reward", &farmer.pubkey(), destination_owner)
            .await?
            .into_iter()
            .collect();

        instructions.push(instruction::withdraw_reward(
            &self.program_id,
            &farmer.pubkey(),
            &self.reward_mint,
            &self.reward_account(&farmer.pubkey()),
            &self.reward_account(destination_owner),
            amount,
            nonce,
        ));
        self.submit("withdraw_reward", instructions, &[farmer]).await
    }

    pub async fn update_platform_fee(
        &self,
        authority: &Keypair,
        new_fee_percentage: u8,
    ) -> Result<Signature, ClientError> {
        let ix = instruction::update_platform_fee(
            &self.program_id,
            &authority.pubkey(),
            &self.reward_mint,
            new_fee_percentage,
        );
        self.submit("update_platform_fee", vec![ix], &[authority]).await
    }

    pub async fn pause_pool(&self, authority: &Keypair) -> Result<Signature, ClientError> {
        let ix = instruction::pause_pool(&self.program_id, &authority.pubkey(), &self.reward_mint);
        self.submit("pause_pool", vec![ix], &[authority]).await
    }

    pub async fn resume_pool(&self, authority: &Keypair) -> Result<Signature, ClientError> {
        let ix = instruction::resume_pool(&self.program_id, &authority.pubkey(), &self.reward_mint);
        self.submit("resume_pool", vec![ix], &[authority]).await
    }

    /// Current pool record, `None` before initialization
    pub async fn get_pool_data(&self) -> Result<Option<RewardPool>, ClientError> {
        let data = self
            .ledger
            .read_account(&self.pool_address())
            .await
            .map_err(|e| ClientError::from_transport("get_pool_data", e))?;

        match data {
            Some(bytes) if !bytes.iter().all(|b| *b == 0) => RewardPool::decode(&bytes)
                .map(Some)
                .map_err(|e| ClientError::from_decode("get_pool_data", e)),
            _ => Ok(None),
        }
    }

    /// Token balance of `owner`'s reward account, `None` if it does not exist
    pub async fn get_reward_balance(&self, owner: &Pubkey) -> Result<Option<u64>, ClientError> {
        let data = self
            .ledger
            .read_account(&self.reward_account(owner))
            .await
            .map_err(|e| ClientError::from_transport("get_reward_balance", e))?;

        data.map(|bytes| token_account_balance(&bytes))
            .transpose()
            .map_err(|e| ClientError::from_decode("get_reward_balance", e))
    }
}
