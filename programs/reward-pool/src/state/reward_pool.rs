//! Pool record layout (little-endian, declaration order)
//!
//! ```text
//! Offset  Size    Description
//! ------  ----    -----------
//! 0       32      Platform authority
//! 32      32      Reward mint
//! 64      32      Platform treasury
//! 96      1       Platform fee percentage
//! 97      8       Total rewards distributed (u64)
//! 105     8       Total platform fees collected (u64)
//! 113     1       Paused flag (0 = active, 1 = paused)
//! 114     1       PDA bump seed
//! ```

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::constants::TOKEN_ACCOUNT_AMOUNT_OFFSET;
use crate::errors::DecodeError;

const PAUSED_OFFSET: usize = 113;

/// Reward Pool - one per reward mint, stored at its PDA
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardPool {
    pub platform_authority: Pubkey,
    pub reward_mint: Pubkey,
    pub platform_treasury: Pubkey,
    pub platform_fee_percentage: u8,
    pub total_rewards_distributed: u64,
    pub total_platform_fees_collected: u64,
    pub is_paused: bool,
    pub bump_seed: u8,
}

/// Logical pool state; gates reward recording and withdrawal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    Active,
    Paused,
}

impl RewardPool {
    pub const LEN: usize = 32 + // platform_authority
        32 +  // reward_mint
        32 +  // platform_treasury
        1 +   // platform_fee_percentage
        8 +   // total_rewards_distributed
        8 +   // total_platform_fees_collected
        1 +   // is_paused
        1;    // bump_seed

    pub fn status(&self) -> PoolStatus {
        if self.is_paused {
            PoolStatus::Paused
        } else {
            PoolStatus::Active
        }
    }

    pub fn encode(&self) -> borsh::io::Result<Vec<u8>> {
        borsh::to_vec(self)
    }

    /// Decodes the first [`RewardPool::LEN`] bytes; trailing bytes are ignored.
    /// Field values are taken as stored: range checks belong to the write path.
    /// Any non-zero paused byte reads as paused.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < Self::LEN {
            return Err(DecodeError::TooShort {
                expected: Self::LEN,
                actual: data.len(),
            });
        }

        let mut record = [0u8; Self::LEN];
        record.copy_from_slice(&data[..Self::LEN]);
        record[PAUSED_OFFSET] = u8::from(record[PAUSED_OFFSET] != 0);

        Self::try_from_slice(&record).map_err(|_| DecodeError::InvalidFlag)
    }
}

/// Reads the token amount out of an SPL token account.
pub fn token_account_balance(data: &[u8]) -> Result<u64, DecodeError> {
    let end = TOKEN_ACCOUNT_AMOUNT_OFFSET + 8;
    let amount = data.get(TOKEN_ACCOUNT_AMOUNT_OFFSET..end).ok_or(DecodeError::TooShort {
        expected: end,
        actual: data.len(),
    })?;
    u64::try_from_slice(amount).map_err(|_| DecodeError::TruncatedPayload)
}
