//! History records kept alongside the pool.
//!
//! ```text
//! PendingReward                         WithdrawalRecord
//! Offset  Size  Description             Offset  Size  Description
//! 0       32    Farmer                  0       32    Farmer
//! 32      8     Net amount (u64)        32      8     Amount (u64)
//! 40      4     Task id length (u32)    40      8     Nonce (u64)
//! 44      N     Task id (UTF-8)         48      8     Withdrawn at (i64)
//! 44+N    8     Recorded at (i64)
//! 52+N    1     Withdrawn flag
//! ```

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::errors::DecodeError;

const TASK_LEN_OFFSET: usize = 40;
const TASK_OFFSET: usize = 44;

/// A net reward credited to a farmer for one task
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct PendingReward {
    pub farmer_pubkey: Pubkey,
    pub amount: u64,
    pub task_id: String,
    pub recorded_at: i64,
    pub is_withdrawn: bool,
}

impl PendingReward {
    /// Everything except the task id bytes
    pub const FIXED_LEN: usize = 32 + 8 + 4 + 8 + 1;

    pub fn encoded_len(&self) -> usize {
        Self::FIXED_LEN + self.task_id.len()
    }

    pub fn encode(&self) -> borsh::io::Result<Vec<u8>> {
        borsh::to_vec(self)
    }

    /// Decodes one record from the front of `data`; trailing bytes are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < Self::FIXED_LEN {
            return Err(DecodeError::TooShort {
                expected: Self::FIXED_LEN,
                actual: data.len(),
            });
        }

        let task_len = u32::try_from_slice(&data[TASK_LEN_OFFSET..TASK_OFFSET])
            .map_err(|_| DecodeError::TruncatedPayload)? as usize;
        if data.len() - Self::FIXED_LEN < task_len {
            return Err(DecodeError::TruncatedPayload);
        }

        let task_end = TASK_OFFSET + task_len;
        if std::str::from_utf8(&data[TASK_OFFSET..task_end]).is_err() {
            return Err(DecodeError::InvalidUtf8);
        }
        if data[task_end + 8] > 1 {
            return Err(DecodeError::InvalidFlag);
        }

        Self::deserialize(&mut &data[..]).map_err(|_| DecodeError::TruncatedPayload)
    }
}

/// One accepted withdrawal; (farmer, nonce) is unique across the pool
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalRecord {
    pub farmer_pubkey: Pubkey,
    pub amount: u64,
    pub nonce: u64,
    pub withdrawn_at: i64,
}

impl WithdrawalRecord {
    pub const LEN: usize = 32 + 8 + 8 + 8;

    pub fn encode(&self) -> borsh::io::Result<Vec<u8>> {
        borsh::to_vec(self)
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < Self::LEN {
            return Err(DecodeError::TooShort {
                expected: Self::LEN,
                actual: data.len(),
            });
        }
        Self::try_from_slice(&data[..Self::LEN]).map_err(|_| DecodeError::TruncatedPayload)
    }
}
