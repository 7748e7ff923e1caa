//! Instruction wire format and account role tables.
//!
//! Every instruction is one tag byte followed by a little-endian payload:
//!
//! ```text
//! Tag  Instruction         Payload
//! ---  -----------         -------
//! 0    InitializePool      fee%(1)
//! 1    RecordReward        amount(8) farmer(32) task_len(4) task_id(N)
//! 2    WithdrawReward      amount(8) nonce(8)
//! 3    UpdatePlatformFee   new_fee%(1)
//! 4    PausePool           -
//! 5    ResumePool          -
//! ```

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};

use crate::constants::{ASSOCIATED_TOKEN_PROGRAM_ID, REWARD_POOL_SEED, TOKEN_PROGRAM_ID};
use crate::errors::DecodeError;

/// Borsh encoding: the variant index is the tag byte.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum RewardPoolInstruction {
    /// Initializes a new reward pool
    InitializePool { platform_fee_percentage: u8 },

    /// Records a reward for a farmer; the platform fee is deducted here
    RecordReward {
        amount: u64,
        farmer_pubkey: Pubkey,
        task_id: String,
    },

    /// Withdraws accrued rewards; each nonce is accepted once per farmer
    WithdrawReward { amount: u64, nonce: u64 },

    /// Updates the platform fee (admin only)
    UpdatePlatformFee { new_fee_percentage: u8 },

    /// Pauses the pool (admin only)
    PausePool,

    /// Resumes the pool (admin only)
    ResumePool,
}

/// Position-independent name for each account an instruction expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountRole {
    Authority,
    Pool,
    Mint,
    Treasury,
    RentSysvar,
    SystemProgram,
    TokenProgram,
    AssociatedTokenProgram,
    Farmer,
    FarmerRewardAccount,
    FarmerDestinationAccount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSpec {
    pub role: AccountRole,
    pub is_signer: bool,
    pub is_writable: bool,
}

const fn signer(role: AccountRole) -> RoleSpec {
    RoleSpec { role, is_signer: true, is_writable: false }
}

const fn writable(role: AccountRole) -> RoleSpec {
    RoleSpec { role, is_signer: false, is_writable: true }
}

const fn readonly(role: AccountRole) -> RoleSpec {
    RoleSpec { role, is_signer: false, is_writable: false }
}

pub const INITIALIZE_POOL_ACCOUNTS: &[RoleSpec] = &[
    signer(AccountRole::Authority),
    writable(AccountRole::Pool),
    readonly(AccountRole::Mint),
    writable(AccountRole::Treasury),
    readonly(AccountRole::RentSysvar),
    readonly(AccountRole::SystemProgram),
    readonly(AccountRole::TokenProgram),
    readonly(AccountRole::AssociatedTokenProgram),
];

pub const RECORD_REWARD_ACCOUNTS: &[RoleSpec] = &[
    signer(AccountRole::Authority),
    writable(AccountRole::Pool),
    writable(AccountRole::Treasury),
    writable(AccountRole::FarmerRewardAccount),
    readonly(AccountRole::Mint),
    readonly(AccountRole::TokenProgram),
    readonly(AccountRole::AssociatedTokenProgram),
];

pub const WITHDRAW_REWARD_ACCOUNTS: &[RoleSpec] = &[
    signer(AccountRole::Farmer),
    writable(AccountRole::Pool),
    writable(AccountRole::FarmerRewardAccount),
    writable(AccountRole::FarmerDestinationAccount),
    readonly(AccountRole::Mint),
    readonly(AccountRole::TokenProgram),
    readonly(AccountRole::AssociatedTokenProgram),
];

pub const ADMIN_ACCOUNTS: &[RoleSpec] = &[
    signer(AccountRole::Authority),
    writable(AccountRole::Pool),
];

impl RewardPoolInstruction {
    pub fn tag(&self) -> u8 {
        match self {
            Self::InitializePool { .. } => 0,
            Self::RecordReward { .. } => 1,
            Self::WithdrawReward { .. } => 2,
            Self::UpdatePlatformFee { .. } => 3,
            Self::PausePool => 4,
            Self::ResumePool => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::InitializePool { .. } => "InitializePool",
            Self::RecordReward { .. } => "RecordReward",
            Self::WithdrawReward { .. } => "WithdrawReward",
            Self::UpdatePlatformFee { .. } => "UpdatePlatformFee",
            Self::PausePool => "PausePool",
            Self::ResumePool => "ResumePool",
        }
    }

    /// Ordered account list this instruction must be invoked with
    pub fn account_roles(&self) -> &'static [RoleSpec] {
        match self {
            Self::InitializePool { .. } => INITIALIZE_POOL_ACCOUNTS,
            Self::RecordReward { .. } => RECORD_REWARD_ACCOUNTS,
            Self::WithdrawReward { .. } => WITHDRAW_REWARD_ACCOUNTS,
            Self::UpdatePlatformFee { .. } | Self::PausePool | Self::ResumePool => ADMIN_ACCOUNTS,
        }
    }

    pub fn pack(&self) -> borsh::io::Result<Vec<u8>> {
        borsh::to_vec(self)
    }

    pub fn unpack(data: &[u8]) -> Result<Self, DecodeError> {
        let (&tag, rest) = data.split_first().ok_or(DecodeError::MalformedInstruction)?;

        let fixed_len = match tag {
            0 | 3 => 1,
            1 => RECORD_REWARD_FIXED_LEN,
            2 => 16,
            4 | 5 => 0,
            _ => return Err(DecodeError::MalformedInstruction),
        };
        if rest.len() < fixed_len {
            return Err(DecodeError::MalformedInstruction);
        }

        if tag == 1 {
            let task_len = u32::try_from_slice(&rest[RECORD_REWARD_FIXED_LEN - 4..RECORD_REWARD_FIXED_LEN])
                .map_err(|_| DecodeError::MalformedInstruction)? as usize;
            if rest.len() - RECORD_REWARD_FIXED_LEN < task_len {
                return Err(DecodeError::TruncatedPayload);
            }
        }

        // Rejects trailing bytes and task ids that are not UTF-8
        Self::try_from_slice(data).map_err(|_| DecodeError::MalformedInstruction)
    }
}

/// RecordReward payload before the task id: amount, farmer, task id length
const RECORD_REWARD_FIXED_LEN: usize = 8 + 32 + 4;

/// Pool PDA for a reward mint
pub fn find_pool_address(program_id: &Pubkey, reward_mint: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[REWARD_POOL_SEED, reward_mint.as_ref()], program_id)
}

/// Builds the account metas for `roles`, in order, resolving each key with `key_for`.
pub fn account_metas(roles: &[RoleSpec], key_for: impl Fn(AccountRole) -> Pubkey) -> Vec<AccountMeta> {
    roles
        .iter()
        .map(|spec| {
            let key = key_for(spec.role);
            if spec.is_writable {
                AccountMeta::new(key, spec.is_signer)
            } else {
                AccountMeta::new_readonly(key, spec.is_signer)
            }
        })
        .collect()
}

/// Expected key for program and sysvar roles
pub fn well_known_account(role: AccountRole) -> Option<Pubkey> {
    match role {
        AccountRole::RentSysvar => Some(sysvar::rent::ID),
        AccountRole::SystemProgram => Some(system_program::ID),
        AccountRole::TokenProgram => Some(TOKEN_PROGRAM_ID),
        AccountRole::AssociatedTokenProgram => Some(ASSOCIATED_TOKEN_PROGRAM_ID),
        _ => None,
    }
}

fn build(
    program_id: &Pubkey,
    instruction: RewardPoolInstruction,
    key_for: impl Fn(AccountRole) -> Pubkey,
) -> Instruction {
    let accounts = account_metas(instruction.account_roles(), |role| {
        well_known_account(role).unwrap_or_else(|| key_for(role))
    });
    Instruction::new_with_borsh(*program_id, &instruction, accounts)
}

pub fn initialize_pool(
    program_id: &Pubkey,
    authority: &Pubkey,
    reward_mint: &Pubkey,
    platform_treasury: &Pubkey,
    platform_fee_percentage: u8,
) -> Instruction {
    let (pool, _) = find_pool_address(program_id, reward_mint);
    build(
        program_id,
        RewardPoolInstruction::InitializePool { platform_fee_percentage },
        |role| match role {
            AccountRole::Authority => *authority,
            AccountRole::Pool => pool,
            AccountRole::Mint => *reward_mint,
            _ => *platform_treasury,
        },
    )
}

pub fn record_reward(
    program_id: &Pubkey,
    authority: &Pubkey,
    reward_mint: &Pubkey,
    platform_treasury: &Pubkey,
    farmer_reward_account: &Pubkey,
    farmer: &Pubkey,
    amount: u64,
    task_id: &str,
) -> Instruction {
    let (pool, _) = find_pool_address(program_id, reward_mint);
    build(
        program_id,
        RewardPoolInstruction::RecordReward {
            amount,
            farmer_pubkey: *farmer,
            task_id: task_id.to_string(),
        },
        |role| match role {
            AccountRole::Authority => *authority,
            AccountRole::Pool => pool,
            AccountRole::Treasury => *platform_treasury,
            AccountRole::FarmerRewardAccount => *farmer_reward_account,
            _ => *reward_mint,
        },
    )
}

pub fn withdraw_reward(
    program_id: &Pubkey,
    farmer: &Pubkey,
    reward_mint: &Pubkey,
    farmer_reward_account: &Pubkey,
    destination: &Pubkey,
    amount: u64,
    nonce: u64,
) -> Instruction {
    let (pool, _) = find_pool_address(program_id, reward_mint);
    build(
        program_id,
        RewardPoolInstruction::WithdrawReward { amount, nonce },
        |role| match role {
            AccountRole::Farmer => *farmer,
            AccountRole::Pool => pool,
            AccountRole::FarmerRewardAccount => *farmer_reward_account,
            AccountRole::FarmerDestinationAccount => *destination,
            _ => *reward_mint,
        },
    )
}

fn admin(
    program_id: &Pubkey,
    authority: &Pubkey,
    reward_mint: &Pubkey,
    instruction: RewardPoolInstruction,
) -> Instruction {
    let (pool, _) = find_pool_address(program_id, reward_mint);
    build(program_id, instruction, |role| match role {
        AccountRole::Authority => *authority,
        _ => pool,
    })
}

pub fn update_platform_fee(
    program_id: &Pubkey,
    authority: &Pubkey,
    reward_mint: &Pubkey,
    new_fee_percentage: u8,
) -> Instruction {
    admin(
        program_id,
        authority,
        reward_mint,
        RewardPoolInstruction::UpdatePlatformFee { new_fee_percentage },
    )
}

pub fn pause_pool(program_id: &Pubkey, authority: &Pubkey, reward_mint: &Pubkey) -> Instruction {
    admin(program_id, authority, reward_mint, RewardPoolInstruction::PausePool)
}

pub fn resume_pool(program_id: &Pubkey, authority: &Pubkey, reward_mint: &Pubkey) -> Instruction {
    admin(program_id, authority, reward_mint, RewardPoolInstruction::ResumePool)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn farmer() -> Pubkey {
        Pubkey::new_from_array([5; 32])
    }

    #[test]
    fn test_tags() {
        assert_eq!(RewardPoolInstruction::InitializePool { platform_fee_percentage: 1 }.pack().unwrap(), vec![0, 1]);
        assert_eq!(RewardPoolInstruction::UpdatePlatformFee { new_fee_percentage: 7 }.pack().unwrap(), vec![3, 7]);
        assert_eq!(RewardPoolInstruction::PausePool.pack().unwrap(), vec![4]);
        assert_eq!(RewardPoolInstruction::ResumePool.pack().unwrap(), vec![5]);
    }

    #[test]
    fn test_record_reward_layout() {
        let ix = RewardPoolInstruction::RecordReward {
            amount: 1_000_000,
            farmer_pubkey: farmer(),
            task_id: "t1".to_string(),
        };
        let data = ix.pack().unwrap();

        assert_eq!(data.len(), 1 + 8 + 32 + 4 + 2);
        assert_eq!(data[0], 1);
        assert_eq!(&data[1..9], &1_000_000u64.to_le_bytes());
        assert_eq!(&data[9..41], &[5u8; 32]);
        assert_eq!(&data[41..45], &2u32.to_le_bytes());
        assert_eq!(&data[45..], b"t1");
        assert_eq!(RewardPoolInstruction::unpack(&data).unwrap(), ix);
    }

    #[test]
    fn test_withdraw_layout() {
        let data = RewardPoolInstruction::WithdrawReward { amount: 900_000, nonce: 1 }.pack().unwrap();
        assert_eq!(data.len(), 17);
        assert_eq!(&data[9..17], &1u64.to_le_bytes());
    }

    #[test]
    fn test_unpack_empty_and_unknown_tag() {
        assert_eq!(RewardPoolInstruction::unpack(&[]), Err(DecodeError::MalformedInstruction));
        assert_eq!(RewardPoolInstruction::unpack(&[6]), Err(DecodeError::MalformedInstruction));
        assert_eq!(RewardPoolInstruction::unpack(&[255, 0]), Err(DecodeError::MalformedInstruction));
    }

    #[test]
    fn test_unpack_short_fixed_prefix() {
        assert_eq!(RewardPoolInstruction::unpack(&[0]), Err(DecodeError::MalformedInstruction));
        assert_eq!(RewardPoolInstruction::unpack(&[2, 1, 2, 3]), Err(DecodeError::MalformedInstruction));
        assert_eq!(RewardPoolInstruction::unpack(&[1; 40]), Err(DecodeError::MalformedInstruction));
    }

    #[test]
    fn test_unpack_truncated_task_id() {
        let mut data = RewardPoolInstruction::RecordReward {
            amount: 5,
            farmer_pubkey: farmer(),
            task_id: "abcdef".to_string(),
        }
        .pack()
        .unwrap();
        data.truncate(data.len() - 2);
        assert_eq!(RewardPoolInstruction::unpack(&data), Err(DecodeError::TruncatedPayload));
    }

    #[test]
    fn test_unpack_rejects_trailing_bytes() {
        assert_eq!(RewardPoolInstruction::unpack(&[4, 0]), Err(DecodeError::MalformedInstruction));
        assert_eq!(RewardPoolInstruction::unpack(&[3, 10, 0]), Err(DecodeError::MalformedInstruction));
    }

    #[test]
    fn test_unpack_invalid_utf8_task() {
        let mut data = RewardPoolInstruction::RecordReward {
            amount: 5,
            farmer_pubkey: farmer(),
            task_id: "ab".to_string(),
        }
        .pack()
        .unwrap();
        let last = data.len() - 1;
        data[last] = 0xFF;
        assert_eq!(RewardPoolInstruction::unpack(&data), Err(DecodeError::MalformedInstruction));
    }

    #[test]
    fn test_role_tables() {
        assert_eq!(INITIALIZE_POOL_ACCOUNTS.len(), 8);
        assert_eq!(RECORD_REWARD_ACCOUNTS.len(), 7);
        assert_eq!(WITHDRAW_REWARD_ACCOUNTS.len(), 7);
        assert_eq!(ADMIN_ACCOUNTS.len(), 2);

        assert_eq!(INITIALIZE_POOL_ACCOUNTS[2], readonly(AccountRole::Mint));
        assert_eq!(INITIALIZE_POOL_ACCOUNTS[3], writable(AccountRole::Treasury));
        assert_eq!(WITHDRAW_REWARD_ACCOUNTS[0], signer(AccountRole::Farmer));
        assert_eq!(WITHDRAW_REWARD_ACCOUNTS[3], writable(AccountRole::FarmerDestinationAccount));
    }

    #[test]
    fn test_builder_matches_role_table() {
        let program_id = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let treasury = Pubkey::new_unique();
        let ix = initialize_pool(&program_id, &authority, &mint, &treasury, 10);

        let (pool, _) = find_pool_address(&program_id, &mint);
        let keys: Vec<Pubkey> = ix.accounts.iter().map(|m| m.pubkey).collect();
        assert_eq!(
            keys,
            vec![
                authority,
                pool,
                mint,
                treasury,
                sysvar::rent::ID,
                system_program::ID,
                TOKEN_PROGRAM_ID,
                ASSOCIATED_TOKEN_PROGRAM_ID,
            ]
        );
        for (meta, spec) in ix.accounts.iter().zip(INITIALIZE_POOL_ACCOUNTS) {
            assert_eq!(meta.is_signer, spec.is_signer);
            assert_eq!(meta.is_writable, spec.is_writable);
        }
        assert_eq!(ix.data, vec![0, 10]);
    }

    #[test]
    fn test_admin_builders_share_accounts() {
        let program_id = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let pause = pause_pool(&program_id, &authority, &mint);
        let resume = resume_pool(&program_id, &authority, &mint);
        let fee = update_platform_fee(&program_id, &authority, &mint, 5);

        assert_eq!(pause.accounts, resume.accounts);
        assert_eq!(pause.accounts, fee.accounts);
        assert!(pause.accounts[0].is_signer);
        assert!(pause.accounts[1].is_writable);
    }
}
