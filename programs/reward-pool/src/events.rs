use solana_program::pubkey::Pubkey;

/// Emitted by every accepted transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    PoolInitialized {
        authority: Pubkey,
        reward_mint: Pubkey,
        platform_treasury: Pubkey,
        platform_fee_percentage: u8,
    },
    RewardRecorded {
        farmer: Pubkey,
        task_id: String,
        gross_amount: u64,
        net_amount: u64,
        platform_fee: u64,
        timestamp: i64,
    },
    RewardWithdrawn {
        farmer: Pubkey,
        amount: u64,
        nonce: u64,
        timestamp: i64,
    },
    PlatformFeeUpdated {
        old_fee_percentage: u8,
        new_fee_percentage: u8,
    },
    /// `changed` is false when the pool was already paused
    PoolPaused { changed: bool },
    /// `changed` is false when the pool was already active
    PoolResumed { changed: bool },
}
