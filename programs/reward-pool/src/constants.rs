use solana_program::pubkey::Pubkey;

/// PDA seed for the pool record: ["reward_pool", reward_mint]
pub const REWARD_POOL_SEED: &[u8] = b"reward_pool";

/// Fee percentages are whole percent, 0..=100
pub const MAX_PLATFORM_FEE_PERCENTAGE: u8 = 100;

/// Fee used by tooling when the operator does not pick one
pub const DEFAULT_PLATFORM_FEE_PERCENTAGE: u8 = 10;

/// Upper bound on task identifiers, in UTF-8 bytes
pub const MAX_TASK_ID_LEN: usize = 256;

/// Size of the on-chain pool account: the pool record followed by its
/// reward and withdrawal history. Capped at the largest account a program
/// may create through CPI.
pub const POOL_ACCOUNT_LEN: usize = 10_240;

/// SPL token program
pub const TOKEN_PROGRAM_ID: Pubkey = spl_token::ID;

/// SPL associated token account program
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = spl_associated_token_account_client::program::ID;

/// Offset of the amount field inside an SPL token account
pub const TOKEN_ACCOUNT_AMOUNT_OFFSET: usize = 64;
