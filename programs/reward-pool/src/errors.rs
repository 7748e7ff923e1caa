use solana_program::program_error::ProgramError;
use thiserror::Error;

/// Malformed bytes on either the account or the instruction path.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Buffer too short: need {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("Malformed instruction data")]
    MalformedInstruction,

    #[error("Declared payload runs past the end of the buffer")]
    TruncatedPayload,

    #[error("Task id is not valid UTF-8")]
    InvalidUtf8,

    #[error("Boolean flag must be 0 or 1")]
    InvalidFlag,
}

/// Preconditions that reject an instruction without touching state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Pool already initialized")]
    AlreadyInitialized,

    #[error("Pool not initialized")]
    PoolNotInitialized,

    #[error("Invalid authority")]
    InvalidAuthority,

    #[error("Insufficient amount")]
    InsufficientAmount,

    #[error("Pool paused")]
    PoolPaused,

    #[error("Invalid nonce")]
    InvalidNonce,

    #[error("Invalid platform fee (must be 0-100)")]
    InvalidPlatformFee,

    #[error("Invalid treasury account")]
    InvalidTreasuryAccount,

    #[error("Platform authority must sign")]
    MissingAuthoritySignature,

    #[error("Reward mint does not match the pool")]
    InvalidMint,

    #[error("Pool address does not match its derivation")]
    InvalidPoolAddress,

    #[error("Reward account is not the farmer's associated token account")]
    InvalidRewardAccount,

    #[error("Unexpected program or sysvar account")]
    InvalidProgramAccount,

    #[error("Task id must be 1-256 bytes")]
    InvalidTaskId,

    #[error("Reward already recorded for this farmer and task")]
    RewardAlreadyRecorded,

    #[error("Not enough account keys for instruction")]
    NotEnoughAccountKeys,

    #[error("Account must be writable")]
    AccountNotWritable,

    #[error("Destination must differ from the farmer's reward account")]
    InvalidDestinationAccount,
}

/// Fee and balance arithmetic failures. Always fatal to the transition.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountingError {
    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("Fee exceeds amount")]
    FeeExceedsAmount,
}

/// Append-only log rejected a write.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogError {
    #[error("Reward already present in log")]
    DuplicateReward,

    #[error("Withdrawal nonce already present in log")]
    DuplicateWithdrawal,

    #[error("Reward not found in log")]
    UnknownReward,

    #[error("History does not fit in the pool account")]
    CapacityExceeded,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Accounting(#[from] AccountingError),

    #[error(transparent)]
    Log(#[from] LogError),
}

impl PoolError {
    /// Stable numeric code reported through the host runtime.
    pub fn code(&self) -> u32 {
        match self {
            PoolError::Validation(e) => *e as u32,
            PoolError::Decode(e) => {
                100 + match e {
                    DecodeError::TooShort { .. } => 0,
                    DecodeError::MalformedInstruction => 1,
                    DecodeError::TruncatedPayload => 2,
                    DecodeError::InvalidUtf8 => 3,
                    DecodeError::InvalidFlag => 4,
                }
            }
            PoolError::Accounting(e) => 200 + *e as u32,
            PoolError::Log(e) => 300 + *e as u32,
        }
    }

    /// Inverse of [`PoolError::code`]. `TooShort` loses its sizes on the way.
    pub fn from_code(code: u32) -> Option<Self> {
        use ValidationError::*;
        let err = match code {
            0 => AlreadyInitialized.into(),
            1 => PoolNotInitialized.into(),
            2 => InvalidAuthority.into(),
            3 => InsufficientAmount.into(),
            4 => PoolPaused.into(),
            5 => InvalidNonce.into(),
            6 => InvalidPlatformFee.into(),
            7 => InvalidTreasuryAccount.into(),
            8 => MissingAuthoritySignature.into(),
            9 => InvalidMint.into(),
            10 => InvalidPoolAddress.into(),
            11 => InvalidRewardAccount.into(),
            12 => InvalidProgramAccount.into(),
            13 => InvalidTaskId.into(),
            14 => RewardAlreadyRecorded.into(),
            15 => NotEnoughAccountKeys.into(),
            16 => AccountNotWritable.into(),
            17 => InvalidDestinationAccount.into(),
            100 => DecodeError::TooShort { expected: 0, actual: 0 }.into(),
            101 => DecodeError::MalformedInstruction.into(),
            102 => DecodeError::TruncatedPayload.into(),
            103 => DecodeError::InvalidUtf8.into(),
            104 => DecodeError::InvalidFlag.into(),
            200 => AccountingError::Overflow.into(),
            201 => AccountingError::Underflow.into(),
            202 => AccountingError::FeeExceedsAmount.into(),
            300 => LogError::DuplicateReward.into(),
            301 => LogError::DuplicateWithdrawal.into(),
            302 => LogError::UnknownReward.into(),
            303 => LogError::CapacityExceeded.into(),
            _ => return None,
        };
        Some(err)
    }
}

impl From<PoolError> for ProgramError {
    fn from(e: PoolError) -> Self {
        ProgramError::Custom(e.code())
    }
}

impl From<ValidationError> for ProgramError {
    fn from(e: ValidationError) -> Self {
        PoolError::from(e).into()
    }
}
