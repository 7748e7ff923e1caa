//! Reward pool ledger.
//!
//! A platform authority records per-task rewards for farmers into a pool
//! keyed by reward mint. A platform fee is deducted at record time and the
//! pool keeps running totals of net rewards and fees. Farmers withdraw their
//! accrued balance, each `(farmer, nonce)` pair at most once, and the
//! authority can pause and resume the reward paths.
//!
//! [`processor::process_instruction`] validates an instruction and returns a
//! [`engine::Transition`] describing the new pool record, history writes and
//! token movements. [`entrypoint::process`] carries a transition out on
//! chain; off-chain hosts apply it themselves. Build with the
//! `no-entrypoint` feature to link the crate into another program or client.

use solana_program::declare_id;

pub mod accounting;
pub mod constants;
pub mod engine;
pub mod entrypoint;
pub mod errors;
pub mod events;
pub mod instruction;
pub mod processor;
pub mod record_log;
pub mod state;

pub use engine::{PoolSlot, TokenEffect, Transition};
pub use errors::{AccountingError, DecodeError, LogError, PoolError, ValidationError};
pub use events::PoolEvent;
pub use instruction::RewardPoolInstruction;
pub use record_log::{MemoryRecordLog, RecordLog, RecordWrite};
pub use state::{PendingReward, PoolStatus, RewardPool, WithdrawalRecord};

declare_id!("9YkP2HCTAj1CLCr2A1hwGvFS2ESouTDBiAb31Z9tGqNu");
