use crate::errors::AccountingError;
use crate::state::{PendingReward, WithdrawalRecord};

/// Result of deducting the platform fee from a gross amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub fee: u64,
    pub net: u64,
}

/// fee = floor(amount * fee_percent / 100), net = amount - fee.
///
/// The product is taken in u128 so amounts near `u64::MAX` cannot overflow.
/// Fee percentages are range-checked where they are written, so a value above
/// 100 only reaches this point through a corrupted record.
pub fn split(amount: u64, fee_percent: u8) -> Result<FeeSplit, AccountingError> {
    let fee = (amount as u128)
        .checked_mul(fee_percent as u128)
        .ok_or(AccountingError::Overflow)?
        / 100;

    let fee = u64::try_from(fee).map_err(|_| AccountingError::FeeExceedsAmount)?;
    let net = amount
        .checked_sub(fee)
        .ok_or(AccountingError::FeeExceedsAmount)?;

    Ok(FeeSplit { fee, net })
}

/// Adds to a running total, failing instead of wrapping.
pub fn checked_total(current: u64, delta: u64) -> Result<u64, AccountingError> {
    current.checked_add(delta).ok_or(AccountingError::Overflow)
}

/// Sum of a farmer's recorded net rewards minus everything already withdrawn.
pub fn withdrawable_balance<'a>(
    rewards: impl IntoIterator<Item = &'a PendingReward>,
    withdrawals: impl IntoIterator<Item = &'a WithdrawalRecord>,
) -> Result<u64, AccountingError> {
    let credited = rewards
        .into_iter()
        .try_fold(0u64, |acc, r| checked_total(acc, r.amount))?;
    let withdrawn = withdrawals
        .into_iter()
        .try_fold(0u64, |acc, w| checked_total(acc, w.amount))?;

    credited
        .checked_sub(withdrawn)
        .ok_or(AccountingError::Underflow)
}

/// Task ids of still-open rewards that a cumulative withdrawal total fully covers.
///
/// Rewards are consumed in record order; a partially covered reward stays open.
pub fn exhausted_rewards<'a>(
    rewards: impl IntoIterator<Item = &'a PendingReward>,
    total_withdrawn: u64,
) -> Result<Vec<String>, AccountingError> {
    let mut covered = 0u64;
    let mut exhausted = Vec::new();

    for reward in rewards {
        covered = checked_total(covered, reward.amount)?;
        if covered > total_withdrawn {
            break;
        }
        if !reward.is_withdrawn {
            exhausted.push(reward.task_id.clone());
        }
    }

    Ok(exhausted)
}
