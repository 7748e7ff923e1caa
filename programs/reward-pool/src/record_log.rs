//! Append-only storage for reward and withdrawal history.
//!
//! The state machine only reads through [`RecordLog`] and proposes
//! [`RecordWrite`]s; the host commits them with [`apply_writes`] once the
//! whole transition has been accepted.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::errors::{DecodeError, LogError};
use crate::state::{PendingReward, WithdrawalRecord};

/// A write proposed by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordWrite {
    AppendPendingReward(PendingReward),
    AppendWithdrawal(WithdrawalRecord),
    MarkWithdrawn { farmer: Pubkey, task_id: String },
}

pub trait RecordLog {
    /// A farmer's rewards in the order they were recorded
    fn pending_rewards<'a>(&'a self, farmer: &Pubkey)
        -> Box<dyn Iterator<Item = &'a PendingReward> + 'a>;

    fn pending_reward(&self, farmer: &Pubkey, task_id: &str) -> Option<&PendingReward>;

    fn withdrawals<'a>(&'a self, farmer: &Pubkey)
        -> Box<dyn Iterator<Item = &'a WithdrawalRecord> + 'a>;

    fn withdrawal(&self, farmer: &Pubkey, nonce: u64) -> Option<&WithdrawalRecord>;

    fn append_pending_reward(&mut self, reward: PendingReward) -> Result<(), LogError>;

    fn append_withdrawal(&mut self, record: WithdrawalRecord) -> Result<(), LogError>;

    /// Flips `is_withdrawn`; a reward is never un-marked or removed
    fn mark_withdrawn(&mut self, farmer: &Pubkey, task_id: &str) -> Result<(), LogError>;
}

/// Commits a transition's writes in order.
pub fn apply_writes<L: RecordLog + ?Sized>(log: &mut L, writes: &[RecordWrite]) -> Result<(), LogError> {
    for write in writes {
        match write {
            RecordWrite::AppendPendingReward(reward) => log.append_pending_reward(reward.clone())?,
            RecordWrite::AppendWithdrawal(record) => log.append_withdrawal(*record)?,
            RecordWrite::MarkWithdrawn { farmer, task_id } => log.mark_withdrawn(farmer, task_id)?,
        }
    }
    Ok(())
}

/// In-memory log, one per pool.
///
/// The borsh form is the rewards (grouped by farmer, each farmer's in record
/// order) followed by the withdrawals. Indexes are rebuilt on load, so a
/// serialized log with duplicate keys is rejected.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordLog {
    rewards: BTreeMap<Pubkey, Vec<PendingReward>>,
    reward_index: BTreeMap<(Pubkey, String), usize>,
    withdrawals: BTreeMap<(Pubkey, u64), WithdrawalRecord>,
}

impl MemoryRecordLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reward_count(&self) -> usize {
        self.reward_index.len()
    }

    pub fn withdrawal_count(&self) -> usize {
        self.withdrawals.len()
    }

    /// Reads a log stored in an account region. A zero-filled region is empty.
    pub fn load(region: &[u8]) -> Result<Self, DecodeError> {
        if region.is_empty() {
            return Ok(Self::new());
        }
        Self::deserialize(&mut &region[..]).map_err(|_| DecodeError::TruncatedPayload)
    }

    /// Writes the log to the front of `region`; bytes past it are left as they are.
    pub fn store(&self, region: &mut [u8]) -> Result<(), LogError> {
        let bytes = borsh::to_vec(self).map_err(|_| LogError::CapacityExceeded)?;
        let target = region
            .get_mut(..bytes.len())
            .ok_or(LogError::CapacityExceeded)?;
        target.copy_from_slice(&bytes);
        Ok(())
    }
}

fn length_prefix(len: usize) -> borsh::io::Result<u32> {
    u32::try_from(len).map_err(|_| {
        borsh::io::Error::new(borsh::io::ErrorKind::InvalidData, "too many records")
    })
}

impl BorshSerialize for MemoryRecordLog {
    fn serialize<W: borsh::io::Write>(&self, writer: &mut W) -> borsh::io::Result<()> {
        length_prefix(self.reward_count())?.serialize(writer)?;
        for reward in self.rewards.values().flatten() {
            reward.serialize(writer)?;
        }

        length_prefix(self.withdrawal_count())?.serialize(writer)?;
        for record in self.withdrawals.values() {
            record.serialize(writer)?;
        }
        Ok(())
    }
}

impl BorshDeserialize for MemoryRecordLog {
    fn deserialize_reader<R: borsh::io::Read>(reader: &mut R) -> borsh::io::Result<Self> {
        let rewards = Vec::<PendingReward>::deserialize_reader(reader)?;
        let withdrawals = Vec::<WithdrawalRecord>::deserialize_reader(reader)?;

        let rejected = |e: LogError| borsh::io::Error::new(borsh::io::ErrorKind::InvalidData, e.to_string());
        let mut log = Self::new();
        for reward in rewards {
            log.append_pending_reward(reward).map_err(rejected)?;
        }
        for record in withdrawals {
            log.append_withdrawal(record).map_err(rejected)?;
        }
        Ok(log)
    }
}

impl RecordLog for MemoryRecordLog {
    fn pending_rewards<'a>(
        &'a self,
        farmer: &Pubkey,
    ) -> Box<dyn Iterator<Item = &'a PendingReward> + 'a> {
        match self.rewards.get(farmer) {
            Some(rewards) => Box::new(rewards.iter()),
            None => Box::new(std::iter::empty()),
        }
    }

    fn pending_reward(&self, farmer: &Pubkey, task_id: &str) -> Option<&PendingReward> {
        let idx = *self.reward_index.get(&(*farmer, task_id.to_string()))?;
        self.rewards.get(farmer)?.get(idx)
    }

    fn withdrawals<'a>(
        &'a self,
        farmer: &Pubkey,
    ) -> Box<dyn Iterator<Item = &'a WithdrawalRecord> + 'a> {
        Box::new(
            self.withdrawals
                .range((*farmer, 0)..=(*farmer, u64::MAX))
                .map(|(_, record)| record),
        )
    }

    fn withdrawal(&self, farmer: &Pubkey, nonce: u64) -> Option<&WithdrawalRecord> {
        self.withdrawals.get(&(*farmer, nonce))
    }

    fn append_pending_reward(&mut self, reward: PendingReward) -> Result<(), LogError> {
        let key = (reward.farmer_pubkey, reward.task_id.clone());
        if self.reward_index.contains_key(&key) {
            return Err(LogError::DuplicateReward);
        }

        let rewards = self.rewards.entry(reward.farmer_pubkey).or_default();
        self.reward_index.insert(key, rewards.len());
        rewards.push(reward);
        Ok(())
    }

    fn append_withdrawal(&mut self, record: WithdrawalRecord) -> Result<(), LogError> {
        let key = (record.farmer_pubkey, record.nonce);
        if self.withdrawals.contains_key(&key) {
            return Err(LogError::DuplicateWithdrawal);
        }
        self.withdrawals.insert(key, record);
        Ok(())
    }

    fn mark_withdrawn(&mut self, farmer: &Pubkey, task_id: &str) -> Result<(), LogError> {
        let idx = *self
            .reward_index
            .get(&(*farmer, task_id.to_string()))
            .ok_or(LogError::UnknownReward)?;
        let reward = self
            .rewards
            .get_mut(farmer)
            .and_then(|rewards| rewards.get_mut(idx))
            .ok_or(LogError::UnknownReward)?;
        reward.is_withdrawn = true;
        Ok(())
    }
}
