use proptest::prelude::*;
use reward_pool::errors::DecodeError;
use reward_pool::instruction::RewardPoolInstruction;
use reward_pool::state::{PendingReward, RewardPool, WithdrawalRecord};
use solana_program::pubkey::Pubkey;

fn pubkey() -> impl Strategy<Value = Pubkey> {
    any::<[u8; 32]>().prop_map(Pubkey::new_from_array)
}

prop_compose! {
    fn reward_pool()(
        platform_authority in pubkey(),
        reward_mint in pubkey(),
        platform_treasury in pubkey(),
        platform_fee_percentage in 0u8..=100,
        total_rewards_distributed in any::<u64>(),
        total_platform_fees_collected in any::<u64>(),
        is_paused in any::<bool>(),
        bump_seed in any::<u8>(),
    ) -> RewardPool {
        RewardPool {
            platform_authority,
            reward_mint,
            platform_treasury,
            platform_fee_percentage,
            total_rewards_distributed,
            total_platform_fees_collected,
            is_paused,
            bump_seed,
        }
    }
}

fn instruction() -> impl Strategy<Value = RewardPoolInstruction> {
    prop_oneof![
        any::<u8>().prop_map(|platform_fee_percentage| RewardPoolInstruction::InitializePool {
            platform_fee_percentage
        }),
        (any::<u64>(), pubkey(), "\\PC{0,64}").prop_map(|(amount, farmer_pubkey, task_id)| {
            RewardPoolInstruction::RecordReward { amount, farmer_pubkey, task_id }
        }),
        (any::<u64>(), any::<u64>())
            .prop_map(|(amount, nonce)| RewardPoolInstruction::WithdrawReward { amount, nonce }),
        any::<u8>().prop_map(|new_fee_percentage| RewardPoolInstruction::UpdatePlatformFee {
            new_fee_percentage
        }),
        Just(RewardPoolInstruction::PausePool),
        Just(RewardPoolInstruction::ResumePool),
    ]
}

proptest! {
    #[test]
    fn prop_pool_round_trip(pool in reward_pool()) {
        let bytes = pool.encode().unwrap();
        prop_assert_eq!(bytes.len(), RewardPool::LEN);
        prop_assert_eq!(RewardPool::decode(&bytes).unwrap(), pool);
    }

    #[test]
    fn prop_short_pool_record_rejected(pool in reward_pool(), cut in 0usize..RewardPool::LEN) {
        let bytes = pool.encode().unwrap();
        prop_assert_eq!(
            RewardPool::decode(&bytes[..cut]),
            Err(DecodeError::TooShort { expected: RewardPool::LEN, actual: cut })
        );
    }

    #[test]
    fn prop_instruction_round_trip(ix in instruction()) {
        let data = ix.pack().unwrap();
        prop_assert_eq!(data[0], ix.tag());
        prop_assert_eq!(RewardPoolInstruction::unpack(&data).unwrap(), ix);
    }

    #[test]
    fn prop_truncated_instruction_never_decodes(ix in instruction(), cut in 1usize..16) {
        let data = ix.pack().unwrap();
        prop_assume!(data.len() > 1 && cut < data.len());
        prop_assert!(RewardPoolInstruction::unpack(&data[..data.len() - cut]).is_err());
    }

    #[test]
    fn prop_unpack_arbitrary_bytes_does_not_panic(data in proptest::collection::vec(any::<u8>(), 0..128)) {
        let _ = RewardPoolInstruction::unpack(&data);
    }

    #[test]
    fn prop_decode_arbitrary_record_bytes_does_not_panic(data in proptest::collection::vec(any::<u8>(), 0..128)) {
        let _ = RewardPool::decode(&data);
        let _ = PendingReward::decode(&data);
        let _ = WithdrawalRecord::decode(&data);
    }

    #[test]
    fn prop_pending_reward_round_trip(
        farmer_pubkey in pubkey(),
        amount in any::<u64>(),
        task_id in "\\PC{1,64}",
        recorded_at in any::<i64>(),
        is_withdrawn in any::<bool>(),
    ) {
        let reward = PendingReward { farmer_pubkey, amount, task_id, recorded_at, is_withdrawn };
        let bytes = reward.encode().unwrap();
        prop_assert_eq!(bytes.len(), reward.encoded_len());
        prop_assert_eq!(PendingReward::decode(&bytes).unwrap(), reward);
    }

    #[test]
    fn prop_withdrawal_record_round_trip(
        farmer_pubkey in pubkey(),
        amount in any::<u64>(),
        nonce in any::<u64>(),
        withdrawn_at in any::<i64>(),
    ) {
        let record = WithdrawalRecord { farmer_pubkey, amount, nonce, withdrawn_at };
        prop_assert_eq!(WithdrawalRecord::decode(&record.encode().unwrap()).unwrap(), record);
    }
}
