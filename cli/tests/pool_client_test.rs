// End-to-end façade tests over the in-process ledger.

use std::sync::Arc;

use reward_pool::{PoolError, PoolEvent, ValidationError};
use reward_pool_cli::{AssociatedTokenService, LocalLedger, RewardPoolClient, TokenAccountService};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};

type LocalClient = RewardPoolClient<LocalLedger, AssociatedTokenService<LocalLedger>>;

const TREASURY_FUNDS: u64 = 10_000_000;

struct Setup {
    ledger: Arc<LocalLedger>,
    client: LocalClient,
    authority: Keypair,
    treasury: Pubkey,
    farmer: Keypair,
}

async fn setup(fee: u8) -> Setup {
    let ledger = Arc::new(LocalLedger::new());
    ledger.set_clock(1_700_000_000).unwrap();

    let mint = Pubkey::new_unique();
    let authority = Keypair::new();
    let treasury = Pubkey::new_unique();
    ledger
        .create_token_account(&treasury, &authority.pubkey(), &mint, TREASURY_FUNDS)
        .unwrap();

    let tokens = AssociatedTokenService::new(ledger.clone());
    let client = RewardPoolClient::new(ledger.clone(), tokens, ledger.program_id(), mint);
    client.initialize_pool(&authority, &treasury, fee).await.unwrap();

    Setup {
        ledger,
        client,
        authority,
        treasury,
        farmer: Keypair::new(),
    }
}

fn rejected_with(err: &reward_pool_cli::ClientError, expected: ValidationError) {
    assert_eq!(err.pool_error(), Some(PoolError::from(expected)));
    assert_eq!(err.code, Some(expected as u32));
}

#[tokio::test]
async fn test_record_then_withdraw_once() {
    let s = setup(10).await;
    let farmer = s.farmer.pubkey();

    assert_eq!(s.client.get_reward_balance(&farmer).await.unwrap(), None);

    s.client
        .record_reward(&s.authority, &s.treasury, &farmer, 1_000_000, "t1")
        .await
        .unwrap();

    let pool = s.client.get_pool_data().await.unwrap().unwrap();
    assert_eq!(pool.total_rewards_distributed, 900_000);
    assert_eq!(pool.total_platform_fees_collected, 100_000);

    // Reward account was created on demand and credited with the net amount
    assert_eq!(s.client.get_reward_balance(&farmer).await.unwrap(), Some(900_000));
    assert_eq!(
        s.ledger.token_balance(&s.treasury).unwrap(),
        Some(TREASURY_FUNDS - 900_000)
    );

    let destination = Pubkey::new_unique();
    s.client
        .withdraw_reward(&s.farmer, 900_000, 1, &destination)
        .await
        .unwrap();
    assert_eq!(s.client.get_reward_balance(&farmer).await.unwrap(), Some(0));
    assert_eq!(s.client.get_reward_balance(&destination).await.unwrap(), Some(900_000));

    let err = s
        .client
        .withdraw_reward(&s.farmer, 900_000, 1, &destination)
        .await
        .unwrap_err();
    rejected_with(&err, ValidationError::InvalidNonce);

    let log = s.ledger.record_log(&s.client.pool_address()).unwrap();
    assert_eq!(log.withdrawal_count(), 1);
    assert_eq!(log.reward_count(), 1);
}

#[tokio::test]
async fn test_fee_update_over_100_rejected() {
    let s = setup(10).await;
    let before = s.client.get_pool_data().await.unwrap();

    let err = s.client.update_platform_fee(&s.authority, 150).await.unwrap_err();
    rejected_with(&err, ValidationError::InvalidPlatformFee);
    assert_eq!(s.client.get_pool_data().await.unwrap(), before);
}

#[tokio::test]
async fn test_pause_blocks_reward_paths() {
    let s = setup(10).await;
    let farmer = s.farmer.pubkey();
    s.client
        .record_reward(&s.authority, &s.treasury, &farmer, 10_000, "t1")
        .await
        .unwrap();

    s.client.pause_pool(&s.authority).await.unwrap();
    s.client.pause_pool(&s.authority).await.unwrap();

    let err = s
        .client
        .record_reward(&s.authority, &s.treasury, &farmer, 10_000, "t2")
        .await
        .unwrap_err();
    rejected_with(&err, ValidationError::PoolPaused);

    let err = s
        .client
        .withdraw_reward(&s.farmer, 100, 1, &Pubkey::new_unique())
        .await
        .unwrap_err();
    rejected_with(&err, ValidationError::PoolPaused);

    s.client.update_platform_fee(&s.authority, 5).await.unwrap();
    s.client.resume_pool(&s.authority).await.unwrap();

    s.client
        .record_reward(&s.authority, &s.treasury, &farmer, 10_000, "t2")
        .await
        .unwrap();
    let pool = s.client.get_pool_data().await.unwrap().unwrap();
    assert!(!pool.is_paused);
    assert_eq!(pool.total_rewards_distributed, 9_000 + 9_500);
}

#[tokio::test]
async fn test_intruder_cannot_administer() {
    let s = setup(10).await;
    let intruder = Keypair::new();

    rejected_with(
        &s.client.pause_pool(&intruder).await.unwrap_err(),
        ValidationError::InvalidAuthority,
    );
    rejected_with(
        &s.client.update_platform_fee(&intruder, 0).await.unwrap_err(),
        ValidationError::InvalidAuthority,
    );
    rejected_with(
        &s.client
            .record_reward(&intruder, &s.treasury, &s.farmer.pubkey(), 100, "t1")
            .await
            .unwrap_err(),
        ValidationError::InvalidAuthority,
    );
}

#[tokio::test]
async fn test_withdraw_more_than_accrued() {
    let s = setup(0).await;
    let farmer = s.farmer.pubkey();
    s.client
        .record_reward(&s.authority, &s.treasury, &farmer, 500, "t1")
        .await
        .unwrap();

    let destination = Pubkey::new_unique();
    let err = s.client.withdraw_reward(&s.farmer, 501, 1, &destination).await.unwrap_err();
    rejected_with(&err, ValidationError::InsufficientAmount);

    // The rejected batch left no trace, so nonce 1 is still usable
    s.client.withdraw_reward(&s.farmer, 500, 1, &destination).await.unwrap();
}

#[tokio::test]
async fn test_withdraw_to_own_reward_account_keeps_balance() {
    let s = setup(10).await;
    let farmer = s.farmer.pubkey();
    s.client
        .record_reward(&s.authority, &s.treasury, &farmer, 1_000_000, "t1")
        .await
        .unwrap();

    let err = s
        .client
        .withdraw_reward(&s.farmer, 900_000, 1, &farmer)
        .await
        .unwrap_err();
    rejected_with(&err, ValidationError::InvalidDestinationAccount);

    let log = s.ledger.record_log(&s.client.pool_address()).unwrap();
    assert_eq!(log.withdrawal_count(), 0);
    assert_eq!(s.client.get_reward_balance(&farmer).await.unwrap(), Some(900_000));

    // The whole balance is still withdrawable to a real destination
    let destination = Pubkey::new_unique();
    s.client
        .withdraw_reward(&s.farmer, 900_000, 1, &destination)
        .await
        .unwrap();
    assert_eq!(s.client.get_reward_balance(&destination).await.unwrap(), Some(900_000));
}

#[tokio::test]
async fn test_second_initialize_rejected() {
    let s = setup(10).await;
    let err = s
        .client
        .initialize_pool(&s.authority, &s.treasury, 10)
        .await
        .unwrap_err();
    rejected_with(&err, ValidationError::AlreadyInitialized);
}

#[tokio::test]
async fn test_empty_treasury_fails_atomically() {
    let ledger = Arc::new(LocalLedger::new());
    let mint = Pubkey::new_unique();
    let authority = Keypair::new();
    let treasury = Pubkey::new_unique();
    ledger
        .create_token_account(&treasury, &authority.pubkey(), &mint, 10)
        .unwrap();

    let tokens = AssociatedTokenService::new(ledger.clone());
    let client = RewardPoolClient::new(ledger.clone(), tokens, ledger.program_id(), mint);
    client.initialize_pool(&authority, &treasury, 0).await.unwrap();

    let farmer = Pubkey::new_unique();
    let err = client
        .record_reward(&authority, &treasury, &farmer, 1_000, "t1")
        .await
        .unwrap_err();
    assert!(err.code.is_none());
    assert!(err.to_string().contains("Insufficient funds"));

    // Neither the account creation nor the reward survived
    assert_eq!(client.get_reward_balance(&farmer).await.unwrap(), None);
    let pool = client.get_pool_data().await.unwrap().unwrap();
    assert_eq!(pool.total_rewards_distributed, 0);
}

#[tokio::test]
async fn test_events_are_recorded_in_order() {
    let s = setup(10).await;
    s.client
        .record_reward(&s.authority, &s.treasury, &s.farmer.pubkey(), 100, "t1")
        .await
        .unwrap();
    s.client.pause_pool(&s.authority).await.unwrap();

    let events = s.ledger.events().unwrap();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], PoolEvent::PoolInitialized { platform_fee_percentage: 10, .. }));
    assert!(matches!(
        events[1],
        PoolEvent::RewardRecorded { net_amount: 90, platform_fee: 10, timestamp: 1_700_000_000, .. }
    ));
    assert_eq!(events[2], PoolEvent::PoolPaused { changed: true });
}

#[tokio::test]
async fn test_pools_per_mint_are_independent() {
    let a = setup(10).await;
    let b = setup(50).await;

    assert_ne!(a.client.pool_address(), b.client.pool_address());
    a.client.pause_pool(&a.authority).await.unwrap();
    assert!(!b.client.get_pool_data().await.unwrap().unwrap().is_paused);

    let tokens = AssociatedTokenService::new(a.ledger.clone());
    assert_eq!(
        a.client.reward_account(&a.farmer.pubkey()),
        tokens.derive_account_address(&a.farmer.pubkey(), &a.client.reward_mint())
    );
}
