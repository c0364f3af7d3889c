//! Queue Engine Integration Tests
//!
//! Drives the full service stack (queue service + SQLite adapters) through
//! the walk-in scenario: join, serve, skip, wait estimates, pagination,
//! pause semantics, and the manual secret-gated reset.

use std::sync::Arc;

use waitless_core::application::QueueService;
use waitless_core::domain::{ShopQueue, TokenStatus};
use waitless_core::error::AppError;
use waitless_core::port::id_provider::SequentialIdProvider;
use waitless_core::port::secret_verifier::PlainSecretVerifier;
use waitless_core::port::time_provider::{FixedTimeProvider, TimeProvider};
use waitless_core::port::{BroadcastPublisher, QueueEvent, QueueRepository};
use waitless_infra_sqlite::{create_pool, run_migrations, SqliteQueueRepository};

// 2024-01-15 12:00:00 UTC
const NOON: i64 = 1_705_320_000_000;

struct Harness {
    service: QueueService,
    repo: Arc<SqliteQueueRepository>,
    publisher: Arc<BroadcastPublisher>,
    clock: Arc<FixedTimeProvider>,
    _dir: tempfile::TempDir,
}

async fn setup() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("queue.db").display());
    let pool = create_pool(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let repo = Arc::new(SqliteQueueRepository::new(pool));
    let publisher = Arc::new(BroadcastPublisher::new(64));
    let clock = Arc::new(FixedTimeProvider::new(NOON));

    let service = QueueService::new(
        repo.clone(),
        repo.clone(),
        publisher.clone(),
        Arc::new(SequentialIdProvider::new()),
        clock.clone(),
        Arc::new(PlainSecretVerifier),
        0,
    );

    Harness {
        service,
        repo,
        publisher,
        clock,
        _dir: dir,
    }
}

async fn seed_shop(h: &Harness, shop_id: &str) {
    h.repo
        .insert_shop(&ShopQueue::new(shop_id, h.clock.now_millis()))
        .await
        .unwrap();
}

#[tokio::test]
async fn walk_in_scenario_join_serve_skip() {
    let h = setup().await;
    seed_shop(&h, "barber-1").await;

    // Three customers pull tickets
    for expected in 1..=3 {
        let token = h.service.join("barber-1").await.unwrap();
        assert_eq!(token, expected);
    }

    let status = h.service.status("barber-1").await.unwrap();
    assert_eq!(status.current_token, 0);
    assert_eq!(status.next_token, 4);
    assert_eq!(status.waiting, 3);
    assert_eq!(status.served_today, 0);

    // Serve the first
    let result = h
        .service
        .next_customer("barber-1", Some("staff-7"))
        .await
        .unwrap();
    assert_eq!(result.current_token, 1);
    assert_eq!(result.waiting, 2);
    assert_eq!(result.served_today, 1);

    let entry = h.repo.find_token("barber-1", 1).await.unwrap().unwrap();
    assert_eq!(entry.status, TokenStatus::Served);
    assert_eq!(entry.served_by.as_deref(), Some("staff-7"));

    // Second customer never shows; skipping does not count as served
    let result = h.service.skip_customer("barber-1").await.unwrap();
    assert_eq!(result.current_token, 2);
    assert_eq!(result.waiting, 1);

    let entry = h.repo.find_token("barber-1", 2).await.unwrap().unwrap();
    assert_eq!(entry.status, TokenStatus::Missed);

    let status = h.service.status("barber-1").await.unwrap();
    assert_eq!(status.served_today, 1);
}

#[tokio::test]
async fn wait_time_estimate() {
    let h = setup().await;
    seed_shop(&h, "barber-1").await;

    for _ in 0..5 {
        h.service.join("barber-1").await.unwrap();
    }
    h.service.next_customer("barber-1", None).await.unwrap();
    h.service.next_customer("barber-1", None).await.unwrap();

    // current = 2, avg 5.0 minutes: token 5 has tokens 3 and 4 ahead
    let estimate = h.service.wait_time("barber-1", 5).await.unwrap();
    assert_eq!(estimate.tokens_ahead, 2);
    assert_eq!(estimate.estimated_minutes, 10.0);
    assert_eq!(estimate.avg_service_time, 5.0);

    // The token being served waits zero
    let estimate = h.service.wait_time("barber-1", 2).await.unwrap();
    assert_eq!(estimate.tokens_ahead, 0);
    assert_eq!(estimate.estimated_minutes, 0.0);

    // Already-served numbers clamp to zero rather than go negative
    let estimate = h.service.wait_time("barber-1", 1).await.unwrap();
    assert_eq!(estimate.tokens_ahead, 0);
}

#[tokio::test]
async fn generate_and_claim_paid_tokens() {
    let h = setup().await;
    seed_shop(&h, "barber-1").await;

    let token = h.service.generate_paid_token("barber-1").await.unwrap();
    assert_eq!(token, 1);
    let token = h.service.generate_paid_token("barber-1").await.unwrap();
    assert_eq!(token, 2);

    // Claims attach to the oldest unclaimed waiting token
    let claimed = h.service.claim_token("barber-1", "pay-a").await.unwrap();
    assert_eq!(claimed, 1);
    let claimed = h.service.claim_token("barber-1", "pay-b").await.unwrap();
    assert_eq!(claimed, 2);

    let entry = h.repo.find_token("barber-1", 1).await.unwrap().unwrap();
    assert_eq!(entry.payment_id.as_deref(), Some("pay-a"));

    // Nothing left to claim
    let err = h
        .service
        .claim_token("barber-1", "pay-c")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Payment reference is required
    let err = h.service.claim_token("barber-1", "").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn history_pages_newest_first_with_clamped_limit() {
    let h = setup().await;
    seed_shop(&h, "barber-1").await;

    for i in 0..25 {
        h.clock.set(NOON + i);
        h.service.join("barber-1").await.unwrap();
    }

    let page = h.service.history("barber-1", 1, 10).await.unwrap();
    assert_eq!(page.tokens.len(), 10);
    assert_eq!(page.tokens[0].token_number, 25);
    assert_eq!(page.tokens[9].token_number, 16);
    assert_eq!(page.total_count, 25);
    assert_eq!(page.total_pages, 3);
    assert!(page.has_more);

    let page = h.service.history("barber-1", 3, 10).await.unwrap();
    assert_eq!(page.tokens.len(), 5);
    assert!(!page.has_more);

    // Oversized limits clamp to 100, non-positive ones fall back to 20
    let page = h.service.history("barber-1", 1, 500).await.unwrap();
    assert_eq!(page.limit, 100);
    let page = h.service.history("barber-1", 1, 0).await.unwrap();
    assert_eq!(page.limit, 20);

    // Page below 1 is treated as the first page
    let page = h.service.history("barber-1", 0, 10).await.unwrap();
    assert_eq!(page.page, 1);
    assert_eq!(page.tokens[0].token_number, 25);
}

#[tokio::test]
async fn pause_blocks_service_but_not_joining() {
    let h = setup().await;
    seed_shop(&h, "barber-1").await;
    h.service.join("barber-1").await.unwrap();

    assert!(h.service.pause("barber-1").await.unwrap());

    // Customers may still pull tickets while paused
    let token = h.service.join("barber-1").await.unwrap();
    assert_eq!(token, 2);

    // Advancing and issuing-for-payment are refused
    for err in [
        h.service.next_customer("barber-1", None).await.unwrap_err(),
        h.service.skip_customer("barber-1").await.unwrap_err(),
        h.service.generate_paid_token("barber-1").await.unwrap_err(),
        h.service.claim_token("barber-1", "pay-a").await.unwrap_err(),
    ] {
        assert!(matches!(err, AppError::Unavailable(_)));
    }

    assert!(!h.service.resume("barber-1").await.unwrap());
    let result = h.service.next_customer("barber-1", None).await.unwrap();
    assert_eq!(result.current_token, 1);
}

#[tokio::test]
async fn pause_and_resume_publish_distinct_events() {
    let h = setup().await;
    seed_shop(&h, "barber-1").await;
    let mut rx = h.publisher.subscribe();

    h.service.pause("barber-1").await.unwrap();
    h.service.resume("barber-1").await.unwrap();

    assert_eq!(
        rx.recv().await.unwrap(),
        QueueEvent::QueuePaused {
            shop_id: "barber-1".to_string(),
            pause_state: true,
        }
    );
    assert_eq!(
        rx.recv().await.unwrap(),
        QueueEvent::QueueResumed {
            shop_id: "barber-1".to_string(),
            pause_state: false,
        }
    );
}

#[tokio::test]
async fn join_publishes_queue_update() {
    let h = setup().await;
    seed_shop(&h, "barber-1").await;
    let mut rx = h.publisher.subscribe();

    h.service.join("barber-1").await.unwrap();

    match rx.recv().await.unwrap() {
        QueueEvent::QueueUpdate(snapshot) => {
            assert_eq!(snapshot.shop_id, "barber-1");
            assert_eq!(snapshot.current_token, 0);
            assert_eq!(snapshot.waiting, 1);
            assert!(snapshot.reset_notice.is_none());
        }
        other => panic!("Expected queue update, got {:?}", other),
    }

    // The join update is read back after the issue commits, so it carries
    // the counters as they stand, not as they were before the join
    h.service.next_customer("barber-1", None).await.unwrap();
    rx.recv().await.unwrap();
    h.service.join("barber-1").await.unwrap();

    match rx.recv().await.unwrap() {
        QueueEvent::QueueUpdate(snapshot) => {
            assert_eq!(snapshot.current_token, 1);
            assert_eq!(snapshot.waiting, 1);
            assert_eq!(snapshot.served_today, 1);
        }
        other => panic!("Expected queue update, got {:?}", other),
    }
}

#[tokio::test]
async fn manual_reset_is_secret_gated() {
    let h = setup().await;
    let mut shop = ShopQueue::new("barber-1", NOON);
    shop.reset_secret_hash = Some("letmein".to_string());
    h.repo.insert_shop(&shop).await.unwrap();

    for _ in 0..3 {
        h.service.join("barber-1").await.unwrap();
    }
    h.service.next_customer("barber-1", None).await.unwrap();

    let err = h.service.reset_tokens("barber-1", "").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = h
        .service
        .reset_tokens("barber-1", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    // State untouched by the failed attempts
    assert_eq!(h.service.status("barber-1").await.unwrap().waiting, 2);

    let status = h.service.reset_tokens("barber-1", "letmein").await.unwrap();
    assert_eq!(status.current_token, 0);
    assert_eq!(status.next_token, 1);
    assert_eq!(status.served_today, 0);

    // Manual reset purges the whole ledger, today's rows included
    assert_eq!(h.repo.count_tokens("barber-1").await.unwrap(), 0);
}

#[tokio::test]
async fn manual_reset_without_configured_secret_is_rejected() {
    let h = setup().await;
    seed_shop(&h, "barber-1").await;

    let err = h
        .service
        .reset_tokens("barber-1", "anything")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn unknown_shop_is_not_found_everywhere() {
    let h = setup().await;

    assert!(matches!(
        h.service.status("ghost").await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        h.service.join("ghost").await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        h.service.wait_time("ghost", 1).await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        h.service.pause("ghost").await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        h.service.history("ghost", 1, 10).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn empty_shop_id_is_a_validation_error() {
    let h = setup().await;

    assert!(matches!(
        h.service.join("").await.unwrap_err(),
        AppError::Validation(_)
    ));
    assert!(matches!(
        h.service.pause("").await.unwrap_err(),
        AppError::Validation(_)
    ));

    // The lookup-only paths reject an empty id the same way, rather than
    // reporting a shop named "" as missing
    assert!(matches!(
        h.service.wait_time("", 1).await.unwrap_err(),
        AppError::Validation(_)
    ));
    assert!(matches!(
        h.service.reset_tokens("", "secret").await.unwrap_err(),
        AppError::Validation(_)
    ));
    assert!(matches!(
        h.service.history("", 1, 10).await.unwrap_err(),
        AppError::Validation(_)
    ));
}

#[tokio::test]
async fn argon2_verifier_gates_manual_reset() {
    // Same flow as above but through the production hash
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("queue.db").display());
    let pool = create_pool(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let repo = Arc::new(SqliteQueueRepository::new(pool));
    let clock = Arc::new(FixedTimeProvider::new(NOON));
    let service = QueueService::new(
        repo.clone(),
        repo.clone(),
        Arc::new(BroadcastPublisher::new(8)),
        Arc::new(SequentialIdProvider::new()),
        clock,
        Arc::new(waitless_infra_auth::Argon2SecretVerifier),
        0,
    );

    let mut shop = ShopQueue::new("barber-1", NOON);
    shop.reset_secret_hash = Some(waitless_infra_auth::hash_secret("s3cret").unwrap());
    repo.insert_shop(&shop).await.unwrap();

    assert!(matches!(
        service.reset_tokens("barber-1", "wrong").await.unwrap_err(),
        AppError::Unauthorized(_)
    ));
    let status = service.reset_tokens("barber-1", "s3cret").await.unwrap();
    assert_eq!(status.current_token, 0);
}
