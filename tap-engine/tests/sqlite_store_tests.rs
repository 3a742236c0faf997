mod test_helpers;

use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use tap_core::{EngineEventBus, ManualClock, UserStore};
use tap_engine::identity::StaticIdentity;
use tap_engine::{EngineDeps, TapEngine};
use tap_persistence::UserRepository;
use tap_persistence::connection::connect_to_memory_database;
use tap_types::{RewardError, TaskKind, UpgradeId};
use test_helpers::*;

async fn sqlite_store() -> Arc<UserRepository> {
    let db = connect_to_memory_database().await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    Arc::new(UserRepository::new(db))
}

async fn start(store: Arc<UserRepository>, clock: ManualClock, id: i64) -> TapEngine {
    let deps = EngineDeps {
        store,
        clock: Arc::new(clock),
        events: EngineEventBus::new(),
    };
    TapEngine::start(&test_config(), &StaticIdentity::new(launch(id)), deps)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_session_round_trip_through_sqlite() {
    let store = sqlite_store().await;
    let clock = ManualClock::new(start_instant());

    let engine = start(store.clone(), clock.clone(), 42).await;
    for _ in 0..30 {
        engine.taps.tap();
    }
    assert_eq!(engine.taps.flush().await, Ok(30));
    engine.scheduler.check_in().await.unwrap();
    engine.tasks.complete(TaskKind::FollowX).await.unwrap();
    engine.scheduler.activate_faucet().await.unwrap();
    assert_eq!(engine.shutdown().await, Ok(0));

    let stored = store.get_user(42).await.unwrap().unwrap();
    assert_eq!(stored.username, "player42");
    assert_eq!(stored.balance, 30 + 500 + 300);
    assert_eq!(stored.taps_remaining, 970);
    assert_eq!(stored.check_in_count, 1);
    assert_eq!(stored.last_check_in_date, Some(start_day()));
    assert!(stored.tasks.follow_x_done);
    assert!(stored.next_faucet_claim_at.is_some());

    // A later session picks up where this one stopped
    let engine = start(store.clone(), clock, 42).await;
    assert_eq!(engine.session.mirror().snapshot(), stored);
}

#[tokio::test]
async fn test_concurrent_purchases_are_serialized() {
    let store = sqlite_store().await;
    let clock = ManualClock::new(start_instant());
    let engine = start(store.clone(), clock, 7).await;

    // Only the first 1000 taps have energy
    for _ in 0..3000 {
        engine.taps.tap();
    }
    engine.taps.flush().await.unwrap();
    assert_eq!(store.get_user(7).await.unwrap().unwrap().balance, 1000);

    assert_eq!(engine.session.mirror().taps_remaining(), 0);

    engine.tasks.complete(TaskKind::WatchAd).await.unwrap();
    engine.tasks.complete(TaskKind::WatchAd).await.unwrap();
    engine.tasks.complete(TaskKind::WatchAd).await.unwrap();
    engine.scheduler.check_in().await.unwrap();
    engine.tasks.complete(TaskKind::FollowTelegram).await.unwrap();
    engine.tasks.complete(TaskKind::FollowX).await.unwrap();
    // Enough for exactly one of the two
    assert_eq!(engine.session.mirror().balance(), 2700);

    let (first, second) = futures::future::join(
        engine.coordinator.purchase_upgrade(UpgradeId::FaucetRate),
        engine.coordinator.purchase_upgrade(UpgradeId::FaucetRate),
    )
    .await;

    let succeeded = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(
        [first, second]
            .into_iter()
            .any(|r| matches!(r, Err(RewardError::InsufficientBalance { .. })))
    );

    let stored = store.get_user(7).await.unwrap().unwrap();
    assert_eq!(stored.balance, 200);
    assert_eq!(stored.upgrades.faucet_rate, 2);
}
