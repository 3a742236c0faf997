mod test_helpers;

use std::time::Duration;

use tap_core::EngineEvent;
use tap_engine::identity::{StaticIdentity, WatchIdentity};
use tap_engine::session::SessionMode;
use tap_types::{RewardError, referral_code_for};
use test_helpers::*;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_first_contact_creates_refilled_record() {
    let setup = TestEngineSetup::new();
    let engine = setup.start_user(7).await;
    assert_eq!(engine.session.mode(), SessionMode::Online(7));

    let stored = setup.stored(7);
    assert_eq!(stored.username, "player7");
    assert_eq!(stored.balance, 0);
    assert_eq!(stored.referral_code, referral_code_for(7));
    assert_eq!(stored.taps_remaining, 1000);
    assert_eq!(stored.taps_reset_date, Some(start_day()));
    assert_eq!((stored.spins_free, stored.spins_ad), (1, 2));
    assert_eq!(stored.tasks.daily_ads_left, 3);
    assert_eq!(engine.session.mirror().snapshot(), stored);

    assert!(setup.events.has_event_type(|e| matches!(
        e,
        EngineEvent::SessionStarted {
            user_id: 7,
            created: true
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_start_is_idempotent() {
    let setup = TestEngineSetup::new();
    let first = setup.start_user(7).await;
    drop(first);
    let before = setup.stored(7);

    let second = setup.start_user(7).await;
    assert_eq!(setup.stored(7).balance, before.balance);
    assert_eq!(setup.stored(7).taps_remaining, before.taps_remaining);
    assert_eq!(second.session.mirror().snapshot().created_at, before.created_at);

    assert_eq!(
        setup
            .events
            .count(|e| matches!(e, EngineEvent::SessionStarted { created: false, .. })),
        1
    );
    // Quotas were refilled once, on first contact
    assert_eq!(
        setup
            .events
            .count(|e| matches!(e, EngineEvent::QuotaRefilled { .. })),
        3
    );
}

#[tokio::test(start_paused = true)]
async fn test_display_names_follow_the_platform() {
    let setup = TestEngineSetup::new();
    let mut user = create_test_user(1, 250);
    user.username = "old_name".to_string();
    user.first_name = "Ada".to_string();
    setup.seed_refilled(user);

    setup.start_user(1).await;
    let stored = setup.stored(1);
    assert_eq!(stored.username, "player1");
    // Fields the platform did not send are kept
    assert_eq!(stored.first_name, "Ada");
    assert_eq!(stored.balance, 250);
}

#[tokio::test(start_paused = true)]
async fn test_referrer_is_recorded_once() {
    let setup = TestEngineSetup::new();
    setup.seed_refilled(create_test_user(100, 0));
    setup.seed_refilled(create_test_user(200, 0));

    setup
        .start(Some(launch(1).with_start_param("ref_100")))
        .await;
    assert_eq!(setup.stored(1).referred_by, Some(100));

    setup
        .start(Some(launch(1).with_start_param("ref_200")))
        .await;
    assert_eq!(setup.stored(1).referred_by, Some(100));
}

#[tokio::test(start_paused = true)]
async fn test_bare_numeric_referral_token() {
    let setup = TestEngineSetup::new();
    setup.seed_refilled(create_test_user(100, 0));

    setup.start(Some(launch(1).with_start_param("100"))).await;
    assert_eq!(setup.stored(1).referred_by, Some(100));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_referrals_are_ignored() {
    let setup = TestEngineSetup::new();
    setup.seed_refilled(create_test_user(1, 0));

    // Unknown referrer
    setup.start(Some(launch(2).with_start_param("ref_999"))).await;
    assert_eq!(setup.stored(2).referred_by, None);

    // Self-referral
    setup.start(Some(launch(3).with_start_param("ref_3"))).await;
    assert_eq!(setup.stored(3).referred_by, None);

    // Garbage
    setup.start(Some(launch(4).with_start_param("promo"))).await;
    assert_eq!(setup.stored(4).referred_by, None);
}

#[tokio::test(start_paused = true)]
async fn test_existing_user_without_referrer_can_be_referred() {
    let setup = TestEngineSetup::new();
    setup.seed_refilled(create_test_user(100, 0));
    setup.seed_refilled(create_test_user(1, 40));

    setup
        .start(Some(launch(1).with_start_param("ref_100")))
        .await;
    let stored = setup.stored(1);
    assert_eq!(stored.referred_by, Some(100));
    assert_eq!(stored.balance, 40);
}

#[tokio::test(start_paused = true)]
async fn test_missing_identity_falls_back_to_offline() {
    let setup = TestEngineSetup::new();
    let started = Instant::now();
    let engine = setup.start(None).await;

    assert_eq!(engine.session.mode(), SessionMode::Offline);
    assert_eq!(engine.session.user_id(), None);
    assert!(started.elapsed() >= Duration::from_millis(300));
    // Playable locally
    assert_eq!(engine.session.mirror().taps_remaining(), 1000);
    assert_eq!(setup.store.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_identity_arriving_before_timeout_is_used() {
    let setup = TestEngineSetup::new();
    let (sender, identity) = WatchIdentity::channel();

    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(120)).await;
        sender.send(Some(launch(5))).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
    });

    let engine = setup.start_with(&identity).await;
    assert_eq!(engine.session.mode(), SessionMode::Online(5));
    assert!(setup.store.record(5).is_some());
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_store_outage_at_start_is_reported() {
    let setup = TestEngineSetup::new();
    setup.store.set_unavailable(true);

    let result = setup
        .try_start_with(&StaticIdentity::new(launch(1)))
        .await;
    assert!(matches!(
        result,
        Err(RewardError::PersistenceFailure { .. })
    ));
    assert!(setup.store.record(1).is_none());
}
