//! Misting session lifecycle through the service layer

mod common;

use agricool::models::{EndSession, MistingMode, StartSession};
use agricool::AgriError;
use chrono::{Duration, Utc};
use common::test_fixtures::start_session;
use common::TestHarness;
use rstest::rstest;

#[rstest]
#[tokio::test]
async fn test_start_derives_heat_index_and_defaults_to_auto(start_session: StartSession) {
    let harness = TestHarness::new().await;

    let session = harness.state.misting.start(start_session).await.unwrap();

    assert_eq!(session.mode, MistingMode::Auto);
    assert!(session.is_open());
    let heat_index = session.start_metrics.heat_index.expect("derived heat index");
    assert!(heat_index > 33.4);
    assert_eq!(session.duration(), None);
    assert_eq!(session.duration_minutes(), 0.0);
}

#[rstest]
#[tokio::test]
async fn test_only_one_open_session(start_session: StartSession) {
    let harness = TestHarness::new().await;
    let misting = &harness.state.misting;

    let first = misting.start(start_session.clone()).await.unwrap();
    let err = misting.start(start_session.clone()).await.unwrap_err();
    assert!(matches!(err, AgriError::Conflict(_)));

    misting.end(first.id, EndSession::default()).await.unwrap();
    let second = misting.start(start_session).await.unwrap();
    assert_ne!(first.id, second.id);
}

#[rstest]
#[tokio::test]
async fn test_end_twice_is_not_found(start_session: StartSession) {
    let harness = TestHarness::new().await;
    let misting = &harness.state.misting;

    let session = misting.start(start_session).await.unwrap();
    let closed = misting
        .end(
            session.id,
            EndSession {
                temperature: Some(29.1),
                humidity: Some(75.0),
                heat_index: None,
                water_level: Some(88),
            },
        )
        .await
        .unwrap();

    assert!(!closed.is_open());
    assert!(closed.duration().unwrap() >= Duration::zero());
    let end = closed.end_metrics.unwrap();
    assert_eq!(end.water_level, Some(88));
    assert!(end.heat_index.is_some());

    let err = misting.end(session.id, EndSession::default()).await.unwrap_err();
    assert!(matches!(err, AgriError::NotFound(_)));
    let err = misting.end(9999, EndSession::default()).await.unwrap_err();
    assert!(matches!(err, AgriError::NotFound(_)));
}

#[tokio::test]
async fn test_get_unknown_session() {
    let harness = TestHarness::new().await;
    let err = harness.state.misting.get(42).await.unwrap_err();
    assert!(matches!(err, AgriError::NotFound(_)));
}

#[tokio::test]
async fn test_recent_is_newest_first_and_capped() {
    let harness = TestHarness::new().await;
    let db = &harness.state.db;
    let base = Utc::now() - Duration::days(30);

    for i in 0..105 {
        let started = base + Duration::minutes(i * 30);
        let session = db
            .insert_session(started, Default::default(), MistingMode::Auto)
            .await
            .unwrap();
        db.close_session(session.id, started + Duration::minutes(5), Default::default())
            .await
            .unwrap();
    }

    let recent = harness.state.misting.recent().await.unwrap();
    assert_eq!(recent.len(), 100);
    assert!(recent
        .windows(2)
        .all(|pair| pair[0].started_at >= pair[1].started_at));
    assert_eq!(recent[0].duration_minutes(), 5.0);
}

#[tokio::test]
async fn test_today_excludes_older_sessions() {
    let harness = TestHarness::new().await;
    let db = &harness.state.db;

    let old = db
        .insert_session(
            Utc::now() - Duration::days(3),
            Default::default(),
            MistingMode::Manual,
        )
        .await
        .unwrap();
    db.close_session(old.id, Utc::now() - Duration::days(3), Default::default())
        .await
        .unwrap();
    let fresh = harness
        .state
        .misting
        .start(StartSession::default())
        .await
        .unwrap();

    let today = harness.state.misting.today().await.unwrap();
    assert_eq!(today.len(), 1);
    assert_eq!(today[0].id, fresh.id);
}

#[tokio::test]
async fn test_negative_duration_is_clamped() {
    let harness = TestHarness::new().await;
    let db = &harness.state.db;
    let started = Utc::now();

    let session = db
        .insert_session(started, Default::default(), MistingMode::Auto)
        .await
        .unwrap();
    // Controller clock skew: end reported before start
    let closed = db
        .close_session(session.id, started - Duration::seconds(30), Default::default())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(closed.duration(), Some(Duration::zero()));
}
