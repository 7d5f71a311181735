//! Integration tests for idempotent bundle storage and acceptance filters

use std::sync::Arc;
use tempfile::TempDir;

use crate::support::{fake_routes, match_detail, script_good_match, timeline, FakeSource, Reply};
use ranked_match_collector::store::{BundleLayout, BundleStatus, MatchBundleStore, StoreError};
use ranked_match_collector::AcceptFilters;

fn ranked_filters() -> AcceptFilters {
    AcceptFilters::from_cli(420, 900)
}

fn store(fake: &Arc<FakeSource>, dir: &TempDir) -> MatchBundleStore {
    MatchBundleStore::new(fake.clone(), fake_routes(), BundleLayout::new(dir.path()))
}

#[tokio::test]
async fn test_ensure_stores_both_documents() {
    let dir = TempDir::new().unwrap();
    let fake = Arc::new(FakeSource::new());
    script_good_match(&fake, &fake_routes(), "EUN1_1");

    let store = store(&fake, &dir);
    let status = store.ensure("EUN1_1", &ranked_filters()).await.unwrap();

    assert_eq!(status, BundleStatus::Stored);
    assert!(store.layout().is_complete("EUN1_1"));
    let detail = std::fs::read_to_string(store.layout().detail_path("EUN1_1")).unwrap();
    assert!(detail.contains("\"gameDuration\": 1800"));
}

#[tokio::test]
async fn test_second_ensure_is_cached_without_requests() {
    let dir = TempDir::new().unwrap();
    let fake = Arc::new(FakeSource::new());
    script_good_match(&fake, &fake_routes(), "EUN1_1");
    let store = store(&fake, &dir);

    store.ensure("EUN1_1", &ranked_filters()).await.unwrap();
    let calls_after_first = fake.total_calls();
    let detail_before = std::fs::read(store.layout().detail_path("EUN1_1")).unwrap();

    let status = store.ensure("EUN1_1", &ranked_filters()).await.unwrap();

    assert_eq!(status, BundleStatus::Cached);
    assert_eq!(fake.total_calls(), calls_after_first);
    let detail_after = std::fs::read(store.layout().detail_path("EUN1_1")).unwrap();
    assert_eq!(detail_before, detail_after);
}

#[tokio::test]
async fn test_queue_mismatch_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let fake = Arc::new(FakeSource::new());
    let routes = fake_routes();
    fake.json(routes.match_url("EUN1_2"), match_detail("EUN1_2", 440, 1800));
    let store = store(&fake, &dir);

    let status = store.ensure("EUN1_2", &ranked_filters()).await.unwrap();

    assert_eq!(status, BundleStatus::SkippedQueue);
    assert!(!store.layout().detail_path("EUN1_2").exists());
    assert!(!store.layout().timeline_path("EUN1_2").exists());
    assert_eq!(fake.count(&routes.timeline_url("EUN1_2")), 0);
}

#[tokio::test]
async fn test_short_match_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let fake = Arc::new(FakeSource::new());
    let routes = fake_routes();
    fake.json(routes.match_url("EUN1_3"), match_detail("EUN1_3", 420, 899));
    let store = store(&fake, &dir);

    let status = store.ensure("EUN1_3", &ranked_filters()).await.unwrap();

    assert_eq!(status, BundleStatus::SkippedDuration);
    assert!(!store.layout().detail_path("EUN1_3").exists());
}

#[tokio::test]
async fn test_disabled_queue_filter_accepts_other_queues() {
    let dir = TempDir::new().unwrap();
    let fake = Arc::new(FakeSource::new());
    let routes = fake_routes();
    fake.json(routes.match_url("EUN1_4"), match_detail("EUN1_4", 450, 1200));
    fake.json(routes.timeline_url("EUN1_4"), timeline("EUN1_4"));
    let store = store(&fake, &dir);

    let status = store
        .ensure("EUN1_4", &AcceptFilters::from_cli(-1, 900))
        .await
        .unwrap();

    assert_eq!(status, BundleStatus::Stored);
}

#[tokio::test]
async fn test_timeline_failure_leaves_completable_stub() {
    let dir = TempDir::new().unwrap();
    let fake = Arc::new(FakeSource::new());
    let routes = fake_routes();
    fake.json(routes.match_url("EUN1_5"), match_detail("EUN1_5", 420, 1800));
    fake.reply(routes.timeline_url("EUN1_5"), Reply::Exhausted);
    let store = store(&fake, &dir);

    let status = store.ensure("EUN1_5", &ranked_filters()).await.unwrap();
    assert_eq!(status, BundleStatus::SkippedTimelineUnavailable);
    assert!(store.layout().detail_path("EUN1_5").exists());
    assert!(!store.layout().timeline_path("EUN1_5").exists());
    assert_eq!(
        store.layout().detail_only_ids().unwrap().into_iter().collect::<Vec<_>>(),
        vec!["EUN1_5".to_string()]
    );

    // Timeline becomes available; the detail is not fetched again
    fake.json(routes.timeline_url("EUN1_5"), timeline("EUN1_5"));
    let status = store.ensure("EUN1_5", &ranked_filters()).await.unwrap();

    assert_eq!(status, BundleStatus::Stored);
    assert!(store.layout().is_complete("EUN1_5"));
    assert_eq!(
        fake.calls()
            .iter()
            .filter(|call| call.as_str() == routes.match_url("EUN1_5"))
            .count(),
        1
    );
}

#[tokio::test]
async fn test_stub_fetches_only_timeline() {
    let dir = TempDir::new().unwrap();
    let fake = Arc::new(FakeSource::new());
    let routes = fake_routes();
    let layout = BundleLayout::new(dir.path());
    std::fs::write(layout.detail_path("EUN1_6"), match_detail("EUN1_6", 420, 1800).to_string()).unwrap();
    fake.json(routes.timeline_url("EUN1_6"), timeline("EUN1_6"));
    let store = store(&fake, &dir);

    let status = store.ensure("EUN1_6", &ranked_filters()).await.unwrap();

    assert_eq!(status, BundleStatus::Stored);
    assert_eq!(fake.calls(), vec![routes.timeline_url("EUN1_6")]);
}

#[tokio::test]
async fn test_stub_failing_current_filters_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let fake = Arc::new(FakeSource::new());
    let routes = fake_routes();
    let layout = BundleLayout::new(dir.path());
    std::fs::write(layout.detail_path("EUN1_9"), match_detail("EUN1_9", 450, 300).to_string()).unwrap();
    fake.json(routes.timeline_url("EUN1_9"), timeline("EUN1_9"));
    let store = store(&fake, &dir);

    let status = store.ensure("EUN1_9", &ranked_filters()).await.unwrap();

    assert_eq!(status, BundleStatus::SkippedQueue);
    assert!(!layout.timeline_path("EUN1_9").exists());
    assert_eq!(fake.total_calls(), 0);
}

#[tokio::test]
async fn test_float_queue_id_matches_filter() {
    let dir = TempDir::new().unwrap();
    let fake = Arc::new(FakeSource::new());
    let routes = fake_routes();
    fake.json(
        routes.match_url("EUN1_10"),
        serde_json::json!({"metadata": {"matchId": "EUN1_10"}, "info": {"queueId": 420.0, "gameDuration": 1800}}),
    );
    fake.json(routes.timeline_url("EUN1_10"), timeline("EUN1_10"));
    let store = store(&fake, &dir);

    let status = store.ensure("EUN1_10", &ranked_filters()).await.unwrap();

    assert_eq!(status, BundleStatus::Stored);
    assert!(store.layout().is_complete("EUN1_10"));
}

#[tokio::test]
async fn test_existing_timeline_is_not_refetched() {
    let dir = TempDir::new().unwrap();
    let fake = Arc::new(FakeSource::new());
    let routes = fake_routes();
    fake.json(routes.match_url("EUN1_7"), match_detail("EUN1_7", 420, 1800));
    let layout = BundleLayout::new(dir.path());
    std::fs::write(layout.timeline_path("EUN1_7"), "{}").unwrap();
    let store = store(&fake, &dir);

    let status = store.ensure("EUN1_7", &ranked_filters()).await.unwrap();

    assert_eq!(status, BundleStatus::Stored);
    assert_eq!(fake.count(&routes.timeline_url("EUN1_7")), 0);
    assert!(layout.is_complete("EUN1_7"));
}

#[tokio::test]
async fn test_detail_failure_is_an_error() {
    let dir = TempDir::new().unwrap();
    let fake = Arc::new(FakeSource::new());
    let routes = fake_routes();
    fake.reply(routes.match_url("EUN1_8"), Reply::Reject(404));
    let store = store(&fake, &dir);

    let err = store.ensure("EUN1_8", &ranked_filters()).await.unwrap_err();

    match err {
        StoreError::Fetch { match_id, source } => {
            assert_eq!(match_id, "EUN1_8");
            assert_eq!(source.status(), Some(404));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
    assert!(!store.layout().detail_path("EUN1_8").exists());
}

#[tokio::test]
async fn test_path_like_ids_are_rejected() {
    let dir = TempDir::new().unwrap();
    let fake = Arc::new(FakeSource::new());
    let store = store(&fake, &dir);

    let err = store.ensure("../escape", &ranked_filters()).await.unwrap_err();

    assert!(matches!(err, StoreError::InvalidMatchId(_)));
    assert_eq!(fake.total_calls(), 0);
}
