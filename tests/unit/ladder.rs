//! Unit tests for ladder pagination

use futures_util::StreamExt;
use serde_json::json;
use std::sync::Arc;

use crate::support::{ladder_key, FakeSource, Reply, FAKE_HOST};
use ranked_match_collector::api::{LadderWalker, Routes};
use ranked_match_collector::Division;

fn routes_for(divisions: Vec<Division>) -> Arc<Routes> {
    Arc::new(Routes {
        divisions,
        ..Routes::single_host(FAKE_HOST)
    })
}

fn players(ids: &[&str]) -> serde_json::Value {
    json!(ids.iter().map(|id| json!({"puuid": id})).collect::<Vec<_>>())
}

#[tokio::test]
async fn test_pages_until_empty_then_next_division() {
    let fake = Arc::new(FakeSource::new());
    let routes = routes_for(vec![Division::One, Division::Two]);
    fake.json(ladder_key(&routes, Division::One, 1), players(&["a", "b"]));
    fake.json(ladder_key(&routes, Division::One, 2), players(&["c"]));
    fake.json(ladder_key(&routes, Division::One, 3), json!([]));
    fake.json(ladder_key(&routes, Division::Two, 1), players(&["d"]));
    fake.json(ladder_key(&routes, Division::Two, 2), json!([]));

    let walker = LadderWalker::new(fake.clone(), routes.clone(), 10);
    let found: Vec<String> = walker
        .entries()
        .map(|entry| entry.unwrap().puuid.unwrap())
        .collect()
        .await;

    assert_eq!(found, ["a", "b", "c", "d"]);
    assert_eq!(fake.total_calls(), 5);
}

#[tokio::test]
async fn test_page_limit_moves_to_next_division() {
    let fake = Arc::new(FakeSource::new());
    let routes = routes_for(vec![Division::One, Division::Two]);
    fake.json(ladder_key(&routes, Division::One, 1), players(&["a"]));
    fake.json(ladder_key(&routes, Division::One, 2), players(&["never"]));
    fake.json(ladder_key(&routes, Division::Two, 1), players(&["b"]));

    let walker = LadderWalker::new(fake.clone(), routes.clone(), 1);
    let found: Vec<String> = walker
        .entries()
        .map(|entry| entry.unwrap().puuid.unwrap())
        .collect()
        .await;

    assert_eq!(found, ["a", "b"]);
    assert_eq!(fake.count_exact(&ladder_key(&routes, Division::One, 2)), 0);
}

#[tokio::test]
async fn test_failed_page_is_yielded_and_division_skipped() {
    let fake = Arc::new(FakeSource::new());
    let routes = routes_for(vec![Division::One, Division::Two]);
    fake.reply(ladder_key(&routes, Division::One, 1), Reply::Exhausted);
    fake.json(ladder_key(&routes, Division::Two, 1), players(&["b"]));
    fake.json(ladder_key(&routes, Division::Two, 2), json!([]));

    let walker = LadderWalker::new(fake.clone(), routes, 10);
    let items: Vec<_> = walker.entries().collect().await;

    assert_eq!(items.len(), 2);
    assert!(items[0].is_err());
    assert_eq!(items[1].as_ref().unwrap().puuid.as_deref(), Some("b"));
}

#[tokio::test]
async fn test_walk_is_lazy() {
    let fake = Arc::new(FakeSource::new());
    let routes = routes_for(vec![Division::One]);
    fake.json(ladder_key(&routes, Division::One, 1), players(&["a", "b"]));
    fake.json(ladder_key(&routes, Division::One, 2), players(&["c"]));

    let walker = LadderWalker::new(fake.clone(), routes, 10);
    let mut entries = walker.entries();
    assert_eq!(fake.total_calls(), 0);

    let first = entries.next().await.unwrap().unwrap();
    assert_eq!(first.puuid.as_deref(), Some("a"));
    assert_eq!(fake.total_calls(), 1);
}

#[tokio::test]
async fn test_account_only_entries_are_parsed() {
    let fake = Arc::new(FakeSource::new());
    let routes = routes_for(vec![Division::Four]);
    fake.json(
        ladder_key(&routes, Division::Four, 1),
        json!([{"summonerId": "acct", "summonerName": "Someone", "leaguePoints": 40}]),
    );
    fake.json(ladder_key(&routes, Division::Four, 2), json!([]));

    let walker = LadderWalker::new(fake.clone(), routes, 10);
    let items: Vec<_> = walker.entries().collect().await;

    let entry = items[0].as_ref().unwrap();
    assert_eq!(entry.direct_player_id(), None);
    assert_eq!(entry.account_id(), Some("acct"));
    assert_eq!(entry.display_name(), "Someone");
}
