//! Integration tests for the command line surface
//!
//! Tests verify:
//! - A missing credential fails before any network or file activity
//! - A full collect run against a mock API writes bundles and the match list
//! - The status report reflects what is on disk

use assert_cmd::Command;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn collector_bin() -> Command {
    let mut cmd = Command::cargo_bin("ranked-match-collector").unwrap();
    cmd.env_remove("RIOT_API_KEY").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_collect_without_credential_exits_with_error() {
    let temp_dir = TempDir::new().unwrap();
    let matchlist = temp_dir.path().join("matchlist.json");

    let assert = collector_bin()
        .current_dir(temp_dir.path())
        .args([
            "collect",
            "--env-file",
            temp_dir.path().join("missing.env").to_str().unwrap(),
            "--matchlist",
            matchlist.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .code(1);

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("RIOT_API_KEY not found"), "stderr: {stderr}");
    assert!(!matchlist.exists());
}

#[test]
fn test_collect_reads_credential_from_env_file() {
    let temp_dir = TempDir::new().unwrap();
    let env_file = temp_dir.path().join("creds.env");
    fs::write(&env_file, "RIOT_API_KEY=RGAPI-from-file\n").unwrap();

    // Already at target, so the run finishes without a request
    let matchlist = temp_dir.path().join("matchlist.json");
    fs::write(&matchlist, r#"["EUN1_1"]"#).unwrap();

    collector_bin()
        .args([
            "collect",
            "--target-match-count",
            "1",
            "--env-file",
            env_file.to_str().unwrap(),
            "--matchlist",
            matchlist.to_str().unwrap(),
            "--raw-dir",
            temp_dir.path().join("raw").to_str().unwrap(),
            "--platform-url",
            "http://127.0.0.1:9",
            "--regional-url",
            "http://127.0.0.1:9",
            "--output-format",
            "json",
        ])
        .assert()
        .success();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_collect_end_to_end_against_mock_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lol/league/v4/entries/RANKED_SOLO_5x5/GOLD/I"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"puuid": "p1"}])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lol/match/v5/matches/by-puuid/p1/ids"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["EUN1_1", "EUN1_2"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lol/match/v5/matches/EUN1_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": {"matchId": "EUN1_1"},
            "info": {"queueId": 420, "gameDuration": 1800}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lol/match/v5/matches/EUN1_1/timeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"info": {"frames": []}})))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let raw_dir = temp_dir.path().join("raw");
    let matchlist = temp_dir.path().join("matchlist.json");

    let assert = collector_bin()
        .env("RIOT_API_KEY", "RGAPI-test")
        .args([
            "collect",
            "--target-match-count",
            "1",
            "--raw-dir",
            raw_dir.to_str().unwrap(),
            "--matchlist",
            matchlist.to_str().unwrap(),
            "--platform-url",
            &server.uri(),
            "--regional-url",
            &server.uri(),
            "--env-file",
            temp_dir.path().join("none.env").to_str().unwrap(),
            "--output-format",
            "json",
        ])
        .assert()
        .success();

    let report: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["success"], json!(true));
    assert_eq!(report["target_met"], json!(true));
    assert_eq!(report["summary"]["newly_accepted"], json!(1));
    assert_eq!(report["summary"]["stop_reason"], json!("target_reached"));

    assert!(raw_dir.join("EUN1_1.json").exists());
    assert!(raw_dir.join("EUN1_1_timeline.json").exists());
    assert!(!raw_dir.join("EUN1_2.json").exists());
    assert_eq!(fs::read_to_string(&matchlist).unwrap(), "[\n  \"EUN1_1\"\n]");
}

#[test]
fn test_status_reports_bundles_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let raw_dir = temp_dir.path().join("raw");
    fs::create_dir_all(&raw_dir).unwrap();
    for name in ["a.json", "a_timeline.json", "b.json", "c.json"] {
        fs::write(raw_dir.join(name), "{}").unwrap();
    }
    let matchlist = temp_dir.path().join("matchlist.json");
    fs::write(&matchlist, r#"["a", "b"]"#).unwrap();

    let assert = collector_bin()
        .args([
            "status",
            "--raw-dir",
            raw_dir.to_str().unwrap(),
            "--matchlist",
            matchlist.to_str().unwrap(),
            "--output-format",
            "json",
        ])
        .assert()
        .success();

    let report: Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["listed"], json!(2));
    assert_eq!(report["complete"], json!(1));
    assert_eq!(report["listed_incomplete"], json!(["b"]));
    assert_eq!(report["detail_only"], json!(["b", "c"]));
}

#[test]
fn test_status_fails_on_corrupt_matchlist() {
    let temp_dir = TempDir::new().unwrap();
    let matchlist = temp_dir.path().join("matchlist.json");
    fs::write(&matchlist, "{not a list").unwrap();

    collector_bin()
        .args([
            "status",
            "--raw-dir",
            temp_dir.path().join("raw").to_str().unwrap(),
            "--matchlist",
            matchlist.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_concurrency_out_of_range_is_rejected() {
    collector_bin()
        .args(["collect", "--concurrency", "9"])
        .assert()
        .failure();
}
