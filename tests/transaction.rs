//! Two-phase transaction coordination tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

mod common;

type CallLog = Arc<Mutex<Vec<(String, String)>>>;

/// Mock participant implementing /prepare, /commit, /rollback, recording
/// every call it receives.
async fn start_participant(addr: SocketAddr, prepare_ready: bool, commit_ok: bool) -> CallLog {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let recorded = log.clone();

    common::start_routing_backend(addr, move |path, body| {
        let recorded = recorded.clone();
        async move {
            recorded
                .lock()
                .unwrap()
                .push((path.clone(), body));
            match path.as_str() {
                "/prepare" if prepare_ready => (200, r#"{"status":"ready"}"#.to_string()),
                "/prepare" => (200, r#"{"status":"fail","reason":"User not found"}"#.to_string()),
                "/commit" if commit_ok => (200, r#"{"status":"committed"}"#.to_string()),
                "/commit" => (500, r#"{"status":"fail"}"#.to_string()),
                "/rollback" => (200, r#"{"status":"rolled back"}"#.to_string()),
                _ => (404, r#"{"error":"unknown path"}"#.to_string()),
            }
        }
    })
    .await;

    log
}

fn count(log: &CallLog, path: &str) -> usize {
    log.lock().unwrap().iter().filter(|(p, _)| p == path).count()
}

async fn finish_game(gateway: SocketAddr) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{}/game/finish", gateway))
        .json(&json!({
            "game_id": "g-42",
            "username": "marius",
            "result": "win",
        }))
        .send()
        .await
        .expect("gateway unreachable")
}

#[tokio::test]
async fn test_transaction_commits_when_all_ready() {
    let battleship: SocketAddr = "127.0.0.1:28611".parse().unwrap();
    let profile: SocketAddr = "127.0.0.1:28612".parse().unwrap();
    let battleship_log = start_participant(battleship, true, true).await;
    let profile_log = start_participant(profile, true, true).await;

    let (gateway, shutdown) = common::start_gateway(common::test_config()).await;
    common::register_service(gateway, "battleship", &format!("http://{}", battleship)).await;
    common::register_service(gateway, "profile", &format!("http://{}", profile)).await;

    let res = finish_game(gateway).await;
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert!(body["transactionId"].as_str().unwrap().starts_with("tx-"));

    for log in [&battleship_log, &profile_log] {
        assert_eq!(count(log, "/prepare"), 1);
        assert_eq!(count(log, "/commit"), 1);
        assert_eq!(count(log, "/rollback"), 0, "no rollback on success");
    }

    // Phase payloads carry the transaction id alongside the client fields.
    let (_, prepare_body) = battleship_log.lock().unwrap()[0].clone();
    assert!(prepare_body.contains("transactionId"));
    assert!(prepare_body.contains("marius"));

    shutdown.trigger();
}

#[tokio::test]
async fn test_transaction_aborts_when_one_participant_not_ready() {
    let battleship: SocketAddr = "127.0.0.1:28621".parse().unwrap();
    let profile: SocketAddr = "127.0.0.1:28622".parse().unwrap();
    let battleship_log = start_participant(battleship, true, true).await;
    let profile_log = start_participant(profile, false, true).await;

    let (gateway, shutdown) = common::start_gateway(common::test_config()).await;
    common::register_service(gateway, "battleship", &format!("http://{}", battleship)).await;
    common::register_service(gateway, "profile", &format!("http://{}", profile)).await;

    let res = finish_game(gateway).await;
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("aborted"));

    // Every participant is always asked to prepare.
    assert_eq!(count(&battleship_log, "/prepare"), 1);
    assert_eq!(count(&profile_log, "/prepare"), 1);

    // No commit is issued, and only the ready voter is rolled back.
    assert_eq!(count(&battleship_log, "/commit"), 0);
    assert_eq!(count(&profile_log, "/commit"), 0);
    assert_eq!(count(&battleship_log, "/rollback"), 1);
    assert_eq!(count(&profile_log, "/rollback"), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_transaction_rolls_back_all_on_commit_failure() {
    let battleship: SocketAddr = "127.0.0.1:28631".parse().unwrap();
    let profile: SocketAddr = "127.0.0.1:28632".parse().unwrap();
    let battleship_log = start_participant(battleship, true, false).await;
    let profile_log = start_participant(profile, true, true).await;

    let (gateway, shutdown) = common::start_gateway(common::test_config()).await;
    common::register_service(gateway, "battleship", &format!("http://{}", battleship)).await;
    common::register_service(gateway, "profile", &format!("http://{}", profile)).await;

    let res = finish_game(gateway).await;
    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("failed"));

    // Commit is still attempted on the remaining participant, then both
    // prepare-phase voters receive the compensating rollback.
    for log in [&battleship_log, &profile_log] {
        assert_eq!(count(log, "/prepare"), 1);
        assert_eq!(count(log, "/commit"), 1);
        assert_eq!(count(log, "/rollback"), 1);
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_transaction_fails_when_participant_unresolvable() {
    let battleship: SocketAddr = "127.0.0.1:28641".parse().unwrap();
    let battleship_log = start_participant(battleship, true, true).await;

    let (gateway, shutdown) = common::start_gateway(common::test_config()).await;
    common::register_service(gateway, "battleship", &format!("http://{}", battleship)).await;
    // "profile" is never registered.

    let res = finish_game(gateway).await;
    assert_eq!(res.status(), 500);

    // Nothing was prepared, so nothing is rolled back.
    assert_eq!(count(&battleship_log, "/prepare"), 0);
    assert_eq!(count(&battleship_log, "/rollback"), 0);

    shutdown.trigger();
}
