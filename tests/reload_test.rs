//! 重载引擎集成测试
//!
//! 通过 mockito 模拟本地 AppConfig 扩展，验证加载、轮询和失败保留行为

use appconfig_poller::{
    wait_all, AppConfigOptions, ReloadEngine, ReloadError, ReloadState,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const PATH: &str = "/applications/orders/environments/production/configurations/settings";

fn options_for(server: &mockito::Server, poll_interval_seconds: i64) -> AppConfigOptions {
    let mut options = AppConfigOptions::new("orders", "production", "settings");
    options.http_port = server.socket_address().port();
    options.poll_interval_seconds = poll_interval_seconds;
    options
}

#[tokio::test]
async fn test_initial_load_flattens_document() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", PATH)
        .with_status(200)
        .with_body(r#"{"Logging":{"Level":"Debug"},"Hosts":["a","b"],"Retry:Count":3}"#)
        .create_async()
        .await;

    let engine = ReloadEngine::from_options(&options_for(&server, -1)).unwrap();
    engine.load().await.unwrap();

    assert_eq!(engine.try_get("logging:level").as_deref(), Some("Debug"));
    assert_eq!(engine.try_get("Hosts:1").as_deref(), Some("b"));
    assert_eq!(engine.try_get("retry:count").as_deref(), Some("3"));
    assert_eq!(engine.snapshot().data.len(), 4);
}

#[tokio::test]
async fn test_poll_publishes_change_then_keeps_stale_on_failure() {
    let mut server = mockito::Server::new_async().await;
    let first = server
        .mock("GET", PATH)
        .with_status(200)
        .with_body(r#"{"Logging":{"Level":"Debug"}}"#)
        .create_async()
        .await;

    let engine = ReloadEngine::from_options(&options_for(&server, 1)).unwrap();
    engine.load().await.unwrap();
    let mut updates = engine.subscribe();
    let poller = engine.start();

    first.remove_async().await;
    let second = server
        .mock("GET", PATH)
        .with_status(200)
        .with_body(r#"{"Logging":{"Level":"Warn"}}"#)
        .create_async()
        .await;

    let notification = tokio::time::timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("应在超时前收到重载通知")
        .unwrap();
    assert_eq!(notification.version, 2);
    assert_eq!(notification.diff.modified, vec!["Logging:Level".to_string()]);
    assert_eq!(engine.try_get("Logging:Level").as_deref(), Some("Warn"));

    second.remove_async().await;
    let failing = server
        .mock("GET", PATH)
        .with_status(500)
        .expect_at_least(1)
        .create_async()
        .await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    failing.assert_async().await;

    assert_eq!(engine.try_get("Logging:Level").as_deref(), Some("Warn"));
    assert_eq!(engine.version(), 2);
    assert!(updates.try_recv().is_err());

    poller.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_sidecar_fails_first_load() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut options = AppConfigOptions::new("orders", "production", "settings");
    options.http_port = listener.local_addr().unwrap().port();
    drop(listener);

    let engine = ReloadEngine::from_options(&options).unwrap();
    let result = engine.load().await;

    assert!(matches!(result, Err(ReloadError::Transport { .. })));
    assert!(engine.snapshot().data.is_empty());
    assert_eq!(engine.state(), ReloadState::Idle);
}

#[tokio::test]
async fn test_non_object_document_fails_first_load() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", PATH)
        .with_status(200)
        .with_body("42")
        .create_async()
        .await;

    let engine = ReloadEngine::from_options(&options_for(&server, -1)).unwrap();
    assert!(matches!(
        engine.load().await,
        Err(ReloadError::MalformedInput(_))
    ));
}

#[tokio::test]
async fn test_wait_all_after_load() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", PATH)
        .with_status(200)
        .with_body(r#"{"k":"v"}"#)
        .expect(2)
        .create_async()
        .await;

    let engines = vec![
        ReloadEngine::from_options(&options_for(&server, -1)).unwrap(),
        ReloadEngine::from_options(&options_for(&server, -1)).unwrap(),
    ];
    for engine in &engines {
        engine.load().await.unwrap();
    }

    wait_all(&engines, &CancellationToken::new()).await.unwrap();
    assert!(engines.iter().all(|e| e.try_get("K").as_deref() == Some("v")));
}
