//! LogStreamClient 통합 테스트 - 설정 기반 생성 + 실제 HTTP
//!
//! `cargo test -p tasklog-client --test client_http`

use futures::StreamExt;
use mockito::Server;
use std::time::Duration;
use tasklog_client::{Error, LogStreamClient, StreamConfig, StreamPhase, StreamRequest, TransportMode};

fn config(server: &Server, mode: TransportMode) -> StreamConfig {
    StreamConfig::default()
        .transport(mode)
        .base_url(server.url())
        .poll_retry_interval_ms(10)
}

#[tokio::test]
async fn test_polling_client_from_config() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/v2/tasks/build-1/events")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id":1,"type":"log","message":"hello"},{"id":2,"type":"completion"}]"#)
        .create_async()
        .await;

    let client = LogStreamClient::from_config(config(&server, TransportMode::Polling)).unwrap();
    let mut sub = client.subscribe(StreamRequest::new("build-1"));

    let events: Vec<_> = tokio::time::timeout(
        Duration::from_secs(5),
        sub.by_ref().map(|e| e.expect("event")).collect::<Vec<_>>(),
    )
    .await
    .expect("polling should complete");

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].message(), Some("hello"));
    assert_eq!(sub.phase(), StreamPhase::Completed);
    assert_eq!(sub.resume_request().after.map(|a| a.value()), Some(2));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_event_stream_client_from_config() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v2/tasks/build-2/eventstream")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body("event: log\ndata: {\"id\":1,\"type\":\"log\"}\n\nevent: completion\ndata: {\"id\":2,\"type\":\"completion\"}\n\n")
        .create_async()
        .await;

    let client = LogStreamClient::from_config(config(&server, TransportMode::EventStream)).unwrap();
    let items: Vec<_> = tokio::time::timeout(
        Duration::from_secs(5),
        client.subscribe(StreamRequest::new("build-2")).collect::<Vec<_>>(),
    )
    .await
    .expect("event stream should complete");

    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.is_ok()));
}

#[tokio::test]
async fn test_fetch_events_upstream_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/v2/tasks/missing/events")
        .with_status(404)
        .with_body(r#"{"error":"task not found"}"#)
        .create_async()
        .await;

    let client = LogStreamClient::from_config(config(&server, TransportMode::Polling)).unwrap();
    let err = client.fetch_events(&"missing".into(), None).await.unwrap_err();

    assert!(matches!(
        err,
        Error::UpstreamStatus { status: 404, ref message } if message == "task not found"
    ));
}
