//! Integration tests for the WebSocket push transport against a local server.

use futures_util::{SinkExt, StreamExt};
use sigfeed_core::{PushKind, PushMessage};
use sigfeed_ws::{
    ConnectionConfig, ConnectionState, PushBus, PushChannel, PushConnection, WsError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

async fn spawn_server(frames: Vec<&'static str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        for frame in frames {
            ws.send(Message::Text(frame.to_string())).await.unwrap();
        }
        // Hold the socket open until the client goes away.
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
    });

    format!("ws://{addr}")
}

#[tokio::test]
async fn test_frames_reach_bus_subscribers() {
    let url = spawn_server(vec![
        "not json",
        r#"{"type":"signals:new","signal_id":7,"pair":"BTCUSDT"}"#,
        r#"{"type":"signals:ai_complete","signal_id":7}"#,
    ])
    .await;

    let bus = PushBus::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<PushMessage>();
    let _sub = bus.subscribe(Arc::new(move |msg: &PushMessage| {
        let _ = tx.send(msg.clone());
    }));

    let config = ConnectionConfig {
        url,
        ..Default::default()
    };
    let conn = Arc::new(PushConnection::new(config, bus));
    let runner = {
        let conn = conn.clone();
        tokio::spawn(async move { conn.run().await })
    };

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("first frame")
        .expect("bus open");
    let second = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("second frame")
        .expect("bus open");

    assert_eq!(first.kind, PushKind::SignalsNew);
    assert_eq!(first.payload["signal_id"], 7);
    assert_eq!(second.kind, PushKind::SignalsAiComplete);
    assert_eq!(conn.state(), ConnectionState::Connected);

    conn.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("run loop exits")
        .expect("task joined");
    assert!(result.is_ok());
    assert_eq!(conn.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    // Bind and drop to obtain a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ConnectionConfig {
        url: format!("ws://{addr}"),
        max_reconnect_attempts: 2,
        reconnect_base_delay_ms: 10,
        reconnect_max_delay_ms: 20,
        ..Default::default()
    };
    let conn = PushConnection::new(config, PushBus::new());

    let result = tokio::time::timeout(Duration::from_secs(5), conn.run())
        .await
        .expect("bounded retries");
    assert!(matches!(result, Err(WsError::GaveUp { attempts: 2 })));
    assert_eq!(conn.state(), ConnectionState::Disconnected);
}
