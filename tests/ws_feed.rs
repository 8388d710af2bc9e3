//! WebSocket feed tests: subscribe over a live socket, mutate over HTTP,
//! and observe the broadcast.

#![allow(clippy::panic, clippy::indexing_slicing)]

mod common;

use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use reqwest::Method;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use common::TestServer;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(server: &TestServer) -> Socket {
    let Ok((socket, _)) = connect_async(server.ws_url()).await else {
        panic!("ws connect failed");
    };
    socket
}

async fn send_command(socket: &mut Socket, id: &str, payload: Value) {
    let envelope = json!({
        "id": id,
        "type": "command",
        "timestamp": Utc::now(),
        "payload": payload,
    });
    let Ok(()) = socket.send(Message::text(envelope.to_string())).await else {
        panic!("ws send failed");
    };
}

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let Ok(Some(Ok(msg))) = tokio::time::timeout(Duration::from_secs(5), socket.next()).await
        else {
            panic!("no ws message within timeout");
        };
        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else {
            panic!("non-utf8 text frame");
        };
        let Ok(value) = serde_json::from_str::<Value>(text) else {
            panic!("invalid json frame: {text}");
        };
        return value;
    }
}

#[tokio::test]
async fn subscriber_sees_enrollment_of_its_event() {
    let server = TestServer::spawn().await;
    let org = server.user("olivia", "organizer").await;
    let p = server.user("pat", "participant").await;
    let watched = server.event(&org, 3, Utc::now() + chrono::Duration::days(1)).await;
    let other = server.event(&org, 3, Utc::now() + chrono::Duration::days(1)).await;

    let mut socket = connect(&server).await;
    send_command(
        &mut socket,
        "sub-1",
        json!({"command": "subscribe", "event_ids": [watched]}),
    )
    .await;
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["id"], "sub-1");
    assert_eq!(reply["type"], "response");
    assert_eq!(reply["payload"]["count"], 1);

    // Activity on an unwatched event is filtered out.
    let (status, _) = server
        .call(Method::POST, &format!("/api/v1/events/{other}/enrollments"), Some(&p), None)
        .await;
    assert_eq!(status, 201);
    let (status, _) = server
        .call(Method::POST, &format!("/api/v1/events/{watched}/enrollments"), Some(&p), None)
        .await;
    assert_eq!(status, 201);

    let pushed = next_json(&mut socket).await;
    assert_eq!(pushed["type"], "event");
    assert_eq!(pushed["payload"]["event_type"], "enrollment_confirmed");
    assert_eq!(pushed["payload"]["event_id"], watched.as_str());
    assert_eq!(pushed["payload"]["user_id"], p.as_str());
    assert_eq!(pushed["payload"]["current_enrollments"], 1);
}

#[tokio::test]
async fn get_event_command_returns_snapshot() {
    let server = TestServer::spawn().await;
    let org = server.user("olivia", "organizer").await;
    let event = server.event(&org, 7, Utc::now() + chrono::Duration::days(1)).await;

    let mut socket = connect(&server).await;
    send_command(
        &mut socket,
        "get-1",
        json!({"command": "get_event", "event_id": event}),
    )
    .await;
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["type"], "response");
    assert_eq!(reply["payload"]["id"], event.as_str());
    assert_eq!(reply["payload"]["capacity"], 7);

    let missing = uuid::Uuid::new_v4().to_string();
    send_command(
        &mut socket,
        "get-2",
        json!({"command": "get_event", "event_id": missing}),
    )
    .await;
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["payload"]["code"], 404);
}

#[tokio::test]
async fn malformed_frames_get_error_replies() {
    let server = TestServer::spawn().await;
    let mut socket = connect(&server).await;

    let Ok(()) = socket.send(Message::text("not json")).await else {
        panic!("ws send failed");
    };
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["payload"]["code"], 400);

    send_command(&mut socket, "x-1", json!({"command": "launch"})).await;
    let reply = next_json(&mut socket).await;
    assert_eq!(reply["id"], "x-1");
    assert_eq!(reply["payload"]["code"], 404);
}
