//! End-to-end tests against a live server on loopback

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use record_relay::client::{ClientConfig, ObserverClient, ObserverEvent, Reply, RequestClient};
use record_relay::{Action, Error, MemoryStore, RecordServer, Request, ServerConfig};

const WAIT: Duration = Duration::from_secs(5);

async fn start_server() -> (Arc<RecordServer<MemoryStore>>, SocketAddr) {
    let config = ServerConfig::with_addr("127.0.0.1:0".parse().unwrap());
    let server = Arc::new(RecordServer::new(config, Arc::new(MemoryStore::new())));

    let listener = server.bind().unwrap();
    let addr = listener.local_addr().unwrap();

    let serving = Arc::clone(&server);
    tokio::spawn(async move {
        let _ = serving.serve(listener).await;
    });

    (server, addr)
}

async fn read_json(reader: &mut BufReader<TcpStream>) -> Value {
    let mut line = String::new();
    let n = timeout(WAIT, reader.read_line(&mut line))
        .await
        .expect("timed out waiting for a frame")
        .unwrap();
    assert!(n > 0, "connection closed before a frame arrived");
    serde_json::from_str(&line).unwrap()
}

async fn assert_closed(reader: &mut BufReader<TcpStream>) {
    let mut line = String::new();
    let n = timeout(WAIT, reader.read_line(&mut line))
        .await
        .expect("timed out waiting for close")
        .unwrap();
    assert_eq!(n, 0, "unexpected data: {line}");
}

/// Send one raw frame and return the reader half
async fn send_raw(addr: SocketAddr, frame: &str) -> BufReader<TcpStream> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(frame.as_bytes()).await.unwrap();
    BufReader::new(stream)
}

async fn one_shot(addr: SocketAddr, request: Value) -> Value {
    let mut reader = send_raw(addr, &format!("{request}\n")).await;
    let response = read_json(&mut reader).await;
    assert_closed(&mut reader).await;
    response
}

async fn subscribe(addr: SocketAddr, uuid: &str) -> BufReader<TcpStream> {
    send_raw(addr, &format!("{}\n", json!({"UUID": uuid, "ACTION": "subscribe"}))).await
}

async fn wait_for_observers(server: &RecordServer<MemoryStore>, count: usize) {
    timeout(WAIT, async {
        while server.registry().len().await != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("observer count never settled");
}

#[tokio::test]
async fn test_set_persists_replies_and_notifies_observer() {
    let (server, addr) = start_server().await;

    let mut observer = subscribe(addr, "u2").await;
    wait_for_observers(&server, 1).await;

    let response = one_shot(
        addr,
        json!({"UUID": "u1", "ACTION": "set", "ID": "x1", "name": "alpha"}),
    )
    .await;
    assert_eq!(response["status"], "OK");
    assert_eq!(response["data"]["id"], "x1");
    assert_eq!(response["data"]["name"], "alpha");

    let push = read_json(&mut observer).await;
    assert_eq!(push, json!({"id": "x1", "name": "alpha"}));

    let stored = server.store().len().await;
    assert_eq!(stored, 1);
}

#[tokio::test]
async fn test_get_missing_item() {
    let (_server, addr) = start_server().await;

    let response = one_shot(addr, json!({"UUID": "u1", "ACTION": "get", "ID": "nope"})).await;
    assert_eq!(response, json!({"status": "Error", "message": "Item not found"}));
}

#[tokio::test]
async fn test_set_then_get_and_list() {
    let (_server, addr) = start_server().await;

    one_shot(addr, json!({"UUID": "u1", "ACTION": "set", "ID": "a", "n": 1})).await;
    one_shot(addr, json!({"UUID": "u1", "ACTION": "set", "ID": "b", "n": 2})).await;

    let got = one_shot(addr, json!({"UUID": "u1", "ACTION": "get", "ID": "a"})).await;
    assert_eq!(got, json!({"status": "OK", "data": {"id": "a", "n": 1}}));

    let listed = one_shot(addr, json!({"UUID": "u1", "ACTION": "list"})).await;
    assert_eq!(listed["status"], "OK");
    let ids: Vec<&str> = listed["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn test_missing_uuid_closes_connection() {
    let (server, addr) = start_server().await;

    let response = one_shot(addr, json!({"ACTION": "list"})).await;
    assert_eq!(
        response,
        json!({"status": "Error", "message": "Missing UUID or ACTION"})
    );

    // Validation failures are not audited
    assert!(server.store().audit_log().await.is_empty());
}

#[tokio::test]
async fn test_invalid_json() {
    let (_server, addr) = start_server().await;

    let mut reader = send_raw(addr, "{not json\n").await;
    let response = read_json(&mut reader).await;
    assert_eq!(response, json!({"status": "Error", "message": "Invalid JSON"}));
    assert_closed(&mut reader).await;
}

#[tokio::test]
async fn test_fan_out_to_two_observers() {
    let (server, addr) = start_server().await;

    let mut first = subscribe(addr, "o1").await;
    let mut second = subscribe(addr, "o2").await;
    wait_for_observers(&server, 2).await;

    one_shot(addr, json!({"UUID": "u1", "ACTION": "set", "ID": "k", "v": true})).await;

    let expected = json!({"id": "k", "v": true});
    assert_eq!(read_json(&mut first).await, expected);
    assert_eq!(read_json(&mut second).await, expected);
}

#[tokio::test]
async fn test_pushes_arrive_in_set_order() {
    let (server, addr) = start_server().await;

    let mut observer = subscribe(addr, "o1").await;
    wait_for_observers(&server, 1).await;

    for id in ["1", "2", "3"] {
        one_shot(addr, json!({"UUID": "u1", "ACTION": "set", "ID": id})).await;
    }

    for id in ["1", "2", "3"] {
        assert_eq!(read_json(&mut observer).await["id"], id);
    }
}

#[tokio::test]
async fn test_disconnected_observer_is_dropped() {
    let (server, addr) = start_server().await;

    let gone = subscribe(addr, "o1").await;
    let mut stays = subscribe(addr, "o2").await;
    wait_for_observers(&server, 2).await;

    drop(gone);

    let response = one_shot(addr, json!({"UUID": "u1", "ACTION": "set", "ID": "z"})).await;
    assert_eq!(response["status"], "OK");
    assert_eq!(read_json(&mut stays).await["id"], "z");

    wait_for_observers(&server, 1).await;
}

#[tokio::test]
async fn test_observer_frames_are_ignored() {
    let (server, addr) = start_server().await;

    let mut observer = subscribe(addr, "o1").await;
    wait_for_observers(&server, 1).await;

    let extra = json!({"UUID": "o1", "ACTION": "list"});
    observer
        .get_mut()
        .write_all(format!("{extra}\n").as_bytes())
        .await
        .unwrap();

    one_shot(addr, json!({"UUID": "u1", "ACTION": "set", "ID": "only"})).await;

    // First thing the observer sees is the push, not a list response
    assert_eq!(read_json(&mut observer).await, json!({"id": "only"}));
}

#[tokio::test]
async fn test_second_bind_reports_addr_in_use() {
    let (_server, addr) = start_server().await;

    let other = RecordServer::new(ServerConfig::with_addr(addr), Arc::new(MemoryStore::new()));
    let err = other.bind().unwrap_err();

    assert!(matches!(err, Error::AddrInUse(a) if a == addr));
    assert_eq!(err.to_string(), format!("Address already in use: {addr}"));
}

#[tokio::test]
async fn test_clients_against_live_server() {
    let (server, addr) = start_server().await;
    let config = ClientConfig::new("127.0.0.1", addr.port()).reconnect(false);

    let (observer, mut events) = ObserverClient::new(config.clone(), "watcher");
    tokio::spawn(async move { observer.run().await });

    let event = timeout(WAIT, events.recv()).await.unwrap();
    assert_eq!(event, Some(ObserverEvent::Connected));
    wait_for_observers(&server, 1).await;

    let client = RequestClient::new(config);
    let request = Request::new("writer", Action::Set)
        .with_id("r1")
        .with_field("color", json!("blue"));
    let reply = client.send(&request).await.unwrap();

    let Reply::Response(response) = reply else {
        panic!("expected a status response");
    };
    assert!(response.is_ok());
    assert_eq!(response.data().unwrap()["color"], "blue");

    match timeout(WAIT, events.recv()).await.unwrap() {
        Some(ObserverEvent::Update(record)) => {
            assert_eq!(record.id(), Some("r1"));
            assert_eq!(record.get("color"), Some(&json!("blue")));
        }
        other => panic!("expected an update, got {other:?}"),
    }

    let stats = server.stats();
    assert!(stats.connections_accepted >= 2);
    assert_eq!(stats.broadcasts, 1);
}
