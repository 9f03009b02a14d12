//! End-to-end serving tests over a real socket

mod common;

use common::{catalog, HostFixture, Recorder, TestModule};
use hyper::StatusCode;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::time::{timeout, Duration};

use modhost::http::{handler, json_response, HttpServer};
use modhost::modules::{builtin_catalog, builtin_surfaces};
use modhost::Host;

async fn request(addr: std::net::SocketAddr, raw: String) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();

    let mut buf = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut buf))
        .await
        .expect("response timed out")
        .unwrap();
    let text = String::from_utf8(buf).unwrap();

    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();
    (status, body)
}

fn get(path: &str) -> String {
    format!("GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n", path)
}

fn post_json(path: &str, body: &str) -> String {
    format!(
        "POST {} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        path,
        body.len(),
        body
    )
}

#[tokio::test]
async fn test_serves_builtin_modules_until_shutdown() {
    let fixture = HostFixture::new();
    let host = Host::build(&fixture.config(), builtin_catalog().unwrap(), builtin_surfaces()).await;
    assert!(host.report().is_clean());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let serving = tokio::spawn(host.serve(listener, shutdown_rx));

    let (status, body) = request(addr, get("/api/host/ping")).await;
    assert_eq!(status, 200);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["module"], "host");

    let (status, body) = request(addr, post_json("/api/echo", r#"{"hello":"world"}"#)).await;
    assert_eq!(status, 200);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["echo"]["hello"], "world");

    let (status, body) = request(addr, get("/api/host/modules")).await;
    assert_eq!(status, 200);
    let body: Value = serde_json::from_str(&body).unwrap();
    let modules = body["modules"].as_array().unwrap();
    assert_eq!(modules.len(), 2);
    assert_eq!(modules[1]["name"], "echo");
    assert_eq!(modules[1]["state"], "loaded");
    assert_eq!(body["report"]["loaded"], serde_json::json!(["host", "echo"]));

    let (status, body) = request(addr, get("/api/nowhere")).await;
    assert_eq!(status, 404);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    shutdown_tx.send(true).unwrap();
    timeout(Duration::from_secs(5), serving)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_oversized_json_body_is_rejected() {
    let fixture = HostFixture::new();
    let mut config = fixture.config();
    config.http.max_request_bytes = 8192;
    config.http.json_body_limit = 512;
    let host = Host::build(&config, builtin_catalog().unwrap(), builtin_surfaces()).await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let serving = tokio::spawn(host.serve(listener, shutdown_rx));

    let big = format!("\"{}\"", "x".repeat(4096));
    let (status, _) = request(addr, post_json("/api/echo", &big)).await;
    assert_eq!(status, 413);

    drop(shutdown_tx);
    timeout(Duration::from_secs(5), serving)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_request() {
    let finished = Arc::new(AtomicBool::new(false));
    let (started_tx, mut started_rx) = mpsc::unbounded_channel();

    let mut server = HttpServer::default();
    let done = Arc::clone(&finished);
    server.get(
        "/slow",
        handler(move |_req| {
            let done = Arc::clone(&done);
            let started = started_tx.clone();
            async move {
                let _ = started.send(());
                tokio::time::sleep(Duration::from_millis(200)).await;
                done.store(true, Ordering::SeqCst);
                Ok(json_response(StatusCode::OK, &json!({ "slow": true })))
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let serving = tokio::spawn(Arc::new(server).serve(listener, shutdown_rx));

    let client = tokio::spawn(request(addr, get("/slow")));
    started_rx.recv().await.unwrap();
    shutdown_tx.send(true).unwrap();

    timeout(Duration::from_secs(5), serving)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
    assert!(finished.load(Ordering::SeqCst));

    let (status, body) = client.await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["slow"], true);
}

#[tokio::test]
async fn test_idle_keep_alive_connection_does_not_block_shutdown() {
    let fixture = HostFixture::new();
    let recorder = Recorder::default();
    let module = TestModule::new("a", &recorder);
    let ping = module.ping_path();
    let host = Host::build(&fixture.config(), catalog(&[module]), builtin_surfaces()).await;
    assert_eq!(host.report().loaded, vec!["a"]);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let serving = tokio::spawn(host.serve(listener, shutdown_rx));

    // Keep-alive: the server holds the connection open after responding
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let raw = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", ping);
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut buf = vec![0u8; 1024];
    let n = timeout(Duration::from_secs(5), stream.read(&mut buf))
        .await
        .expect("response timed out")
        .unwrap();
    assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 200"));
    assert_eq!(recorder.disabled(), 0);

    shutdown_tx.send(true).unwrap();
    timeout(Duration::from_secs(5), serving)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    // Modules are disabled only after the connection has been closed
    assert_eq!(recorder.disabled(), 1);
    let mut rest = Vec::new();
    let closed = timeout(Duration::from_secs(5), stream.read_to_end(&mut rest)).await;
    assert!(closed.is_ok());
}
