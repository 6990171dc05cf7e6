//! WebSocket upgrades through a running server.

use futures_util::{SinkExt, StreamExt};
use kairos_core::Response;
use kairos_server::{App, Server, ShutdownSignal};
use kairos_ws::{Message, WebSocket, WebSocketUpgrade};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tungstenite::client::IntoClientRequest;

async fn echo(ws: WebSocketUpgrade) -> Response {
    ws.protocol(["echo.v1"]).on_upgrade(|mut socket: WebSocket| async move {
        let protocol = socket.protocol().unwrap_or("none").to_string();
        while let Some(Ok(message)) = socket.recv().await {
            if let Message::Text(text) = message {
                let reply = format!("{protocol}: {}", text.as_str());
                if socket.send_text(reply).await.is_err() {
                    break;
                }
            }
        }
    })
}

async fn start() -> (std::net::SocketAddr, ShutdownSignal) {
    let mut app = App::new();
    app.get("/ws", echo).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Server::builder().service(app.build().unwrap()).build().unwrap();
    let shutdown = ShutdownSignal::new();
    tokio::spawn(server.run_with_listener(listener, shutdown.clone()));
    (addr, shutdown)
}

#[tokio::test]
async fn test_echo_over_upgraded_connection() {
    let (addr, shutdown) = start().await;

    let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
    request
        .headers_mut()
        .insert("sec-websocket-protocol", "echo.v1".parse().unwrap());
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut client, response) = tokio_tungstenite::client_async(request, stream).await.unwrap();

    assert_eq!(response.status(), http::StatusCode::SWITCHING_PROTOCOLS);
    assert_eq!(response.headers()["sec-websocket-protocol"], "echo.v1");

    client.send(Message::text("hello")).await.unwrap();
    let reply = client.next().await.unwrap().unwrap();
    assert_eq!(reply.to_text().unwrap(), "echo.v1: hello");

    client.close(None).await.unwrap();
    shutdown.trigger();
}

#[tokio::test]
async fn test_incomplete_handshake_is_rejected() {
    let (addr, shutdown) = start().await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /ws HTTP/1.1\r\nHost: localhost\r\nUpgrade: websocket\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 400"), "got: {response}");
    assert!(response.contains("INVALID_UPGRADE"));
    shutdown.trigger();
}
