//! WebSocket test client
//!
//! Thin wrapper over a tokio-tungstenite stream speaking the signaling
//! envelope format.

#![allow(dead_code)]

use super::constants::*;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    /// Connection handle announced by the server in the `connected` event
    pub connection_id: String,
}

impl TestClient {
    /// Connects and consumes the initial `connected` event.
    pub async fn connect(ws_url: &str) -> Self {
        let (ws, _) = connect_async(ws_url)
            .await
            .expect("Failed to connect to WebSocket");

        let mut client = Self {
            ws,
            connection_id: String::new(),
        };

        let connected = client.expect_message("connected").await;
        client.connection_id = connected["payload"]["connectionId"]
            .as_str()
            .expect("connected event without connectionId")
            .to_string();

        client
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("Failed to send frame");
    }

    pub async fn send_json(&mut self, value: Value) {
        self.send_raw(&value.to_string()).await;
    }

    /// Registers `user_id` and returns the `registered` acknowledgement.
    pub async fn register(&mut self, user_id: &str) -> Value {
        self.send_json(json!({"type": "register", "payload": {"userId": user_id}}))
            .await;
        self.expect_message("registered").await
    }

    pub async fn call_offer(&mut self, to: &str, offer: Value) {
        self.send_json(json!({"type": "call-offer", "payload": {"to": to, "offer": offer}}))
            .await;
    }

    pub async fn accept_call(&mut self, to: &str, answer: Value) {
        self.send_json(json!({"type": "accept-call", "payload": {"to": to, "answer": answer}}))
            .await;
    }

    pub async fn ice_candidate(&mut self, to: &str, candidate: Value) {
        self.send_json(
            json!({"type": "ice-candidate", "payload": {"to": to, "candidate": candidate}}),
        )
        .await;
    }

    pub async fn hangup(&mut self, to: &str) {
        self.send_json(json!({"type": "hangup", "payload": {"to": to}}))
            .await;
    }

    /// Next text frame as sent by the server, or `None` on timeout or close.
    pub async fn recv_text(&mut self, wait: Duration) -> Option<String> {
        timeout(wait, async {
            while let Some(Ok(msg)) = self.ws.next().await {
                match msg {
                    Message::Text(text) => return Some(text.as_str().to_string()),
                    Message::Close(_) => return None,
                    _ => continue,
                }
            }
            None
        })
        .await
        .ok()
        .flatten()
    }

    /// Next JSON text frame, or `None` on timeout or close.
    pub async fn recv(&mut self, wait: Duration) -> Option<Value> {
        self.recv_text(wait).await.map(|text| {
            serde_json::from_str::<Value>(&text).expect("Server sent invalid JSON")
        })
    }

    /// Waits for the next frame, asserts its type and returns its raw text.
    pub async fn expect_frame(&mut self, expected_type: &str) -> String {
        let text = self
            .recv_text(Duration::from_millis(MESSAGE_TIMEOUT_MS))
            .await
            .unwrap_or_else(|| panic!("Timed out waiting for {}", expected_type));
        let message: Value = serde_json::from_str(&text).expect("Server sent invalid JSON");
        assert_eq!(message["type"], expected_type, "Unexpected message: {}", text);
        text
    }

    /// Waits for the next message and asserts its type.
    pub async fn expect_message(&mut self, expected_type: &str) -> Value {
        let message = self
            .recv(Duration::from_millis(MESSAGE_TIMEOUT_MS))
            .await
            .unwrap_or_else(|| panic!("Timed out waiting for {}", expected_type));
        assert_eq!(
            message["type"], expected_type,
            "Unexpected message: {}",
            message
        );
        message
    }

    /// Asserts that nothing arrives for a short window.
    pub async fn expect_silence(&mut self) {
        if let Some(message) = self.recv(Duration::from_millis(SILENCE_WINDOW_MS)).await {
            panic!("Expected no message, got {}", message);
        }
    }

    pub async fn close(mut self) {
        self.ws.close(None).await.ok();
    }
}
