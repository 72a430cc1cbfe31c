//! Slack Socket Mode listener.
//!
//! Opens an app-level websocket session (`apps.connections.open` → wss URL),
//! acknowledges every envelope Slack delivers, and forwards `app_mention`
//! events to the responder loop over an mpsc channel. Event bodies are only
//! logged; nothing beyond the channel id and text is parsed out.
//!
//! Slack periodically asks clients to reconnect via `disconnect` envelopes;
//! the run loop treats those like any other session end and reconnects after
//! a short delay.

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::SLACK_API_BASE;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// An inbound `app_mention` event, reduced to what the responder needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionEvent {
    /// Channel the mention happened in — replies go back here.
    pub channel: String,
    /// Raw message text, logged but not otherwise interpreted.
    pub text: String,
}

#[derive(Deserialize, Debug)]
struct ConnectionsOpenResponse {
    ok: bool,
    error: Option<String>,
    url: Option<String>,
}

/// Extract a mention from a Socket Mode envelope, if it carries one.
///
/// Only `events_api` envelopes whose inner event is an `app_mention` with a
/// channel id produce an event; everything else is `None`.
fn parse_mention(envelope: &serde_json::Value) -> Option<MentionEvent> {
    if envelope.get("type").and_then(serde_json::Value::as_str) != Some("events_api") {
        return None;
    }
    let event = envelope.pointer("/payload/event")?;
    if event.get("type").and_then(serde_json::Value::as_str) != Some("app_mention") {
        return None;
    }
    let channel = event
        .get("channel")
        .and_then(serde_json::Value::as_str)
        .filter(|c| !c.is_empty())?;
    let text = event
        .get("text")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    Some(MentionEvent {
        channel: channel.to_owned(),
        text: text.to_owned(),
    })
}

/// Always-on Socket Mode session bound to the app-level token.
pub struct SocketModeListener {
    client: reqwest::Client,
    app_token: String,
}

impl SocketModeListener {
    pub fn new(app_token: impl Into<String>) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("ogiri-bot/0.1")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            app_token: app_token.into(),
        })
    }

    /// Run the listener, reconnecting whenever a session ends. Returns only
    /// when the receiving side of `tx` has been dropped.
    pub async fn run(&self, tx: mpsc::Sender<MentionEvent>) -> Result<(), String> {
        loop {
            if let Err(e) = self.run_session(&tx).await {
                if tx.is_closed() {
                    return Ok(());
                }
                warn!("Socket Mode session ended: {e}; reconnecting in {RECONNECT_DELAY:?}");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }

    async fn open_session_url(&self) -> Result<String, String> {
        let resp = self
            .client
            .post(format!("{SLACK_API_BASE}/apps.connections.open"))
            .bearer_auth(&self.app_token)
            .send()
            .await
            .map_err(|e| format!("apps.connections.open request failed: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("apps.connections.open HTTP {status}"));
        }
        let parsed: ConnectionsOpenResponse = resp
            .json()
            .await
            .map_err(|e| format!("failed to parse apps.connections.open response: {e}"))?;
        if !parsed.ok {
            return Err(format!(
                "apps.connections.open error: {}",
                parsed.error.unwrap_or_else(|| "unknown".to_string())
            ));
        }
        parsed
            .url
            .ok_or_else(|| "apps.connections.open returned no url".to_string())
    }

    async fn run_session(&self, tx: &mpsc::Sender<MentionEvent>) -> Result<(), String> {
        let ws_url = self.open_session_url().await?;
        let (stream, _) = tokio_tungstenite::connect_async(&ws_url)
            .await
            .map_err(|e| format!("websocket connect failed: {e}"))?;
        let (mut write, mut read) = stream.split();
        info!("Socket Mode connected");

        while let Some(msg) = read.next().await {
            let raw = match msg {
                Ok(Message::Text(text)) => text.to_string(),
                Ok(Message::Ping(payload)) => {
                    write
                        .send(Message::Pong(payload))
                        .await
                        .map_err(|e| format!("pong failed: {e}"))?;
                    continue;
                }
                Ok(Message::Close(_)) => return Err("websocket closed by Slack".to_string()),
                Ok(_) => continue,
                Err(e) => return Err(format!("websocket error: {e}")),
            };

            let envelope: serde_json::Value = match serde_json::from_str(&raw) {
                Ok(v) => v,
                Err(_) => continue,
            };

            // Every envelope carrying an id must be acked or Slack stops
            // delivering events to this session.
            if let Some(envelope_id) = envelope
                .get("envelope_id")
                .and_then(serde_json::Value::as_str)
            {
                let ack = json!({ "envelope_id": envelope_id });
                write
                    .send(Message::Text(ack.to_string()))
                    .await
                    .map_err(|e| format!("ack failed: {e}"))?;
            }

            match envelope.get("type").and_then(serde_json::Value::as_str) {
                Some("hello") => {
                    debug!("Socket Mode hello");
                    continue;
                }
                Some("disconnect") => return Err("disconnect requested by Slack".to_string()),
                _ => {}
            }

            let Some(mention) = parse_mention(&envelope) else {
                continue;
            };
            debug!("Inbound mention in {}: {}", mention.channel, mention.text);
            if tx.send(mention).await.is_err() {
                return Err("mention receiver dropped".to_string());
            }
        }
        Err("websocket stream ended".to_string())
    }
}
