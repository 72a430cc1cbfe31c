//! Slack integration: outbound delivery via the Web API and inbound mention
//! events via Socket Mode.
//!
//! - [`SlackClient`] — `chat.postMessage` with the bot token and the bot's
//!   display identity. Slack reports API errors as HTTP 200 with
//!   `{"ok": false, "error": ...}`; both transport and API failures surface
//!   as `Err` strings carrying the error code.
//! - [`MessageSink`] — the outbound channel seam the delivery cycle posts
//!   through; [`ChannelSink`] binds a client to the configured channel id.
//! - [`ChannelPost`] — the per-channel seam the mention responder replies
//!   through.
//! - [`socket`] — the Socket Mode listener.

pub mod socket;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const SLACK_API_BASE: &str = "https://slack.com/api";

/// Display name the bot posts under.
pub const BOT_USERNAME: &str = "大喜利お題投下Bot";

/// Icon emoji the bot posts with.
pub const BOT_ICON: &str = ":ogiri-bot:";

pub type PostFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;

/// Outbound message channel used by the delivery cycle. The production impl
/// is [`ChannelSink`]; tests substitute recording or failing sinks.
pub trait MessageSink: Send + Sync {
    /// Post a message to the sink's fixed channel.
    fn post(&self, text: &str) -> PostFuture<'_>;
}

/// Per-channel posting seam used by the mention responder, which replies in
/// whatever channel the mention arrived in.
pub trait ChannelPost: Send + Sync {
    fn post_to(&self, channel: &str, text: &str) -> PostFuture<'_>;
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    username: &'a str,
    icon_emoji: &'a str,
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async client for the Slack Web API, bound to the bot token.
pub struct SlackClient {
    client: reqwest::Client,
    bot_token: String,
}

impl SlackClient {
    pub fn new(bot_token: impl Into<String>) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("ogiri-bot/0.1")
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            bot_token: bot_token.into(),
        })
    }

    /// Post a message to an explicit channel under the bot's display
    /// identity.
    pub async fn post_message(&self, channel: &str, text: &str) -> Result<(), String> {
        let body = PostMessageRequest {
            channel,
            username: BOT_USERNAME,
            icon_emoji: BOT_ICON,
            text,
        };
        let resp = self
            .client
            .post(format!("{SLACK_API_BASE}/chat.postMessage"))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("Slack API HTTP {status}"));
        }
        let parsed: PostMessageResponse = resp
            .json()
            .await
            .map_err(|e| format!("failed to parse response: {e}"))?;
        if !parsed.ok {
            return Err(format!(
                "Slack API error: {}",
                parsed.error.unwrap_or_else(|| "unknown".to_string())
            ));
        }
        debug!("Posted {} chars to {channel}", text.len());
        Ok(())
    }
}

impl ChannelPost for SlackClient {
    fn post_to(&self, channel: &str, text: &str) -> PostFuture<'_> {
        let channel = channel.to_string();
        let text = text.to_string();
        Box::pin(async move { self.post_message(&channel, &text).await })
    }
}

/// A [`SlackClient`] bound to one channel id — the delivery cycle's outbound
/// channel.
pub struct ChannelSink {
    client: Arc<SlackClient>,
    channel_id: String,
}

impl ChannelSink {
    pub fn new(client: Arc<SlackClient>, channel_id: impl Into<String>) -> Self {
        Self {
            client,
            channel_id: channel_id.into(),
        }
    }
}

impl MessageSink for ChannelSink {
    fn post(&self, text: &str) -> PostFuture<'_> {
        let text = text.to_string();
        Box::pin(async move { self.client.post_message(&self.channel_id, &text).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_message_request_shape() {
        let body = PostMessageRequest {
            channel: "C123",
            username: BOT_USERNAME,
            icon_emoji: BOT_ICON,
            text: "hello",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["channel"], "C123");
        assert_eq!(json["username"], BOT_USERNAME);
        assert_eq!(json["icon_emoji"], BOT_ICON);
        assert_eq!(json["text"], "hello");
    }

    #[test]
    fn post_message_response_parses_ok_and_error() {
        let ok: PostMessageResponse = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert!(ok.ok);
        assert_eq!(ok.error, None);

        let err: PostMessageResponse =
            serde_json::from_str(r#"{"ok": false, "error": "channel_not_found"}"#).unwrap();
        assert!(!err.ok);
        assert_eq!(err.error.as_deref(), Some("channel_not_found"));
    }
}
