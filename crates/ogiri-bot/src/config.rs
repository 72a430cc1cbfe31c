//! Environment configuration.
//!
//! Credentials come from the environment; paths, the model id, and the
//! schedule time come from CLI flags. A missing credential disables only the
//! dependent feature: no app-level token means no mention listener, no
//! channel id means no daily delivery. The bot token and the Gemini key are
//! required by every feature and their absence is fatal at startup.

pub const ENV_BOT_TOKEN: &str = "SLACK_BOT_TOKEN";
pub const ENV_APP_TOKEN: &str = "SLACK_APP_TOKEN";
pub const ENV_CHANNEL_ID: &str = "SLACK_CHANNEL_ID";
pub const ENV_GEMINI_KEY: &str = "GEMINI_API_KEY";

/// Credentials and identifiers read from the environment. Every field is
/// optional here; the binary decides which absences are fatal and which just
/// disable a component.
#[derive(Debug, Clone, Default)]
pub struct BotConfig {
    pub bot_token: Option<String>,
    pub app_token: Option<String>,
    pub channel_id: Option<String>,
    pub gemini_api_key: Option<String>,
}

impl BotConfig {
    /// Read all credentials from the environment. Empty or whitespace-only
    /// values count as absent.
    pub fn from_env() -> Self {
        Self {
            bot_token: normalize(std::env::var(ENV_BOT_TOKEN).ok()),
            app_token: normalize(std::env::var(ENV_APP_TOKEN).ok()),
            channel_id: normalize(std::env::var(ENV_CHANNEL_ID).ok()),
            gemini_api_key: normalize(std::env::var(ENV_GEMINI_KEY).ok()),
        }
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
