//! Async HTTP client for the Gemini `generateContent` API.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::debug;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>>;

/// Seam between prompt assembly and the text-generation backend.
///
/// Uses a boxed future so the trait stays dyn-compatible; tests substitute
/// stub backends through it.
pub trait GenerateText: Send + Sync {
    /// Generate text for a fully-assembled prompt.
    fn generate(&self, prompt: &str) -> GenerateFuture<'_>;
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize, Debug)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug)]
struct Part {
    text: String,
}

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiErrorResponse>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Extract the first candidate's first text part from a raw response body,
/// trimmed. API-level errors and empty candidate lists surface as `Err`.
fn extract_text(body: &str) -> Result<String, String> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| format!("failed to parse response: {e}"))?;

    if let Some(err) = parsed.error {
        return Err(format!("Gemini API error: {}", err.message));
    }

    parsed
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .map(|p| p.text.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "empty Gemini response (no candidate text)".to_string())
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for one Gemini model.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Create a new client with the given API key and model id.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("ogiri-bot/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    async fn generate_content(&self, prompt: &str) -> Result<String, String> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };
        debug!(
            "Gemini request: model={}, prompt={} chars",
            self.model,
            prompt.len()
        );

        let start = Instant::now();
        let url = format!("{GEMINI_API_BASE}/{}:generateContent", self.model);
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;
        debug!(
            "Gemini response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(format!("Gemini API HTTP {status}: {text}"));
        }

        extract_text(&text)
    }
}

impl GenerateText for GeminiClient {
    fn generate(&self, prompt: &str) -> GenerateFuture<'_> {
        let prompt = prompt.to_string();
        Box::pin(async move { self.generate_content(&prompt).await })
    }
}
