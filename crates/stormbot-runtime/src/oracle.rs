//! [`OracleClient`] – advisory decision service interface.
//!
//! Talks to a hosted `generateContent` endpoint: one free-text prompt in, one
//! text reply out. The reply is *untrusted* — it may be prose, fenced
//! markdown, or garbage — and is only ever consumed through the JSON
//! extractor and the validator.
//!
//! The network call carries a fixed timeout, nothing more: an oracle that is
//! slow or down costs a skipped cycle, never a hung robot. (Motion, by
//! contrast, is always bounded — see the executor.)

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed network timeout for one oracle round-trip.
const NETWORK_TIMEOUT: Duration = Duration::from_secs(30);

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise from an oracle request.
#[derive(Error, Debug)]
pub enum OracleError {
    /// The service returned HTTP 429. Treated as "no decision"; the request
    /// budget is not consumed.
    #[error("oracle rate-limited the request")]
    RateLimited,
    /// The HTTP request failed (network error, timeout, non-2xx status).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The response body did not have the expected shape.
    #[error("unexpected response format: {0}")]
    BadResponse(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Generation settings
// ─────────────────────────────────────────────────────────────────────────────

/// Sampling settings attached to a request. The obstacle path runs cooler
/// and shorter than the general path.
#[derive(Debug, Clone, Copy)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
}

impl GenerationSettings {
    /// Settings for the general decision path.
    pub const GENERAL: Self = Self {
        temperature: 0.8,
        max_output_tokens: 800,
        top_p: 0.9,
    };

    /// Settings for the obstacle-reaction path.
    pub const OBSTACLE: Self = Self {
        temperature: 0.7,
        max_output_tokens: 500,
        top_p: 0.9,
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire shapes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "topP")]
    top_p: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// DecisionOracle
// ─────────────────────────────────────────────────────────────────────────────

/// The seam between the decision engine and the remote service. Production
/// code uses [`OracleClient`]; tests substitute canned replies.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    /// Send `prompt` and return the raw reply text.
    ///
    /// # Errors
    ///
    /// [`OracleError::RateLimited`] on HTTP 429, [`OracleError::Http`] on any
    /// other transport failure, [`OracleError::BadResponse`] when the body
    /// has no reply text.
    async fn complete(
        &self,
        prompt: &str,
        settings: &GenerationSettings,
    ) -> Result<String, OracleError>;
}

/// An async client for a `generateContent`-style endpoint.
///
/// Construct once and reuse across decision cycles.
pub struct OracleClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl OracleClient {
    /// Create a new client pointing at `base_url` and using `model`.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(NETWORK_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            client,
        }
    }

    fn request_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[async_trait]
impl DecisionOracle for OracleClient {
    async fn complete(
        &self,
        prompt: &str,
        settings: &GenerationSettings,
    ) -> Result<String, OracleError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: settings.temperature,
                max_output_tokens: settings.max_output_tokens,
                top_p: settings.top_p,
            },
        };

        let response = self
            .client
            .post(self.request_url())
            .json(&body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(OracleError::RateLimited);
        }

        let parsed: GenerateResponse = response.error_for_status()?.json().await?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| OracleError::BadResponse("empty candidates array".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_uses_wire_field_names() {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.8,
                max_output_tokens: 800,
                top_p: 0.9,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"generationConfig\""));
        assert!(json.contains("\"maxOutputTokens\":800"));
        assert!(json.contains("\"topP\""));
        assert!(json.contains("\"text\":\"hello\""));
    }

    #[test]
    fn response_text_parses_from_candidates() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"action\":\"stop\"}"}]}}
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.candidates[0].content.parts[0].text,
            "{\"action\":\"stop\"}"
        );
    }

    #[test]
    fn empty_response_parses_to_no_candidates() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }

    #[test]
    fn request_url_names_the_model() {
        let client = OracleClient::new("https://example.invalid", "gemma-3-27b-it", "k");
        let url = client.request_url();
        assert!(url.contains("/v1beta/models/gemma-3-27b-it:generateContent"));
    }

    #[test]
    fn settings_presets_differ_per_path() {
        assert!(GenerationSettings::OBSTACLE.temperature < GenerationSettings::GENERAL.temperature);
        assert!(
            GenerationSettings::OBSTACLE.max_output_tokens
                < GenerationSettings::GENERAL.max_output_tokens
        );
    }
}
