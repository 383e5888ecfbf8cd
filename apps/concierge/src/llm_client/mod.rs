//! LLM Client: the single point of entry for all generative-AI calls.
//!
//! No other module may call the model API directly. Everything upstream goes
//! through the `Upstream` trait.
//!
//! Model: gemini-2.5-flash, hardcoded.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// The model used for all upstream calls.
pub const MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model returned empty content")]
    EmptyContent,
}

/// A generative-AI backend that turns one instruction into free text.
///
/// Implementations perform exactly one attempt; retry policy belongs to the caller.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Enables search grounding on the request.
#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl LlmResponse {
    /// Concatenates the text parts of the first candidate.
    /// Grounded answers are often split across several parts.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
    status: Option<String>,
}

/// Gemini `generateContent` client with Google Search grounding enabled.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// Makes a single call to the model, returning the full response object.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, UpstreamError> {
        let request_body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
        };

        let response = self
            .client
            .post(format!("{GEMINI_API_BASE}/{MODEL}:generateContent"))
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = parse_error_message(&body);
            warn!("Model API returned {}: {}", status, message);
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await?;

        if let Some(usage) = &llm_response.usage_metadata {
            debug!(
                "Model call succeeded: prompt_tokens={}, output_tokens={}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl Upstream for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        let response = self.call(prompt, prompts::JSON_ONLY_SYSTEM).await?;
        response.text().ok_or(UpstreamError::EmptyContent)
    }
}

/// Extracts `error.message` (prefixed by the provider status name) from an
/// error body, falling back to the raw body.
fn parse_error_message(body: &str) -> String {
    match serde_json::from_str::<GeminiError>(body) {
        Ok(e) => match e.error.status {
            Some(status) => format!("{status}: {}", e.error.message),
            None => e.error.message,
        },
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_enables_search_grounding() {
        let body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: "sys" }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: "hi" }],
            }],
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value["tools"][0].get("google_search").is_some());
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let json = r#"{
            "candidates": [{"content": {"parts": [{"text": "Olá "}, {"text": "{\"a\":1}"}]}}],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5}
        }"#;
        let response: LlmResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().as_deref(), Some("Olá {\"a\":1}"));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let response: LlmResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_parse_error_message_with_status() {
        let body = r#"{"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}}"#;
        assert_eq!(parse_error_message(body), "PERMISSION_DENIED: API key not valid");
    }

    #[test]
    fn test_parse_error_message_raw_fallback() {
        assert_eq!(parse_error_message("upstream exploded"), "upstream exploded");
    }

    #[test]
    fn test_api_error_display_carries_status() {
        let err = UpstreamError::Api {
            status: 404,
            message: "NOT_FOUND: model not found".to_string(),
        };
        assert!(err.to_string().contains("404"));
    }
}
