use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use crate::config::GeminiConfig;
use crate::error::{PipelineError, Result};
use crate::prompt::Prompt;

const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Transport failures reach the HTTP caller, so the request URL is dropped
/// from the message.
fn upstream(err: reqwest::Error) -> PipelineError {
    PipelineError::Upstream(err.without_url().to_string())
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Sends one prompt and returns the generated text untouched.
    async fn summarize(&self, prompt: Prompt) -> Result<String>;
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
    status: Option<String>,
}

impl GenerateContentResponse {
    /// Text parts of the first candidate, joined.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|part| part.text.as_deref()).collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl Summarizer for GeminiClient {
    async fn summarize(&self, prompt: Prompt) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            PipelineError::Configuration("GEMINI_API_KEY environment variable not set.".to_string())
        })?;

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".into(),
                parts: vec![Part {
                    text: prompt.as_str().to_string(),
                }],
            }],
        };

        debug!(model = %self.model, "Sending generateContent request");
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(upstream)?;

        let status = response.status();
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        let response_text = response
            .text()
            .await
            .map_err(upstream)?;

        if !status.is_success() {
            error!("API error: {} - {}", status, response_text);
            let api_error = serde_json::from_str::<ErrorEnvelope>(&response_text)
                .ok()
                .map(|envelope| envelope.error);
            let exhausted = api_error
                .as_ref()
                .and_then(|e| e.status.as_deref())
                .is_some_and(|s| s == RESOURCE_EXHAUSTED);

            if status == StatusCode::TOO_MANY_REQUESTS || exhausted {
                return Err(PipelineError::QuotaExceeded { retry_after_secs });
            }

            let message = api_error
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("status {}", status.as_u16()));
            return Err(PipelineError::Upstream(message));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&response_text).map_err(|e| {
            error!("Failed to parse response: {}", e);
            PipelineError::Upstream(format!("Failed to parse response: {}", e))
        })?;

        parsed.text().ok_or_else(|| {
            let reason = parsed
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
                .map(|reason| format!("prompt blocked ({})", reason))
                .unwrap_or_else(|| "response contained no text".to_string());
            PipelineError::Upstream(reason)
        })
    }
}
