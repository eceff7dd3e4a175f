//! Google Gemini provider
//!
//! Calls the `generateContent` REST endpoint with a single user turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use k2so_core::{GenerationOptions, K2soError, K2soResult, Model, ModelConfig};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted when the config carries no key
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

pub struct GoogleProvider {
    client: reqwest::Client,
    config: ModelConfig,
    api_key: String,
    base_url: String,
}

impl GoogleProvider {
    pub fn new(config: ModelConfig) -> K2soResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                API_KEY_ENV_VARS
                    .iter()
                    .find_map(|var| std::env::var(var).ok().filter(|k| !k.trim().is_empty()))
            })
            .ok_or_else(|| {
                K2soError::config(format!(
                    "Gemini API key not configured (set {})",
                    API_KEY_ENV_VARS.join(" or ")
                ))
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| K2soError::model(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = config
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            config,
            api_key,
            base_url,
        })
    }

    /// Boxed constructor used by the provider factory
    pub fn create(config: ModelConfig) -> K2soResult<Box<dyn Model>> {
        Ok(Box::new(Self::new(config)?))
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.config.model)
    }

    fn build_request(prompt: &str, options: GenerationOptions) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
            },
        }
    }

    fn extract_text(response: GeminiResponse) -> K2soResult<String> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| K2soError::model("Gemini returned no candidates"))?;

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(K2soError::model(format!(
                "Gemini returned an empty response (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl Model for GoogleProvider {
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> K2soResult<String> {
        let request = Self::build_request(prompt, options);
        debug!(
            model = %self.config.model,
            temperature = options.temperature,
            max_tokens = options.max_tokens,
            "Calling Gemini"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| K2soError::model(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| K2soError::model(format!("Failed to read Gemini response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(status = %status, "Gemini API error: {}", message);
            return Err(K2soError::model(format!(
                "Gemini API error ({}): {}",
                status, message
            )));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| K2soError::model(format!("Invalid Gemini response: {}", e)))?;

        Self::extract_text(parsed)
    }

    fn config(&self) -> &ModelConfig {
        &self.config
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}
