//! Language-model abstraction
//!
//! The bot only needs "prompt in, text out" with a per-call temperature and
//! token budget. Providers live in `k2so-llm`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::K2soResult;

/// Supported model providers
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    #[default]
    Google,
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub provider: ModelProvider,

    /// API key (falls back to the provider's environment variable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override for the provider's base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Conversational temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_timeout() -> u64 {
    60
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            provider: ModelProvider::default(),
            api_key: None,
            endpoint: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Per-call sampling options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationOptions {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

impl From<&ModelConfig> for GenerationOptions {
    fn from(config: &ModelConfig) -> Self {
        Self::new(config.temperature, config.max_tokens)
    }
}

/// A text-generation backend
#[async_trait]
pub trait Model: Send + Sync {
    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str, options: GenerationOptions) -> K2soResult<String>;

    fn config(&self) -> &ModelConfig;

    /// Sampling options for a plain conversational call
    fn default_options(&self) -> GenerationOptions {
        GenerationOptions::from(self.config())
    }
}
