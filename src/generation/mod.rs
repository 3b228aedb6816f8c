//! Language model generation.
//!
//! The analysis step sends one prompt, optionally with inline media and search
//! grounding, and gets free-form text back. Providers sit behind [`Generator`].

mod gemini;
mod openai;

pub use gemini::{GeminiConfig, GeminiGenerator};
pub use openai::OpenAIGenerator;

use crate::config::{AnalysisProvider, Settings};
use crate::error::{ReplicatorError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Default timeout for generation requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Media attached to a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// A single generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub media: Option<MediaPayload>,
    /// Ask the provider to ground the answer in web search results.
    pub grounding: bool,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            media: None,
            grounding: false,
        }
    }

    pub fn with_media(mut self, media: MediaPayload) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_grounding(mut self, grounding: bool) -> Self {
        self.grounding = grounding;
        self
    }
}

/// Trait for text generation providers.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Model identifier, for display.
    fn model(&self) -> &str;

    /// Run the request once. Empty output is an error.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Build a reqwest client with the given timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ReplicatorError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Create the generator configured in settings.
pub fn create_generator(settings: &Settings) -> Result<Box<dyn Generator>> {
    match settings.analysis.provider {
        AnalysisProvider::Gemini => {
            let config = GeminiConfig::from_settings(settings)?;
            Ok(Box::new(GeminiGenerator::new(config)?))
        }
        AnalysisProvider::OpenAI => Ok(Box::new(OpenAIGenerator::new(
            &settings.openai.model,
            settings.analysis.temperature,
        )?)),
    }
}
