//! OpenAI chat completions as an analysis provider.
//!
//! Text only: no search grounding and no inline media.

use super::{GenerationRequest, Generator};
use crate::error::{ReplicatorError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// OpenAI-based generator.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIGenerator {
    pub fn new(model: &str, temperature: f32) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            temperature,
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        if request.media.is_some() {
            return Err(ReplicatorError::Analysis(
                "The openai provider cannot take inline media; set ingestion.mode = \"reference\""
                    .to_string(),
            ));
        }
        if request.grounding {
            warn!("Search grounding is not available with the openai provider; continuing without it");
        }

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.clone())
                .build()
                .map_err(|e| ReplicatorError::Analysis(e.to_string()))?
                .into(),
        ];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| ReplicatorError::Analysis(e.to_string()))?;

        let response = self.client.chat().create(chat_request).await.map_err(|e| {
            ReplicatorError::Analysis(format!("OpenAI API error: {}", e))
        })?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ReplicatorError::Analysis("Empty response from LLM".to_string()))?;

        debug!("Model response: {}", content.chars().take(500).collect::<String>());
        Ok(content)
    }
}
