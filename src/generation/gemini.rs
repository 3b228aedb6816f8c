//! Gemini on Vertex AI, through the REST `generateContent` endpoint.

use super::{http_client, GenerationRequest, Generator, DEFAULT_TIMEOUT_SECS};
use crate::config::Settings;
use crate::error::{ReplicatorError, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Connection settings for a Gemini generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    pub project_id: String,
    pub location: String,
    pub model: String,
    pub temperature: f32,
    /// Environment variable holding an OAuth access token.
    pub access_token_env: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let project_id = settings.gemini.resolved_project().ok_or_else(|| {
            ReplicatorError::Config(
                "No Google Cloud project configured. Set gemini.project_id or GOOGLE_CLOUD_PROJECT."
                    .to_string(),
            )
        })?;

        Ok(Self {
            project_id,
            location: settings.gemini.location.clone(),
            model: settings.gemini.model.clone(),
            temperature: settings.analysis.temperature,
            access_token_env: settings.gemini.access_token_env.clone(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Vertex AI `generateContent` URL for this model.
    pub fn endpoint(&self) -> String {
        format!(
            "https://{loc}-aiplatform.googleapis.com/v1/projects/{project}/locations/{loc}/publishers/google/models/{model}:generateContent",
            loc = self.location,
            project = self.project_id,
            model = self.model,
        )
    }
}

/// Gemini-based generator.
pub struct GeminiGenerator {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiGenerator {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        info!(
            "Using Vertex AI (project: {}, location: {}, model: {})",
            config.project_id, config.location, config.model
        );
        Ok(Self {
            http: http_client(config.timeout)?,
            config,
        })
    }

    /// Same connection, different model.
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            http: self.http.clone(),
            config: GeminiConfig {
                model: model.to_string(),
                ..self.config.clone()
            },
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Access token from the configured variable, else from gcloud.
    async fn access_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var(&self.config.access_token_env) {
            if !token.trim().is_empty() {
                return Ok(token.trim().to_string());
            }
        }

        debug!("Fetching access token from gcloud");
        token_from_command("gcloud", &["auth", "print-access-token"]).await
    }

    /// Request body for `generateContent`.
    fn build_body(&self, request: &GenerationRequest) -> Value {
        let mut parts = Vec::new();
        if let Some(media) = &request.media {
            parts.push(json!({
                "inlineData": {
                    "mimeType": media.mime_type,
                    "data": base64::engine::general_purpose::STANDARD.encode(&media.data),
                }
            }));
        }
        parts.push(json!({ "text": request.prompt }));

        let mut body = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "temperature": self.config.temperature },
        });

        // JSON response mode cannot be combined with the search tool, so the
        // output format is enforced by the prompt alone.
        if request.grounding {
            body["tools"] = json!([{ "googleSearch": {} }]);
        }

        body
    }
}

/// Run a credential helper and take its trimmed stdout as the token.
/// Every failure here is an analysis failure: the request cannot be sent.
async fn token_from_command(program: &str, args: &[&str]) -> Result<String> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReplicatorError::Analysis(format!(
                "No access token: {} is not installed and the token variable is unset",
                program
            )),
            _ => ReplicatorError::Analysis(format!("Failed to run {}: {}", program, e)),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReplicatorError::Analysis(format!(
            "{} {} failed: {}",
            program,
            args.join(" "),
            stderr.trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ReplicatorError::Analysis(format!(
            "{} returned an empty token",
            program
        )));
    }
    Ok(token)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    search_entry_point: Option<SearchEntryPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchEntryPoint {
    rendered_content: Option<String>,
}

/// Join the text parts of the first candidate.
fn extract_text(response: &GenerateContentResponse) -> Result<String> {
    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| ReplicatorError::Analysis("Response contained no candidates".into()))?;

    match candidate
        .grounding_metadata
        .as_ref()
        .and_then(|g| g.search_entry_point.as_ref())
        .and_then(|s| s.rendered_content.as_ref())
    {
        Some(rendered) => info!("Grounding source: {} chars", rendered.len()),
        None => debug!("Grounding source: none"),
    }

    let text = candidate
        .content
        .as_ref()
        .map(|c| {
            c.parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ReplicatorError::Analysis(format!(
            "Empty response from model (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(text)
}

/// Best-effort message from a Vertex AI error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(500).collect())
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip(self, request), fields(model = %self.config.model, grounding = request.grounding))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let token = self.access_token().await?;
        let body = self.build_body(request);

        debug!("POST {}", self.config.endpoint());
        let response = self
            .http
            .post(self.config.endpoint())
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReplicatorError::Analysis(format!("Vertex AI request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ReplicatorError::Analysis(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            warn!("Vertex AI returned {}", status);
            return Err(ReplicatorError::Analysis(format!(
                "Vertex AI returned {}: {}",
                status,
                error_message(&text)
            )));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text).map_err(|e| {
            ReplicatorError::Analysis(format!("Unexpected response shape: {}", e))
        })?;

        extract_text(&parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::MediaPayload;

    fn config() -> GeminiConfig {
        GeminiConfig {
            project_id: "demo-project".into(),
            location: "us-central1".into(),
            model: "gemini-2.0-flash".into(),
            temperature: 0.4,
            access_token_env: "REPLICATOR_TEST_TOKEN".into(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            config().endpoint(),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/demo-project/locations/us-central1/publishers/google/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_body_with_grounding() {
        let generator = GeminiGenerator::new(config()).unwrap();
        let body = generator.build_body(&GenerationRequest::new("find it").with_grounding(true));

        assert_eq!(body["contents"][0]["parts"][0]["text"], "find it");
        assert_eq!(body["tools"][0]["googleSearch"], json!({}));
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_body_with_media_puts_media_first() {
        let generator = GeminiGenerator::new(config()).unwrap();
        let body = generator.build_body(&GenerationRequest::new("listen").with_media(MediaPayload {
            data: b"abc".to_vec(),
            mime_type: "audio/mpeg".into(),
        }));

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "audio/mpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "YWJj");
        assert_eq!(parts[1]["text"], "listen");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"goal\":" }, { "text": "\"x\"}" }] },
                "finishReason": "STOP",
                "groundingMetadata": { "searchEntryPoint": { "renderedContent": "<div/>" } }
            }]
        }))
        .unwrap();

        assert_eq!(extract_text(&response).unwrap(), "{\"goal\":\n\"x\"}");
    }

    #[test]
    fn test_extract_text_empty_is_analysis_error() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [] }, "finishReason": "SAFETY" }]
        }))
        .unwrap();

        match extract_text(&response) {
            Err(ReplicatorError::Analysis(msg)) => assert!(msg.contains("SAFETY")),
            other => panic!("unexpected: {:?}", other),
        }

        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(extract_text(&response), Err(ReplicatorError::Analysis(_))));
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"error": {"code": 404, "message": "Model not found", "status": "NOT_FOUND"}}"#;
        assert_eq!(error_message(body), "Model not found");
        assert_eq!(error_message("plain failure"), "plain failure");
    }

    #[tokio::test]
    async fn test_missing_token_helper_is_analysis_error() {
        let err = token_from_command("replicator-no-such-tool", &["auth"])
            .await
            .unwrap_err();
        assert!(matches!(err, ReplicatorError::Analysis(_)));
    }

    #[tokio::test]
    async fn test_failing_token_helper_is_analysis_error() {
        let err = token_from_command("sh", &["-c", "echo denied >&2; exit 1"])
            .await
            .unwrap_err();
        assert!(matches!(err, ReplicatorError::Analysis(msg) if msg.contains("denied")));
    }

    #[tokio::test]
    async fn test_empty_token_is_analysis_error() {
        let err = token_from_command("sh", &["-c", "true"]).await.unwrap_err();
        assert!(matches!(err, ReplicatorError::Analysis(_)));

        let token = token_from_command("sh", &["-c", "echo ' ya29.token '"]).await.unwrap();
        assert_eq!(token, "ya29.token");
    }

    #[test]
    fn test_with_model_keeps_connection_settings() {
        let generator = GeminiGenerator::new(config()).unwrap();
        let other = generator.with_model("gemini-1.5-pro");
        assert_eq!(other.model(), "gemini-1.5-pro");
        assert_eq!(other.config().project_id, "demo-project");
    }
}
