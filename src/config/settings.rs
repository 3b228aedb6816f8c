//! Configuration settings for Replicator.

use crate::executor::CommandPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub analysis: AnalysisSettings,
    pub gemini: GeminiSettings,
    pub openai: OpenAISettings,
    pub ingestion: IngestionSettings,
    pub output: OutputSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for temporary files.
    pub temp_dir: String,
    /// Log level used when no -v flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            temp_dir: "/tmp/replicator".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Language model provider used for analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisProvider {
    /// Gemini on Vertex AI (default, supports search grounding and media).
    #[default]
    Gemini,
    /// OpenAI chat completions (text only).
    OpenAI,
}

impl std::str::FromStr for AnalysisProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "vertex" => Ok(AnalysisProvider::Gemini),
            "openai" => Ok(AnalysisProvider::OpenAI),
            _ => Err(format!("Unknown analysis provider: {}", s)),
        }
    }
}

impl std::fmt::Display for AnalysisProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisProvider::Gemini => write!(f, "gemini"),
            AnalysisProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Analysis call settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Provider (gemini, openai).
    pub provider: AnalysisProvider,
    /// Augment the call with web search results.
    pub grounding: bool,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            provider: AnalysisProvider::Gemini,
            grounding: true,
            temperature: 0.4,
        }
    }
}

/// Gemini on Vertex AI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    /// Google Cloud project. Falls back to `GOOGLE_CLOUD_PROJECT` when empty.
    pub project_id: String,
    /// Vertex AI region.
    pub location: String,
    /// Model used for analysis.
    pub model: String,
    /// Environment variable holding an OAuth access token.
    /// When unset, `gcloud auth print-access-token` is used.
    pub access_token_env: String,
    /// Models probed by `replicator models`.
    pub candidate_models: Vec<String>,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            location: "us-central1".to_string(),
            model: "gemini-2.0-flash".to_string(),
            access_token_env: "VERTEX_ACCESS_TOKEN".to_string(),
            candidate_models: vec![
                "gemini-2.0-flash".to_string(),
                "gemini-2.0-flash-exp".to_string(),
                "gemini-2.0-pro-exp".to_string(),
                "gemini-1.5-pro".to_string(),
                "gemini-1.5-flash".to_string(),
            ],
        }
    }
}

impl GeminiSettings {
    /// Configured project, or `GOOGLE_CLOUD_PROJECT` from the environment.
    pub fn resolved_project(&self) -> Option<String> {
        if !self.project_id.is_empty() {
            return Some(self.project_id.clone());
        }
        std::env::var("GOOGLE_CLOUD_PROJECT")
            .ok()
            .filter(|p| !p.is_empty())
    }
}

/// OpenAI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// Chat model used for analysis.
    pub model: String,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
        }
    }
}

/// How video content is acquired.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IngestionMode {
    /// Hand the canonical URL to the model (default).
    #[default]
    Reference,
    /// Download the soundtrack and send it inline.
    Audio,
}

impl std::str::FromStr for IngestionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reference" | "url" => Ok(IngestionMode::Reference),
            "audio" => Ok(IngestionMode::Audio),
            _ => Err(format!("Unknown ingestion mode: {}", s)),
        }
    }
}

impl std::fmt::Display for IngestionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestionMode::Reference => write!(f, "reference"),
            IngestionMode::Audio => write!(f, "audio"),
        }
    }
}

/// Ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IngestionSettings {
    pub mode: IngestionMode,
}

/// Generated artifact settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Where the generated solution is written.
    pub artifact_path: String,
    /// Whether command steps are written into the artifact as comments.
    pub command_policy: CommandPolicy,
    /// Optional first line of the artifact.
    pub header: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            artifact_path: "generated_solution.py".to_string(),
            command_policy: CommandPolicy::Comment,
            header: None,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values no collaborator could work with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::ReplicatorError;

        if !(0.0..=2.0).contains(&self.analysis.temperature) {
            return Err(ReplicatorError::Config(format!(
                "analysis.temperature must be between 0.0 and 2.0, got {}",
                self.analysis.temperature
            )));
        }
        if self.output.artifact_path.trim().is_empty() {
            return Err(ReplicatorError::Config("output.artifact_path is empty".into()));
        }
        if self.gemini.location.trim().is_empty() {
            return Err(ReplicatorError::Config("gemini.location is empty".into()));
        }
        if !matches!(
            self.general.log_level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error" | "off"
        ) {
            return Err(ReplicatorError::Config(format!(
                "general.log_level must be one of trace, debug, info, warn, error, off; got {}",
                self.general.log_level
            )));
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ReplicatorError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("replicator")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded artifact path.
    pub fn artifact_path(&self) -> PathBuf {
        Self::expand_path(&self.output.artifact_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.analysis.provider, AnalysisProvider::Gemini);
        assert!(settings.analysis.grounding);
        assert_eq!(settings.gemini.location, "us-central1");
        assert_eq!(settings.ingestion.mode, IngestionMode::Reference);
        assert_eq!(settings.output.command_policy, CommandPolicy::Comment);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [gemini]
            project_id = "demo-project"

            [output]
            command_policy = "log_only"
            "#,
        )
        .unwrap();

        assert_eq!(settings.gemini.project_id, "demo-project");
        assert_eq!(settings.gemini.model, "gemini-2.0-flash");
        assert_eq!(settings.output.command_policy, CommandPolicy::LogOnly);
        assert_eq!(settings.output.artifact_path, "generated_solution.py");
        assert_eq!(settings.gemini.resolved_project().as_deref(), Some("demo-project"));
    }

    #[test]
    fn test_load_and_save_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.analysis.provider = AnalysisProvider::OpenAI;
        settings.output.header = Some("# Generated Solution".into());
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.analysis.provider, AnalysisProvider::OpenAI);
        assert_eq!(loaded.output.header.as_deref(), Some("# Generated Solution"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(settings.openai.model, "gpt-4o");
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut settings = Settings::default();
        settings.analysis.temperature = 3.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_log_level_is_validated() {
        let settings: Settings = toml::from_str("[general]\nlog_level = \"debug\"").unwrap();
        assert_eq!(settings.general.log_level, "debug");
        assert!(settings.validate().is_ok());

        let mut settings = Settings::default();
        assert_eq!(settings.general.log_level, "warn");
        settings.general.log_level = "loud".into();
        assert!(matches!(settings.validate(), Err(crate::error::ReplicatorError::Config(_))));
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("Vertex".parse::<AnalysisProvider>().unwrap(), AnalysisProvider::Gemini);
        assert_eq!("audio".parse::<IngestionMode>().unwrap(), IngestionMode::Audio);
        assert!("carrier-pigeon".parse::<IngestionMode>().is_err());
    }
}
