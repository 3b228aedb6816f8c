//! Pre-flight checks before a run.
//!
//! Validates that required tools and credentials are available before
//! starting a run that would otherwise fail midway.

use crate::config::{AnalysisProvider, IngestionMode, Settings};
use crate::error::{ReplicatorError, Result};
use std::process::Command;

/// Run pre-flight checks for a replicate run with the given settings.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(settings: &Settings) -> Result<()> {
    match settings.analysis.provider {
        AnalysisProvider::Gemini => {
            if settings.gemini.resolved_project().is_none() {
                return Err(ReplicatorError::Config(
                    "No Google Cloud project. Set gemini.project_id in the config or export GOOGLE_CLOUD_PROJECT."
                        .to_string(),
                ));
            }
            if !env_is_set(&settings.gemini.access_token_env) {
                check_tool("gcloud")?;
            }
        }
        AnalysisProvider::OpenAI => check_api_key("OPENAI_API_KEY")?,
    }

    if settings.ingestion.mode == IngestionMode::Audio {
        check_tool("yt-dlp")?;
        check_tool("ffmpeg")?;
    }

    Ok(())
}

/// Whether an environment variable holds a non-blank value.
pub(crate) fn env_is_set(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| !v.trim().is_empty())
}

/// Check if an API key is configured.
fn check_api_key(name: &str) -> Result<()> {
    match std::env::var(name) {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(ReplicatorError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            name, name
        ))),
        Err(_) => Err(ReplicatorError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            name, name
        ))),
    }
}

/// Check if an external tool is available.
pub(crate) fn check_tool(name: &str) -> Result<()> {
    tool_version(name).map(|_| ())
}

/// First line of the tool's version output.
///
/// A missing binary is `ToolNotFound`; one that runs but fails is `ToolFailed`.
pub(crate) fn tool_version(name: &str) -> Result<String> {
    // ffmpeg uses -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("installed")
            .trim()
            .to_string()),
        Ok(_) => Err(ReplicatorError::ToolFailed(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ReplicatorError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(ReplicatorError::ToolFailed(format!("{}: {}", name, e))),
    }
}
