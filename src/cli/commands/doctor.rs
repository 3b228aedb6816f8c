//! Doctor command - verify system requirements and configuration.

use crate::cli::preflight::{env_is_set, tool_version};
use crate::cli::Output;
use crate::config::{AnalysisProvider, IngestionMode, Settings};
use crate::error::ReplicatorError;
use console::style;
use std::path::Path;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    /// Downgrade an error to a warning for optional requirements.
    fn optional(mut self, required: bool) -> Self {
        if !required && self.status == CheckStatus::Error {
            self.status = CheckStatus::Warning;
        }
        self
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Replicator Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    let audio_mode = settings.ingestion.mode == IngestionMode::Audio;
    let uses_gemini = settings.analysis.provider == AnalysisProvider::Gemini;

    println!("{}", style("External Tools").bold());
    let tool_checks = vec![
        check_tool("yt-dlp", install_hint_ytdlp()).optional(audio_mode),
        check_tool("ffmpeg", install_hint_ffmpeg()).optional(audio_mode),
        check_tool("gcloud", install_hint_gcloud()).optional(
            uses_gemini && !env_is_set(&settings.gemini.access_token_env),
        ),
    ];
    print_all(&tool_checks);
    checks.extend(tool_checks);

    println!();

    println!("{}", style("Model Access").bold());
    let access_checks = match settings.analysis.provider {
        AnalysisProvider::Gemini => check_gemini(settings),
        AnalysisProvider::OpenAI => vec![check_openai_api_key()],
    };
    print_all(&access_checks);
    checks.extend(access_checks);

    println!();

    println!("{}", style("Directories").bold());
    let dir_checks = check_directories(settings);
    print_all(&dir_checks);
    checks.extend(dir_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path);
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Replicator.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Replicator is ready to use.");
    }

    Ok(())
}

fn print_all(checks: &[CheckResult]) {
    for check in checks {
        check.print();
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str, hint: &str) -> CheckResult {
    match tool_version(name) {
        Ok(version) => CheckResult::ok(name, &truncate(&version, 50)),
        Err(ReplicatorError::ToolNotFound(_)) => CheckResult::error(name, "not found", hint),
        Err(_) => CheckResult::error(name, "installed but not working", hint),
    }
}

/// Check the Vertex AI project and credentials.
fn check_gemini(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    match settings.gemini.resolved_project() {
        Some(project) => results.push(CheckResult::ok(
            "Project",
            &format!("{} ({})", project, settings.gemini.location),
        )),
        None => results.push(CheckResult::error(
            "Project",
            "not configured",
            "Set gemini.project_id in the config or export GOOGLE_CLOUD_PROJECT",
        )),
    }

    let token_env = &settings.gemini.access_token_env;
    if env_is_set(token_env) {
        results.push(CheckResult::ok(
            "Access token",
            &format!("from {}", token_env),
        ));
    } else {
        results.push(CheckResult::warning(
            "Access token",
            &format!("{} not set, will ask gcloud", token_env),
            "Run: gcloud auth login (or export an access token)",
        ));
    }

    results.push(CheckResult::ok(
        "Model",
        &format!(
            "{} (grounding {})",
            settings.gemini.model,
            if settings.analysis.grounding { "on" } else { "off" }
        ),
    ));

    results
}

/// Check if OpenAI API key is configured.
fn check_openai_api_key() -> CheckResult {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", mask_key(&key)))
        }
        Ok(key) if key.is_empty() => CheckResult::error(
            "OPENAI_API_KEY",
            "empty",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
        Ok(_) => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        Err(_) => CheckResult::error(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...'",
        ),
    }
}

/// Check the temp directory and artifact destination.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let temp_dir = settings.temp_dir();
    if temp_dir.exists() {
        results.push(CheckResult::ok(
            "Temp directory",
            &format!("{}", temp_dir.display()),
        ));
    } else {
        results.push(CheckResult::warning(
            "Temp directory",
            &format!("{} (will be created)", temp_dir.display()),
            "Directory will be created on first use",
        ));
    }

    let artifact = settings.artifact_path();
    if artifact.exists() {
        let size = std::fs::metadata(&artifact)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        results.push(CheckResult::warning(
            "Artifact",
            &format!("{} ({})", artifact.display(), size),
            "Existing file will be overwritten by the next run",
        ));
    } else {
        results.push(CheckResult::ok(
            "Artifact",
            &format!("{} (not created yet)", artifact.display()),
        ));
    }

    results
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: replicator config edit",
        )
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 11 {
        return "***".to_string();
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

fn install_hint_gcloud() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install --cask google-cloud-sdk"
    } else {
        "Install from: https://cloud.google.com/sdk/docs/install"
    }
}
