//! Prompt templates for Replicator.
//!
//! Prompts can be customized by placing an `analysis.toml` file in the custom
//! prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub analysis: AnalysisPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the video analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisPrompts {
    /// Used when the model has to look the video up itself.
    pub reference: String,
    /// Used when the video's audio is attached to the request.
    pub media: String,
    /// Output contract appended to both.
    pub output_format: String,
}

impl Default for AnalysisPrompts {
    fn default() -> Self {
        Self {
            reference: r#"You are a Senior DevOps Engineer.
SEARCH for the video URL: {{video_url}}

Your task is to analyze the technical content associated with this video (transcript, description, discussions).

YOUR GOAL: Extract the exact steps to REPLICATE the result shown.

1. IDENTIFY THE GOAL: What is being built?
2. TECH STACK: List every tool, library, and API mentioned.
3. EXECUTION PLAN: Step-by-step shell commands or Python code logic."#
                .to_string(),

            media: r#"You are a Senior DevOps Engineer.
The attached audio is the soundtrack of the tutorial video at {{video_url}}.

Listen to the whole recording and extract the exact steps to REPLICATE the result shown.

1. IDENTIFY THE GOAL: What is being built?
2. TECH STACK: List every tool, library, and API mentioned.
3. EXECUTION PLAN: Step-by-step shell commands or Python code logic."#
                .to_string(),

            output_format: r#"OUTPUT JSON format only:
{
    "goal": "Build a...",
    "required_tools": ["python", "docker"],
    "missing_secrets": ["API_KEY"],
    "execution_steps": [
        {"step": 1, "cmd": "pip install x"},
        {"step": 2, "code": "import x..."}
    ]
}

Every step must have either a "cmd" or a "code" field."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let analysis_path = custom_path.join("analysis.toml");
            if analysis_path.exists() {
                let content = std::fs::read_to_string(&analysis_path)?;
                prompts.analysis = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// Build the analysis prompt for a video.
    pub fn analysis_prompt(&self, video_url: &str, with_media: bool) -> String {
        let mut vars = HashMap::new();
        vars.insert("video_url".to_string(), video_url.to_string());

        let body = if with_media {
            &self.analysis.media
        } else {
            &self.analysis.reference
        };

        format!(
            "{}\n\n{}",
            self.render_with_custom(body, &vars),
            self.render_with_custom(&self.analysis.output_format, &vars)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.analysis.reference.contains("{{video_url}}"));
        assert!(prompts.analysis.media.contains("{{video_url}}"));
        assert!(prompts.analysis.output_format.contains("execution_steps"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_analysis_prompt_fills_url() {
        let prompts = Prompts::default();
        let prompt = prompts.analysis_prompt("https://www.youtube.com/watch?v=abc", false);
        assert!(prompt.contains("SEARCH for the video URL: https://www.youtube.com/watch?v=abc"));
        assert!(prompt.contains("\"execution_steps\""));
        assert!(!prompt.contains("{{video_url}}"));

        let prompt = prompts.analysis_prompt("https://www.youtube.com/watch?v=abc", true);
        assert!(prompt.contains("attached audio"));
    }

    #[test]
    fn test_custom_variables_do_not_override_provided() {
        let mut prompts = Prompts::default();
        prompts.analysis.reference = "{{persona}} looks at {{video_url}}".into();
        prompts.analysis.output_format = String::new();
        prompts.variables.insert("persona".into(), "An SRE".into());
        prompts.variables.insert("video_url".into(), "ignored".into());

        let prompt = prompts.analysis_prompt("https://example.com/v", false);
        assert_eq!(prompt, "An SRE looks at https://example.com/v\n\n");
    }

    #[test]
    fn test_load_custom_analysis_prompts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("analysis.toml"),
            "reference = \"Find {{video_url}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.analysis.reference, "Find {{video_url}}");
        // Fields missing from the file keep their defaults
        assert!(prompts.analysis.output_format.contains("execution_steps"));
    }
}
