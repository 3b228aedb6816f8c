//! Models command - probe which candidate Gemini models respond.

use crate::cli::Output;
use crate::config::Settings;
use crate::generation::{GeminiConfig, GeminiGenerator, GenerationRequest, Generator};
use anyhow::Result;
use console::style;

/// Try each candidate model with a tiny prompt and report which ones answer.
pub async fn run_models(settings: &Settings) -> Result<()> {
    if settings.gemini.candidate_models.is_empty() {
        Output::warning("No candidate models configured (gemini.candidate_models).");
        return Ok(());
    }

    let base = GeminiGenerator::new(GeminiConfig::from_settings(settings)?)?;

    Output::header(&format!(
        "Probing models in {} ({})",
        base.config().project_id,
        base.config().location
    ));

    let mut available = 0;
    for model in &settings.gemini.candidate_models {
        let generator = base.with_model(model);
        let request = GenerationRequest::new("test").with_grounding(false);
        match generator.generate(&request).await {
            Ok(_) => {
                available += 1;
                println!("  {} {}", style("✓").green(), style(model).bold());
            }
            Err(e) => {
                println!(
                    "  {} {} - {}",
                    style("✗").red(),
                    style(model).bold(),
                    style(first_line(&e.to_string())).dim()
                );
            }
        }
    }

    println!();
    if available == 0 {
        Output::error("No candidate model is available with the current credentials.");
    } else {
        Output::success(&format!(
            "{} of {} model(s) available.",
            available,
            settings.gemini.candidate_models.len()
        ));
    }

    Ok(())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("404 Not Found\n{...}"), "404 Not Found");
        assert_eq!(first_line(""), "");
    }
}
