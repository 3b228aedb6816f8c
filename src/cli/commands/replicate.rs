//! Replicate command implementation (the default action).

use crate::cli::preflight;
use crate::cli::{Output, ReplicateArgs};
use crate::config::{IngestionMode, Settings};
use crate::executor::{CommandPolicy, ExecutionObserver, ExecutorOptions, PlanExecutor};
use crate::orchestrator::{Orchestrator, RunReport, Stage};
use crate::video_source::VideoReference;
use anyhow::Result;
use std::io::{self, BufRead, Write};

/// Prints steps to the console as they are materialized.
struct ConsoleObserver;

impl ExecutionObserver for ConsoleObserver {
    fn on_command(&self, index: usize, command: &str) {
        Output::command(index, command);
    }

    fn on_code(&self, index: usize, code: &str) {
        Output::code(index, code);
    }
}

/// Run the replicate command.
pub async fn run_replicate(args: &ReplicateArgs, mut settings: Settings) -> Result<()> {
    let input = match &args.video {
        Some(video) => video.trim().to_string(),
        None => prompt_for_video()?,
    };

    if input.is_empty() {
        anyhow::bail!("No URL provided.");
    }

    let reference = VideoReference::parse(&input)?;
    Output::info(&format!("Analysis target: {}", reference.url));

    apply_overrides(args, &mut settings)?;

    if let Err(e) = preflight::check(&settings) {
        Output::info("Run 'replicator doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let executor = PlanExecutor::new(ExecutorOptions {
        command_policy: settings.output.command_policy,
        header: settings.output.header.clone(),
    })
    .with_observer(Box::new(ConsoleObserver));

    let spinner = Output::spinner("Starting...");
    let progress = spinner.clone();
    let orchestrator = Orchestrator::new(&settings)?;
    let model = orchestrator.generator().model().to_string();
    let orchestrator = orchestrator
        .with_executor(executor)
        .with_stage_listener(Box::new(move |stage| match stage {
            Stage::Acquiring => progress.set_message("Acquiring video content..."),
            Stage::Analyzing => progress.set_message(format!("Analyzing with {}...", model)),
            Stage::Parsing => progress.set_message("Parsing execution plan..."),
            Stage::Auditing => progress.set_message("Checking required secrets..."),
            Stage::Executing => progress.finish_and_clear(),
            s if s.is_terminal() => progress.finish_and_clear(),
            _ => {}
        }));

    let result = orchestrator.run(&reference).await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            print_summary(&report, args.show_plan, &orchestrator)?;
            Ok(())
        }
        Err(failure) => {
            if let Some(raw) = failure.raw_response() {
                Output::warning("Raw model response:");
                Output::raw_block(raw);
            }
            Err(failure.into())
        }
    }
}

/// Apply command-line flags on top of the loaded configuration.
fn apply_overrides(args: &ReplicateArgs, settings: &mut Settings) -> Result<()> {
    if args.no_grounding {
        settings.analysis.grounding = false;
    }
    if args.audio {
        settings.ingestion.mode = IngestionMode::Audio;
    }
    if let Some(output) = &args.output {
        settings.output.artifact_path = output.clone();
    }
    if let Some(policy) = &args.command_policy {
        settings.output.command_policy = policy
            .parse::<CommandPolicy>()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    settings.validate()?;
    Ok(())
}

/// Ask for a URL on stdin. Avoids shell quoting trouble with pasted links.
fn prompt_for_video() -> Result<String> {
    Output::info("Enter YouTube URL:");
    print!("> ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn print_summary(report: &RunReport, show_plan: bool, orchestrator: &Orchestrator) -> Result<()> {
    Output::header("Verification");
    Output::kv("Target goal", &report.plan.goal);
    let tools = if report.plan.required_tools.is_empty() {
        "none detected".to_string()
    } else {
        report.plan.required_tools.join(", ")
    };
    Output::kv("Detected tools", &tools);
    Output::kv(
        "Steps",
        &format!(
            "{} ({} commands, {} code)",
            report.plan.execution_steps.len(),
            report.plan.command_count(),
            report.plan.code_count()
        ),
    );

    let missing = report.audit.missing();
    if !missing.is_empty() {
        Output::warning(&format!("Missing keys: {}", missing.join(", ")));
        Output::info("Ensure these are exported in your environment before running the solution.");
    }

    if show_plan {
        Output::header("Plan");
        println!("{}", report.plan.to_json()?);
    }

    println!();
    Output::success(&format!(
        "Done. File created: '{}'",
        orchestrator.artifact_path().display()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides() {
        let args = ReplicateArgs {
            video: Some("dQw4w9WgXcQ".into()),
            output: Some("out/solution.py".into()),
            no_grounding: true,
            audio: true,
            command_policy: Some("log-only".into()),
            show_plan: false,
        };
        let mut settings = Settings::default();
        apply_overrides(&args, &mut settings).unwrap();

        assert!(!settings.analysis.grounding);
        assert_eq!(settings.ingestion.mode, IngestionMode::Audio);
        assert_eq!(settings.output.artifact_path, "out/solution.py");
        assert_eq!(settings.output.command_policy, CommandPolicy::LogOnly);
    }

    #[tokio::test]
    async fn test_blank_reference_is_returned_not_printed() {
        let args = ReplicateArgs {
            video: Some("   ".into()),
            ..Default::default()
        };
        let err = run_replicate(&args, Settings::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "No URL provided.");
    }

    #[tokio::test]
    async fn test_invalid_reference_keeps_its_error_kind() {
        let args = ReplicateArgs {
            video: Some("not a link".into()),
            ..Default::default()
        };
        let err = run_replicate(&args, Settings::default()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::error::ReplicatorError>(),
            Some(crate::error::ReplicatorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_apply_overrides_rejects_unknown_policy() {
        let args = ReplicateArgs {
            command_policy: Some("execute".into()),
            ..Default::default()
        };
        assert!(apply_overrides(&args, &mut Settings::default()).is_err());
    }
}
