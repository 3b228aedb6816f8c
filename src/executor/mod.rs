//! Plan materialization.
//!
//! The executor walks a parsed plan in order and drafts a reproduction of it.
//! Commands are reported, code fragments are appended to the artifact. Nothing
//! is ever run on the host.

mod sink;

pub use sink::{ArtifactSink, FileSink, MemorySink};

use crate::error::Result;
use crate::plan::{ExecutionPlan, Step};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// How command steps are recorded in the artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandPolicy {
    /// Write `# CMD: <command>` into the artifact.
    #[default]
    Comment,
    /// Only report the command to the observer.
    LogOnly,
}

impl std::str::FromStr for CommandPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "comment" => Ok(CommandPolicy::Comment),
            "log_only" | "log" => Ok(CommandPolicy::LogOnly),
            _ => Err(format!("Unknown command policy: {}", s)),
        }
    }
}

impl std::fmt::Display for CommandPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandPolicy::Comment => write!(f, "comment"),
            CommandPolicy::LogOnly => write!(f, "log_only"),
        }
    }
}

/// Receives each step as it is materialized.
pub trait ExecutionObserver: Send + Sync {
    fn on_command(&self, index: usize, command: &str);

    fn on_code(&self, index: usize, code: &str);
}

/// Observer that reports steps through `tracing`.
#[derive(Debug, Default)]
pub struct LogObserver;

impl ExecutionObserver for LogObserver {
    fn on_command(&self, index: usize, command: &str) {
        info!("[CMD {}] {}", index + 1, command);
    }

    fn on_code(&self, index: usize, code: &str) {
        info!("[CODE {}] appending {} bytes", index + 1, code.len());
    }
}

/// Ordered, append-only artifact content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedArtifact {
    entries: Vec<String>,
}

impl GeneratedArtifact {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, entry: String) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The artifact as a single text: every entry followed by a newline.
    pub fn content(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(entry);
            out.push('\n');
        }
        out
    }
}

/// Options controlling how a plan is materialized.
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    pub command_policy: CommandPolicy,
    /// First line of the artifact, if any.
    pub header: Option<String>,
}

/// Walks execution steps in order and builds the artifact.
pub struct PlanExecutor {
    options: ExecutorOptions,
    observer: Box<dyn ExecutionObserver>,
}

impl PlanExecutor {
    pub fn new(options: ExecutorOptions) -> Self {
        Self {
            options,
            observer: Box::new(LogObserver),
        }
    }

    /// Set the observer that receives each step.
    pub fn with_observer(mut self, observer: Box<dyn ExecutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Materialize a plan, streaming every entry to `sink`.
    ///
    /// The sink is reset first, so anything from a previous run is discarded.
    #[instrument(skip_all, fields(steps = plan.execution_steps.len()))]
    pub fn execute(
        &self,
        plan: &ExecutionPlan,
        sink: &mut dyn ArtifactSink,
    ) -> Result<GeneratedArtifact> {
        let mut artifact = GeneratedArtifact::new();
        sink.reset()?;

        if let Some(header) = self.options.header.as_ref().filter(|h| !h.is_empty()) {
            record(&mut artifact, sink, header.clone())?;
        }

        for (index, step) in plan.execution_steps.iter().enumerate() {
            match step {
                Step::Command(command) => {
                    self.observer.on_command(index, command);
                    if self.options.command_policy == CommandPolicy::Comment {
                        record(&mut artifact, sink, format!("# CMD: {}", command))?;
                    }
                }
                Step::CodeFragment(code) => {
                    self.observer.on_code(index, code);
                    record(&mut artifact, sink, code.clone())?;
                }
            }
        }

        sink.finish()?;
        debug!("Artifact has {} entries", artifact.entries.len());
        Ok(artifact)
    }

    /// Materialize a plan without writing anywhere.
    pub fn execute_in_memory(&self, plan: &ExecutionPlan) -> Result<GeneratedArtifact> {
        self.execute(plan, &mut MemorySink::default())
    }
}

/// Write an entry to the sink and keep it in the artifact.
fn record(artifact: &mut GeneratedArtifact, sink: &mut dyn ArtifactSink, entry: String) -> Result<()> {
    sink.append(&entry)?;
    artifact.push(entry);
    Ok(())
}

impl Default for PlanExecutor {
    fn default() -> Self {
        Self::new(ExecutorOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn plan(steps: Vec<Step>) -> ExecutionPlan {
        ExecutionPlan {
            goal: "test".into(),
            required_tools: vec![],
            missing_secrets: vec![],
            execution_steps: steps,
        }
    }

    #[derive(Default, Clone)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl ExecutionObserver for Recorder {
        fn on_command(&self, index: usize, command: &str) {
            self.0.lock().unwrap().push(format!("{}:cmd:{}", index, command));
        }

        fn on_code(&self, index: usize, code: &str) {
            self.0.lock().unwrap().push(format!("{}:code:{}", index, code));
        }
    }

    #[test]
    fn test_code_only_plan_concatenates_fragments() {
        let executor = PlanExecutor::default();
        let artifact = executor
            .execute_in_memory(&plan(vec![
                Step::CodeFragment("import os".into()),
                Step::CodeFragment("print(os.getcwd())".into()),
            ]))
            .unwrap();

        assert_eq!(artifact.content(), "import os\nprint(os.getcwd())\n");
    }

    #[test]
    fn test_commands_recorded_as_comments() {
        let executor = PlanExecutor::new(ExecutorOptions {
            command_policy: CommandPolicy::Comment,
            header: None,
        });
        let artifact = executor
            .execute_in_memory(&plan(vec![
                Step::Command("pip install requests".into()),
                Step::CodeFragment("import requests".into()),
            ]))
            .unwrap();

        assert_eq!(artifact.content(), "# CMD: pip install requests\nimport requests\n");
    }

    #[test]
    fn test_log_only_policy_skips_commands() {
        let executor = PlanExecutor::new(ExecutorOptions {
            command_policy: CommandPolicy::LogOnly,
            header: None,
        });
        let artifact = executor
            .execute_in_memory(&plan(vec![
                Step::Command("docker compose up".into()),
                Step::CodeFragment("x = 1".into()),
            ]))
            .unwrap();

        assert_eq!(artifact.content(), "x = 1\n");
    }

    #[test]
    fn test_empty_plan_yields_header_only() {
        let executor = PlanExecutor::new(ExecutorOptions {
            command_policy: CommandPolicy::Comment,
            header: Some("# Generated Solution".into()),
        });
        let artifact = executor.execute_in_memory(&plan(vec![])).unwrap();
        assert_eq!(artifact.content(), "# Generated Solution\n");

        let artifact = PlanExecutor::default().execute_in_memory(&plan(vec![])).unwrap();
        assert!(artifact.is_empty());
        assert_eq!(artifact.content(), "");
    }

    #[test]
    fn test_observer_sees_steps_in_order() {
        let recorder = Recorder::default();
        let executor = PlanExecutor::default().with_observer(Box::new(recorder.clone()));
        executor
            .execute_in_memory(&plan(vec![
                Step::Command("a".into()),
                Step::CodeFragment("b".into()),
                Step::Command("c".into()),
            ]))
            .unwrap();

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["0:cmd:a", "1:code:b", "2:cmd:c"]
        );
    }

    #[test]
    fn test_sink_matches_returned_artifact() {
        let mut sink = MemorySink::default();
        sink.append("left over from a previous run").unwrap();

        let artifact = PlanExecutor::default()
            .execute(
                &plan(vec![Step::Command("ls".into()), Step::CodeFragment("pass".into())]),
                &mut sink,
            )
            .unwrap();

        assert_eq!(sink.entries, artifact.entries());
    }

    #[test]
    fn test_command_policy_parsing() {
        assert_eq!("comment".parse::<CommandPolicy>().unwrap(), CommandPolicy::Comment);
        assert_eq!("log-only".parse::<CommandPolicy>().unwrap(), CommandPolicy::LogOnly);
        assert!("shout".parse::<CommandPolicy>().is_err());
        assert_eq!(CommandPolicy::LogOnly.to_string(), "log_only");
    }
}
