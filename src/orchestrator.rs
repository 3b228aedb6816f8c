//! Pipeline orchestrator for Replicator.
//!
//! Coordinates a run from content acquisition to the generated artifact:
//!
//! ```text
//! Idle -> Acquiring -> Analyzing -> Parsing -> Auditing -> Executing -> Done
//!             \___________\___________\__________\___________\--> Failed
//! ```
//!
//! Every stage finishes before the next begins. The first failure ends the run;
//! nothing is retried.

use crate::audit::{AuditResult, RequirementAuditor};
use crate::config::{Prompts, Settings};
use crate::error::{ReplicatorError, Result};
use crate::executor::{ArtifactSink, ExecutorOptions, FileSink, GeneratedArtifact, PlanExecutor};
use crate::generation::{create_generator, GenerationRequest, Generator, MediaPayload};
use crate::ingest::{create_ingestor, AcquiredContent, Ingestor};
use crate::plan::{self, ExecutionPlan};
use crate::video_source::VideoReference;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Acquiring,
    Analyzing,
    Parsing,
    Auditing,
    Executing,
    Done,
    Failed,
}

impl Stage {
    /// The state reached when this one completes successfully.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::Acquiring),
            Stage::Acquiring => Some(Stage::Analyzing),
            Stage::Analyzing => Some(Stage::Parsing),
            Stage::Parsing => Some(Stage::Auditing),
            Stage::Auditing => Some(Stage::Executing),
            Stage::Executing => Some(Stage::Done),
            Stage::Done | Stage::Failed => None,
        }
    }

    /// Whether a failure can happen while in this state.
    pub fn can_fail(self) -> bool {
        matches!(
            self,
            Stage::Acquiring | Stage::Analyzing | Stage::Parsing | Stage::Auditing | Stage::Executing
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Acquiring => "acquiring",
            Stage::Analyzing => "analyzing",
            Stage::Parsing => "parsing",
            Stage::Auditing => "auditing",
            Stage::Executing => "executing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// A run that ended in `Failed`.
#[derive(Error, Debug)]
#[error("Pipeline failed while {stage}: {error}")]
pub struct PipelineFailure {
    /// The stage that was active when the error occurred.
    pub stage: Stage,
    #[source]
    pub error: ReplicatorError,
}

impl PipelineFailure {
    /// Model text behind a malformed plan, kept for diagnosis.
    pub fn raw_response(&self) -> Option<&str> {
        self.error.raw_response()
    }
}

/// Records the path through the state machine.
#[derive(Debug)]
struct StageTracker {
    current: Stage,
    history: Vec<Stage>,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            current: Stage::Idle,
            history: vec![Stage::Idle],
        }
    }

    /// Move to the successor of the current stage.
    fn advance(&mut self) -> Stage {
        match self.current.next() {
            Some(next) => {
                debug!("{} -> {}", self.current, next);
                self.current = next;
                self.history.push(next);
            }
            None => warn!("No transition out of {}", self.current),
        }
        self.current
    }

    /// Enter `Failed`, keeping the stage that failed.
    fn fail(&mut self, error: ReplicatorError) -> PipelineFailure {
        let stage = self.current;
        debug_assert!(stage.can_fail(), "cannot fail from {}", stage);
        warn!("{} -> failed: {}", stage, error);
        self.current = Stage::Failed;
        self.history.push(Stage::Failed);
        PipelineFailure { stage, error }
    }
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub reference: VideoReference,
    /// States visited, from `Idle` to `Done`.
    pub stages: Vec<Stage>,
    /// Unprocessed model output.
    pub raw_response: String,
    pub plan: ExecutionPlan,
    /// Advisory only.
    pub audit: AuditResult,
    pub artifact: GeneratedArtifact,
}

/// Callback invoked on every state change.
pub type StageListener = Box<dyn Fn(Stage) + Send + Sync>;

/// The main orchestrator for the Replicator pipeline.
pub struct Orchestrator {
    ingestor: Box<dyn Ingestor>,
    generator: Box<dyn Generator>,
    auditor: RequirementAuditor,
    executor: PlanExecutor,
    prompts: Prompts,
    grounding: bool,
    artifact_path: PathBuf,
    listener: Option<StageListener>,
}

impl Orchestrator {
    /// Create an orchestrator from settings.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let executor = PlanExecutor::new(ExecutorOptions {
            command_policy: settings.output.command_policy,
            header: settings.output.header.clone(),
        });

        Ok(Self::with_components(
            create_ingestor(settings),
            create_generator(settings)?,
            RequirementAuditor::new(),
            executor,
            prompts,
        )
        .with_grounding(settings.analysis.grounding)
        .with_artifact_path(settings.artifact_path()))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        ingestor: Box<dyn Ingestor>,
        generator: Box<dyn Generator>,
        auditor: RequirementAuditor,
        executor: PlanExecutor,
        prompts: Prompts,
    ) -> Self {
        Self {
            ingestor,
            generator,
            auditor,
            executor,
            prompts,
            grounding: true,
            artifact_path: PathBuf::from("generated_solution.py"),
            listener: None,
        }
    }

    pub fn with_grounding(mut self, grounding: bool) -> Self {
        self.grounding = grounding;
        self
    }

    pub fn with_artifact_path(mut self, path: PathBuf) -> Self {
        self.artifact_path = path;
        self
    }

    /// Replace the executor, e.g. to attach a console observer.
    pub fn with_executor(mut self, executor: PlanExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_stage_listener(mut self, listener: StageListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    /// Run the pipeline, writing the artifact to the configured path.
    pub async fn run(&self, reference: &VideoReference) -> std::result::Result<RunReport, PipelineFailure> {
        let mut sink = FileSink::new(&self.artifact_path);
        self.run_with_sink(reference, &mut sink).await
    }

    /// Run the pipeline, streaming the artifact into `sink`.
    ///
    /// The sink is only touched once execution starts, so an earlier failure
    /// leaves no artifact behind.
    #[instrument(skip(self, sink), fields(url = %reference.url))]
    pub async fn run_with_sink(
        &self,
        reference: &VideoReference,
        sink: &mut dyn ArtifactSink,
    ) -> std::result::Result<RunReport, PipelineFailure> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut tracker = StageTracker::new();

        // Acquiring
        self.enter(&mut tracker);
        let content = self
            .ingestor
            .acquire(reference)
            .await
            .map_err(|e| self.failed(&mut tracker, e))?;
        info!("Acquired {}", content.describe());

        // Analyzing
        self.enter(&mut tracker);
        let request = self.build_request(reference, content);
        let raw_response = self
            .generator
            .generate(&request)
            .await
            .and_then(|text| {
                if text.trim().is_empty() {
                    Err(ReplicatorError::Analysis("Model returned no content".into()))
                } else {
                    Ok(text)
                }
            })
            .map_err(|e| self.failed(&mut tracker, e))?;
        debug!("Model returned {} chars", raw_response.len());

        // Parsing
        self.enter(&mut tracker);
        let plan = plan::parse(&plan::normalize(&raw_response))
            .map_err(|e| match e {
                ReplicatorError::MalformedPlan { reason, .. } => {
                    ReplicatorError::malformed(reason, &raw_response)
                }
                other => other,
            })
            .map_err(|e| self.failed(&mut tracker, e))?;
        info!("Plan: {} ({} steps)", plan.goal, plan.execution_steps.len());

        // Auditing never blocks
        self.enter(&mut tracker);
        let audit = self.auditor.audit(&plan.missing_secrets);
        if !audit.all_present() {
            warn!("Missing secrets: {}", audit.missing().join(", "));
        }

        // Executing
        self.enter(&mut tracker);
        let artifact = self
            .executor
            .execute(&plan, sink)
            .map_err(|e| self.failed(&mut tracker, e))?;

        self.enter(&mut tracker);
        info!(%run_id, "Run complete");

        Ok(RunReport {
            run_id,
            started_at,
            reference: reference.clone(),
            stages: tracker.history,
            raw_response,
            plan,
            audit,
            artifact,
        })
    }

    fn build_request(&self, reference: &VideoReference, content: AcquiredContent) -> GenerationRequest {
        match content {
            AcquiredContent::Reference(url) => {
                GenerationRequest::new(self.prompts.analysis_prompt(&url, false))
                    .with_grounding(self.grounding)
            }
            AcquiredContent::Media { data, mime_type } => {
                GenerationRequest::new(self.prompts.analysis_prompt(&reference.url, true))
                    .with_media(MediaPayload { data, mime_type })
                    .with_grounding(self.grounding)
            }
        }
    }

    fn enter(&self, tracker: &mut StageTracker) {
        let stage = tracker.advance();
        if let Some(listener) = &self.listener {
            listener(stage);
        }
    }

    fn failed(&self, tracker: &mut StageTracker, error: ReplicatorError) -> PipelineFailure {
        let failure = tracker.fail(error);
        if let Some(listener) = &self.listener {
            listener(Stage::Failed);
        }
        failure
    }
}
