//! Replicator - Tutorial Video to Drafted Solution
//!
//! A CLI tool that watches a technical tutorial for you: it asks a
//! search-grounded language model what the video builds, and writes the
//! recovered commands and code into a single solution file.
//!
//! # Overview
//!
//! A run goes through a fixed pipeline:
//! - Acquire the video (as a URL reference, or as downloaded audio)
//! - Analyze it with Gemini (or OpenAI) into a JSON execution plan
//! - Parse the plan, tolerating markdown fences and surrounding prose
//! - Audit which secrets the solution needs are missing from the environment
//! - Materialize the steps into the artifact. Commands are recorded, never run.
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `video_source` - Video reference parsing and URL sanitization
//! - `audio` - Audio download for the audio ingestion mode
//! - `ingest` - Content acquisition strategies
//! - `generation` - Language model providers
//! - `plan` - Execution plan model, response normalization and parsing
//! - `audit` - Secret presence checks
//! - `executor` - Step materialization into artifacts
//! - `orchestrator` - Pipeline state machine
//!
//! # Example
//!
//! ```rust,no_run
//! use replicator::config::Settings;
//! use replicator::orchestrator::Orchestrator;
//! use replicator::video_source::VideoReference;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings)?;
//!
//!     let reference = VideoReference::parse("https://youtu.be/dQw4w9WgXcQ")?;
//!     let report = orchestrator.run(&reference).await?;
//!     println!("{}: {} steps", report.plan.goal, report.plan.execution_steps.len());
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod generation;
pub mod ingest;
pub mod openai;
pub mod orchestrator;
pub mod plan;
pub mod video_source;

pub use error::{ReplicatorError, Result};
