//! Execution plans recovered from model output.
//!
//! A plan is built once per run from a single model response and is not
//! modified afterwards. Raw text goes through [`normalize`] and then [`parse`].

mod normalize;
mod parser;

pub use normalize::normalize;
pub use parser::parse;

use serde::{Deserialize, Serialize};

/// One unit of an execution plan.
///
/// Serializes to the same shape the model is asked to produce:
/// `{"cmd": "..."}` or `{"code": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// A shell-style instruction. Never run, only reported.
    #[serde(rename = "cmd")]
    Command(String),
    /// Source text appended to the generated artifact.
    #[serde(rename = "code")]
    CodeFragment(String),
}

impl Step {
    /// Short label used in console and log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Command(_) => "cmd",
            Step::CodeFragment(_) => "code",
        }
    }

    /// The step payload.
    pub fn payload(&self) -> &str {
        match self {
            Step::Command(text) | Step::CodeFragment(text) => text,
        }
    }
}

/// Structured recipe recovered from a model response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// What the tutorial builds.
    pub goal: String,
    /// Tools mentioned by the tutorial, in the order given.
    #[serde(default)]
    pub required_tools: Vec<String>,
    /// Secrets the plan declares it needs. Not yet checked against the environment.
    #[serde(default)]
    pub missing_secrets: Vec<String>,
    /// Ordered steps. Order is significant.
    pub execution_steps: Vec<Step>,
}

impl ExecutionPlan {
    /// Canonical JSON form of the plan.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of command steps.
    pub fn command_count(&self) -> usize {
        self.execution_steps
            .iter()
            .filter(|s| matches!(s, Step::Command(_)))
            .count()
    }

    /// Number of code steps.
    pub fn code_count(&self) -> usize {
        self.execution_steps.len() - self.command_count()
    }
}
