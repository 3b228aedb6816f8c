//! Configuration module for Replicator.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnalysisPrompts, Prompts};
pub use settings::{
    AnalysisProvider, AnalysisSettings, GeminiSettings, GeneralSettings, IngestionMode,
    IngestionSettings, OpenAISettings, OutputSettings, PromptSettings, Settings,
};
