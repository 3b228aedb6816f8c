//! CLI module for Replicator.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Args, Parser, Subcommand};

/// Replicator - turn a tutorial video into a drafted reproduction
///
/// Analyzes the technical content of a video with a search-grounded language
/// model and writes the recovered steps to a generated solution file. Commands
/// from the video are listed, never run.
#[derive(Parser, Debug)]
#[command(name = "replicator")]
#[command(version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(flatten)]
    pub replicate: ReplicateArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Arguments for the default replicate action.
#[derive(Args, Debug, Default, Clone)]
pub struct ReplicateArgs {
    /// YouTube URL or video ID (prompted for when omitted)
    pub video: Option<String>,

    /// Where to write the generated solution
    #[arg(short, long)]
    pub output: Option<String>,

    /// Disable search grounding for the analysis call
    #[arg(long)]
    pub no_grounding: bool,

    /// Download the soundtrack and send it to the model instead of the URL
    #[arg(long)]
    pub audio: bool,

    /// How command steps are recorded in the artifact (comment, log-only)
    #[arg(long)]
    pub command_policy: Option<String>,

    /// Print the parsed plan as JSON
    #[arg(long)]
    pub show_plan: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Probe which candidate Gemini models are available
    Models,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_video() {
        let cli = Cli::try_parse_from(["replicator", "https://youtu.be/jNQXAC9IVRw", "--audio"]).unwrap();
        assert_eq!(cli.replicate.video.as_deref(), Some("https://youtu.be/jNQXAC9IVRw"));
        assert!(cli.replicate.audio);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_no_arguments_is_allowed() {
        let cli = Cli::try_parse_from(["replicator"]).unwrap();
        assert!(cli.replicate.video.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_subcommand() {
        let cli = Cli::try_parse_from(["replicator", "-v", "config", "path"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(
            cli.command,
            Some(Commands::Config { action: ConfigAction::Path })
        ));
    }
}
