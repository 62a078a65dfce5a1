//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API,
//! providing a type-safe and well-documented command interface.

use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::path::PathBuf;

/// Segtran CLI - segmented translation of long Chinese academic text
///
/// Splits a document into bounded segments, translates them concurrently
/// through a translation proxy and reassembles the English text in source order.
#[derive(Parser, Debug)]
#[command(
    name = "segtran",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "SEGTRAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate a document through the proxy
    Translate(TranslateArgs),

    /// Show how a document would be segmented, without translating
    Segment(SegmentArgs),

    /// List supported models and their throughput profiles
    Models,

    /// Manage configuration files and settings
    Config(ConfigArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Arguments for the translate command
#[derive(Parser, Debug)]
pub struct TranslateArgs {
    /// Document to translate (.txt or .md); `-` reads standard input
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Model to translate with (deepseek, gpt-4o, claude)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Credential forwarded to the proxy; never written to disk
    #[arg(long, env = "SEGTRAN_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Proxy base URL override
    #[arg(long)]
    pub base_url: Option<String>,

    /// Stream deltas, one segment at a time
    #[arg(long)]
    pub stream: bool,

    /// Maximum segment size in characters
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub segment_size: Option<u64>,

    /// Maximum concurrent requests
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub concurrency: Option<u64>,

    /// Retries per segment after the first attempt
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Delay before retrying a transient failure, in milliseconds
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Custom system prompt replacing the default
    #[arg(long)]
    pub prompt: Option<String>,

    /// Write the translation to a file instead of stdout
    #[arg(long = "save-to", value_name = "OUTPUT_FILE")]
    pub save_to: Option<PathBuf>,

    /// Print the recovered source range of every segment
    #[arg(long)]
    pub show_offsets: bool,

    /// Print every segment result individually
    #[arg(long)]
    pub show_segments: bool,

    /// Extra passes over failed segments after the first run
    #[arg(long, default_value_t = 0)]
    pub retry_rounds: u32,
}

/// Arguments for the segment command
#[derive(Parser, Debug)]
pub struct SegmentArgs {
    /// Document to segment; `-` reads standard input
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Model whose default segment size applies
    #[arg(short, long)]
    pub model: Option<String>,

    /// Maximum segment size in characters
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub segment_size: Option<u64>,

    /// Print each segment's text, not just its statistics
    #[arg(long)]
    pub show_text: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Initialize a default configuration file
    Init(ConfigInitArgs),

    /// Show current configuration values
    Show(ConfigShowArgs),
}

/// Arguments for config init
#[derive(Parser, Debug)]
pub struct ConfigInitArgs {
    /// Initialize user config (~/.config/segtran/config.toml) instead of .segtran.toml
    #[arg(long)]
    pub user: bool,

    /// Force overwrite existing config files
    #[arg(long)]
    pub force: bool,
}

/// Arguments for config show
#[derive(Parser, Debug)]
pub struct ConfigShowArgs {
    /// Show configuration in specified format
    #[arg(short, long, value_enum, default_value = "toml")]
    pub format: ConfigFormat,
}

/// Configuration file formats
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    /// TOML format
    Toml,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Arguments for generating shell completions
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Pretty-printed JSON output
    JsonPretty,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stdout().is_terminal()
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_translate_flags() {
        let cli = Cli::parse_from([
            "segtran",
            "-vv",
            "translate",
            "paper.txt",
            "--model",
            "claude",
            "--stream",
            "--segment-size",
            "2500",
            "--max-retries",
            "5",
            "--save-to",
            "out.txt",
        ]);
        assert_eq!(cli.verbosity_level(), 2);
        match cli.command {
            Commands::Translate(args) => {
                assert_eq!(args.input, PathBuf::from("paper.txt"));
                assert_eq!(args.model.as_deref(), Some("claude"));
                assert!(args.stream);
                assert_eq!(args.segment_size, Some(2500));
                assert_eq!(args.max_retries, Some(5));
                assert_eq!(args.save_to, Some(PathBuf::from("out.txt")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_zero_segment_size_is_rejected() {
        let result = Cli::try_parse_from(["segtran", "segment", "a.txt", "--segment-size", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_overrides_verbosity() {
        let cli = Cli::parse_from(["segtran", "--quiet", "models"]);
        assert_eq!(cli.verbosity_level(), 0);
        assert!(matches!(cli.command, Commands::Models));
    }
}
