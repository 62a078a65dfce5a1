//! Segtran CLI - segmented translation of long Chinese academic text
//!
//! This is the main entry point for the Segtran CLI application, providing
//! commands for translating documents through the proxy, previewing their
//! segmentation and managing configuration.

mod cli;
mod config;
mod error;
mod handlers;
mod logging;
mod output;

use cli::{Cli, Commands};
use colored::control;
use config::Config;
use error::Result;
use logging::{timing::Timer, LoggingConfig};
use output::OutputWriter;
use std::process;
use tracing::instrument;
use tracing_appender::non_blocking::WorkerGuard;

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    control::set_override(cli.use_color());

    // Logging settings live in the config file, so it is loaded first
    let config = match Config::load_with_file(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    if !config.output.color {
        control::set_override(false);
    }

    let log_guard = match init_logging(&cli, &config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    if let Err(e) = run(cli, config).await {
        // process::exit skips destructors; flush the file writer first
        drop(log_guard);
        exit_with(&e);
    }
}

fn exit_with(error: &error::Error) -> ! {
    eprintln!(
        "{}",
        error::format_error(error, control::SHOULD_COLORIZE.should_colorize())
    );

    if error.should_show_help() {
        eprintln!("\nFor more information, try '--help'");
    }

    process::exit(error.exit_code());
}

/// Main application logic
#[instrument(skip_all, fields(command = ?cli.command))]
async fn run(cli: Cli, config: Config) -> Result<()> {
    let _timer = Timer::new("cli_execution");

    let mut output = OutputWriter::new(
        cli.output,
        control::SHOULD_COLORIZE.should_colorize(),
        cli.quiet,
        config.output.progress,
    );

    tracing::info!(
        command = ?cli.command,
        verbosity = cli.verbosity_level(),
        model = %config.default_model,
        base_url = %logging::redaction::redact_sensitive(&config.proxy.base_url),
        "Executing command"
    );

    match cli.command {
        Commands::Translate(args) => handlers::handle_translate(args, &config, &mut output).await,
        Commands::Segment(args) => handlers::handle_segment(args, &config, &mut output).await,
        Commands::Models => handlers::handle_models(&config, &mut output).await,
        Commands::Config(args) => handlers::handle_config(args, &config, &mut output).await,
        Commands::Completions(args) => handlers::handle_completions(args),
    }
}

/// Initialize the logging system
fn init_logging(cli: &Cli, config: &Config) -> Result<Option<WorkerGuard>> {
    let mut logging_config = LoggingConfig::from_verbosity(cli.verbosity_level());
    logging_config.merge_with_settings(&config.logging);
    logging_config.merge_with_env();

    // If quiet mode, only log errors
    if cli.quiet {
        logging_config.level = "error".to_string();
        logging_config.console = false;
    }

    logging::init_logging(logging_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["segtran", "models"]);
        assert_eq!(cli.verbosity_level(), 0);

        let cli = Cli::parse_from(["segtran", "-vv", "segment", "paper.txt"]);
        assert_eq!(cli.verbosity_level(), 2);

        let cli = Cli::parse_from(["segtran", "--quiet", "translate", "paper.txt"]);
        assert_eq!(cli.verbosity_level(), 0);
        assert!(cli.quiet);
    }
}
