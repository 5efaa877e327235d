use std::path::Path;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use anki_study_mcp::config::Config;

mod cli;

use cli::commands;

/// The main CLI command line interface.
#[derive(Parser)]
#[command(name = "anki-study")]
#[command(version)]
#[command(about = "Study your Anki decks with an AI assistant over MCP")]
#[command(long_about = "Exposes an Anki collection to AI assistants through the Model Context\n\
    Protocol. Besides deck, note, and card tools it offers adaptive study\n\
    sessions that ask each card in several ways and record the result in Anki.\n\n\
    Requires Anki running with the AnkiConnect add-on.")]
#[command(after_help = "EXAMPLES:\n    \
    anki-study check         Verify that AnkiConnect is reachable\n    \
    anki-study serve         Run the MCP server on stdio\n    \
    anki-study config        Show the resolved configuration\n\n\
    For more information about a command, run 'anki-study <command> --help'.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdio
    #[command(long_about = "Starts the MCP (Model Context Protocol) server on stdio.\n\
        The server reads JSON-RPC requests from stdin and writes responses\n\
        to stdout. Logs go to stderr, or to the configured log file.")]
    Serve(commands::serve::Args),

    /// Check the connection to AnkiConnect
    Check,

    /// Show the resolved configuration
    #[command(long_about = "Shows the configuration after applying ~/.anki-study/config.yaml\n\
        and environment variable overrides.")]
    Config,

    /// Generate shell completion scripts
    Completions(commands::completions::Args),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions(args) = &cli.command {
        commands::completions::generate_completions(&mut Cli::command(), args.shell);
        return Ok(());
    }

    let config = Config::load()?;
    let _guard = init_logging(cli.verbose, config.log_file.as_deref());

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args, config),
        Commands::Check => commands::check::run(&config),
        Commands::Config => commands::config::run(&config),
        Commands::Completions(_) => Ok(()),
    }
}

/// Initializes logging to stderr, or to `log_file` when one is configured.
///
/// Stdout is reserved for the MCP protocol. The returned guard must be
/// kept alive to flush file logs.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let filter = if verbose {
        "anki_study=debug,anki_study_mcp=debug"
    } else {
        "anki_study=info,anki_study_mcp=info"
    };
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    match log_file {
        Some(path) => {
            let file_appender = tracing_appender::rolling::never(
                path.parent().unwrap_or(Path::new(".")),
                path.file_name().unwrap_or_default(),
            );
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .without_time()
                        .with_writer(std::io::stderr),
                )
                .init();
            None
        }
    }
}
