#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use ordervault_core::config::{self, DEFAULT_CONFIG_FILE};
use output::{CliError, OutputMode, Reported, is_reported, render_error};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "ovault: order events into a Data Vault warehouse",
    long_about = None
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Create the warehouse and apply migrations",
        after_help = "EXAMPLES:\n    ovault init\n    ovault init --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        about = "Load one batch of closed orders into the warehouse",
        after_help = "EXAMPLES:\n    ovault load\n    ovault load --batch-size 100 --json"
    )]
    Load(cmd::load::LoadArgs),

    #[command(
        about = "Fold one batch of order summaries into the user counters",
        after_help = "EXAMPLES:\n    ovault count"
    )]
    Count(cmd::count::CountArgs),

    #[command(
        about = "Append order events (one JSON document per line) to the inbound topic",
        after_help = "EXAMPLES:\n    ovault publish orders.jsonl"
    )]
    Publish(cmd::publish::PublishArgs),

    #[command(about = "Show row counts per warehouse table")]
    Stats(cmd::stats::StatsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("OVAULT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "ordervault=debug,ovault=debug,info"
        } else {
            "ordervault=info,ovault=info,warn"
        })
    });

    let format = env::var("OVAULT_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = OutputMode::from_json_flag(cli.json);
    match run(&cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_reported(&err) => ExitCode::FAILURE,
        Err(err) => {
            let rendered = render_error(
                output,
                &CliError {
                    message: format!("{err:#}"),
                    hint: None,
                    error_code: None,
                },
            );
            if rendered.is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    let config = match config::resolve_config(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            render_error(
                output,
                &CliError::with_code(
                    format!("{err:#}"),
                    ordervault_core::error::ErrorCode::ConfigParseError,
                ),
            )?;
            return Err(err.context(Reported));
        }
    };

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, &config, output),
        Commands::Load(args) => cmd::load::run_load(args, config, output),
        Commands::Count(args) => cmd::count::run_count(args, config, output),
        Commands::Publish(args) => cmd::publish::run_publish(args, &config, output),
        Commands::Stats(args) => cmd::stats::run_stats(args, &config, output),
    }
}
