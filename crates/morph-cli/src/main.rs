//! # morph CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use morph_cli::check::{run_check, CheckArgs};
use morph_cli::config::load_options;
use morph_cli::inspect::{run_inspect, InspectArgs};
use morph_cli::probe::{run_probe, ProbeArgs};

/// morph — schema transformation and validator compilation toolkit.
///
/// Loads JSON Schema documents, rewrites them for string transports
/// (query strings, multipart fields), and compiles them into validators.
#[derive(Parser, Debug)]
#[command(name = "morph", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Compiler options file (JSON or YAML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply a coercion policy and print the lowered JSON Schema.
    Inspect(InspectArgs),

    /// Report the kinds, codecs, and coercion tags a schema reaches.
    Probe(ProbeArgs),

    /// Validate documents against a schema.
    Check(CheckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "morph CLI starting");

    let result = load_options(cli.config.as_deref()).and_then(|options| match &cli.command {
        Commands::Inspect(args) => run_inspect(args),
        Commands::Probe(args) => run_probe(args),
        Commands::Check(args) => run_check(args, &options),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
