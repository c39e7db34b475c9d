//! Binary entry point for claimcheck.
//!
//! This binary provides the CLI interface for the claimcheck verification
//! service.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use claimcheck::cli::{ExtractCommand, ServeCommand, VerifyCommand};
use claimcheck::config::ClaimcheckConfig;
use claimcheck::observability::{self, InitOptions};
use std::path::PathBuf;
use std::process::ExitCode;

/// Claimcheck - real-time claim verification for live transcripts.
#[derive(Parser)]
#[command(name = "claimcheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "CLAIMCHECK_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the WebSocket session server.
    Serve {
        /// Address to bind (overrides `server.bind`).
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Verify one claim and print the result as JSON.
    Verify {
        /// The claim to verify.
        claim: String,

        /// Prior transcript context (repeatable).
        #[arg(long = "context")]
        context: Vec<String>,
    },

    /// Show the candidate claims found in a transcript.
    Extract {
        /// The transcript text.
        transcript: String,
    },
}

fn main() -> ExitCode {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ClaimcheckConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?;

    let expose_metrics = matches!(cli.command, Commands::Serve { .. });
    let _observability = observability::init(
        &config.observability,
        InitOptions {
            verbose: cli.verbose,
            metrics_expose: expose_metrics,
        },
    )
    .context("failed to initialize observability")?;

    match cli.command {
        Commands::Serve { bind } => {
            let runtime = build_runtime()?;
            ServeCommand::new().with_bind(bind).run(config, &runtime)?;
        },
        Commands::Verify { claim, context } => {
            let runtime = build_runtime()?;
            let result = VerifyCommand::new(claim)
                .with_context(context)
                .run(&config, &runtime)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        },
        Commands::Extract { transcript } => {
            let claims = ExtractCommand::new(config.extraction).run(&transcript);
            println!("{}", serde_json::to_string_pretty(&claims)?);
        },
    }
    Ok(())
}

fn build_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
