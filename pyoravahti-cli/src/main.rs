//! Pyörävahti CLI - maintenance jobs and photo fingerprint tools.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod store;

use exit_codes::ExitCode;

const AFTER_HELP: &str = "\
Environment:
  DATABASE_URL         PostgreSQL connection string (in-memory store when unset)
  ENABLE_TORI_ADAPTER  set to \"false\" to switch the listing adapter off
  RUST_LOG             log filter, e.g. pyoravahti_core=debug

Exit codes:
  0   success
  1   general error
  65  input is not a usable image
  66  input file cannot be read
  69  database or listing source unavailable";

#[derive(Parser)]
#[command(name = "pyoravahti")]
#[command(author, version, about = "Bicycle matching and duplicate detection tools", long_about = None)]
#[command(after_help = AFTER_HELP)]
struct Cli {
    /// Only print errors and bare results
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import marketplace listings as for-sale bikes
    FetchForSale {
        /// Run with the listing adapter switched off
        #[arg(long)]
        disabled: bool,
    },

    /// Recompute matches for bikes added recently
    RecomputeMatches {
        /// Look back this many hours
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },

    /// Print the fingerprint of an image
    Phash {
        /// Image file (JPEG, PNG, GIF or WebP)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Compare the fingerprints of two images
    Compare {
        #[arg(value_name = "A")]
        first: PathBuf,

        #[arg(value_name = "B")]
        second: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "pyoravahti=debug,pyoravahti_core=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::FetchForSale { disabled } => {
            commands::fetch_for_sale::execute(disabled, cli.json, cli.quiet).await
        }
        Commands::RecomputeMatches { hours } => {
            commands::recompute::execute(hours, cli.json, cli.quiet).await
        }
        Commands::Phash { file } => commands::fingerprint::execute_phash(file, cli.json),
        Commands::Compare { first, second } => {
            commands::fingerprint::execute_compare(first, second, cli.json, cli.quiet)
        }
    };

    if let Err(err) = result {
        let exit = ExitCode::from_anyhow(&err);
        eprintln!("{} {}", "Error:".red().bold(), exit.message);
        std::process::exit(exit.code);
    }
}
