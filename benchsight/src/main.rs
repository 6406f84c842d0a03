//! BenchSight command line.
//!
//! Assembles experiment configuration from JSON fragments, queries
//! benchmark results, scrapes benchmark logs and records resource usage
//! through an external monitor script.

mod commands;
mod settings;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use benchsight_common::{LogFormat, LoggingConfig, init_tracing, load_config};
use benchsight_config::{DEFAULT_PATTERN, Policy};

use crate::settings::Settings;

/// Experiment configuration and resource monitoring for benchmarks.
#[derive(Parser, Debug)]
#[command(name = "benchsight")]
#[command(version)]
struct Cli {
    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Override log format (text, json).
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble configuration fragments into one document
    Config {
        /// Directory holding the JSON fragments
        #[arg(short, long)]
        dir: PathBuf,

        /// Fragments to load, in order (default: every *.json in the directory)
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// User configuration applied on top of the fragments
        #[arg(short, long)]
        user: Option<PathBuf>,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Select documents from a JSON array of results
    Query {
        /// JSON file holding an array of documents
        #[arg(short, long)]
        input: PathBuf,

        /// Query as a JSON object, e.g. '{"exp.framework": ["tensorflow"]}'
        #[arg(short, long)]
        query: String,

        /// How to treat fields missing from a document
        #[arg(long, default_value = "relaxed")]
        policy: Policy,
    },

    /// Extract __key__=value lines from a benchmark log
    Scrape {
        /// Log file to scan
        #[arg(short, long)]
        log: PathBuf,

        /// Pattern with key and value groups
        #[arg(long, default_value = DEFAULT_PATTERN)]
        pattern: String,

        /// Only keep these keys
        #[arg(short, long = "key")]
        keys: Vec<String>,

        /// Fail on lines that do not match the pattern
        #[arg(long)]
        must_match: bool,
    },

    /// Record resource usage with the external monitor script
    Monitor {
        /// Settings file (JSON5)
        #[arg(short, long, default_value = "benchsight.json5")]
        settings: PathBuf,

        /// Seconds to record (default: until Ctrl+C)
        #[arg(short, long)]
        duration: Option<f64>,

        /// Write measurements here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.command {
        Commands::Monitor { settings, .. } => Some(
            load_config::<Settings>(settings).map_err(|e| anyhow::anyhow!("{}", e))?,
        ),
        _ => None,
    };

    let mut logging = settings
        .as_ref()
        .map(|s| s.logging.clone())
        .unwrap_or_else(LoggingConfig::default);
    if let Some(level) = cli.log_level {
        logging.level = level;
    }
    if let Some(format) = cli.log_format {
        logging.format = format;
    }
    init_tracing(&logging).map_err(|e| anyhow::anyhow!("{}", e))?;

    match cli.command {
        Commands::Config {
            dir,
            files,
            user,
            output,
        } => commands::config(&dir, &files, user.as_deref(), output.as_deref()),
        Commands::Query {
            input,
            query,
            policy,
        } => commands::query(&input, &query, policy),
        Commands::Scrape {
            log,
            pattern,
            keys,
            must_match,
        } => commands::scrape(&log, &pattern, &keys, must_match),
        Commands::Monitor {
            duration, output, ..
        } => {
            let settings = settings.ok_or_else(|| anyhow::anyhow!("Monitor settings missing"))?;
            commands::monitor(settings.monitor, duration, output.as_deref()).await
        }
    }
}
