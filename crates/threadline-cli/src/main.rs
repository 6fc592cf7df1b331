//! threadline binary.
//!
//! Usage:
//!   threadline conversation.json
//!   threadline --format json --sort conversation.json
//!   cat conversation.json | threadline --check -
//!
//! Logging goes to stderr; set `RUST_LOG=threadline_flatten=trace` to watch
//! the traversal.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use threadline_cli::config::{OutputFormat, load_config};
use threadline_cli::outline::format_diagnostics;
use threadline_cli::{flatten_snapshot, read_snapshot, render};

/// Flatten a branching conversation snapshot into display items.
#[derive(Parser, Debug)]
#[command(name = "threadline")]
#[command(about = "Flatten a conversation snapshot into display items")]
struct Args {
    /// Snapshot JSON file, or `-` for stdin
    snapshot: PathBuf,

    /// Output format (overrides the config file)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Sort messages by createdAt before flattening
    #[arg(long)]
    sort: bool,

    /// Print diagnostics and exit non-zero if any warning is found
    #[arg(long)]
    check: bool,

    /// Max content characters per outline line
    #[arg(long)]
    width: Option<usize>,

    /// Config file (default: ~/.config/threadline/cli.ron)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    // Diagnostics and logs on stderr; stdout carries the output.
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("failed to load config")?;
    if let Some(format) = args.format {
        config.format = format;
    }
    if let Some(width) = args.width {
        config.summary_width = width;
    }
    config.sort |= args.sort;

    let snapshot = read_snapshot(&args.snapshot)
        .with_context(|| format!("failed to load {}", args.snapshot.display()))?;
    tracing::info!(messages = snapshot.len(), groups = snapshot.groups.len(), "loaded snapshot");

    if args.check {
        let diagnostics = threadline_flatten::diagnose(&snapshot);
        for line in format_diagnostics(&diagnostics) {
            eprintln!("{line}");
        }
        if diagnostics.iter().any(|d| d.is_warning()) {
            return Ok(ExitCode::FAILURE);
        }
    }

    let items = flatten_snapshot(snapshot, &config);
    println!("{}", render(&items, &config).context("failed to render output")?);

    Ok(ExitCode::SUCCESS)
}
