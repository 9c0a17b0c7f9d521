//! CLI for the cascade bulk-fetch engine.

mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use cascade_core::config;
use std::path::PathBuf;

use commands::{run_fetch, run_get};

/// Top-level CLI for the cascade bulk-fetch engine.
#[derive(Debug, Parser)]
#[command(name = "cascade")]
#[command(about = "cascade: transitive bulk-fetch with dedup and resumable downloads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch seeds (URLs or local paths) and everything they fan out into.
    Fetch {
        /// Seed URLs or local file paths.
        #[arg(required = true)]
        seeds: Vec<String>,

        /// Output directory (created on demand).
        #[arg(long, default_value = ".", value_name = "DIR")]
        out_dir: PathBuf,

        /// Worker thread count (default from config).
        #[arg(long, value_name = "N")]
        workers: Option<usize>,

        /// Skip persisting raw content.
        #[arg(long)]
        no_raw: bool,

        /// Skip producing derived artifacts.
        #[arg(long)]
        no_convert: bool,

        /// Overwrite existing files instead of appending a counter.
        #[arg(long)]
        force: bool,
    },

    /// Download a single URL (resumable).
    Get {
        /// Direct HTTP/HTTPS URL to download.
        url: String,

        /// Output directory (created on demand).
        #[arg(long, default_value = ".", value_name = "DIR")]
        out_dir: PathBuf,

        /// Destination filename (derived from the response when omitted).
        #[arg(long, value_name = "NAME")]
        filename: Option<String>,

        /// Overwrite an existing destination.
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch {
                seeds,
                out_dir,
                workers,
                no_raw,
                no_convert,
                force,
            } => run_fetch(&cfg, seeds, out_dir, workers, no_raw, no_convert, force)?,
            CliCommand::Get {
                url,
                out_dir,
                filename,
                force,
            } => run_get(&cfg, &url, &out_dir, filename, force)?,
            CliCommand::Completions { shell } => {
                let mut cmd = Cli::command();
                clap_complete::generate(shell, &mut cmd, "cascade", &mut std::io::stdout());
            }
        }

        Ok(())
    }
}
