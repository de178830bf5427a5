//! CLI for the fanout task runtime.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fanout_core::config;

use commands::{run_backoff, run_config, run_probe, ProbeArgs};

/// Top-level CLI for the fanout task runtime.
#[derive(Debug, Parser)]
#[command(name = "fanout")]
#[command(about = "fanout: bounded worker pool with cancellable retry and backoff", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// HEAD-probe URLs concurrently, retrying transient failures.
    Probe {
        /// HTTP/HTTPS URLs to probe.
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,
        /// Concurrent workers (default: max_workers from config).
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
        /// Attempts per URL, including the first (default: retry.max_attempts from config).
        #[arg(long, value_name = "N")]
        attempts: Option<u32>,
        /// Deadline for the whole batch in milliseconds (default: task_timeout_ms from config).
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
        /// Print one JSON array instead of text lines.
        #[arg(long)]
        json: bool,
    },

    /// Print the wait before each retry under the configured backoff.
    Backoff {
        /// Number of waits to print (default: retry.max_attempts - 1 from config).
        #[arg(long, value_name = "N")]
        attempts: Option<u32>,
        /// Seed the jitter source so the schedule is reproducible.
        #[arg(long, value_name = "S")]
        seed: Option<u64>,
    },

    /// Show the config file path and the effective settings.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Probe {
                urls,
                workers,
                attempts,
                timeout_ms,
                json,
            } => {
                let args = ProbeArgs {
                    workers,
                    attempts,
                    timeout_ms,
                    json,
                };
                run_probe(&cfg, &urls, &args).await?
            }
            CliCommand::Backoff { attempts, seed } => run_backoff(&cfg, attempts, seed)?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
