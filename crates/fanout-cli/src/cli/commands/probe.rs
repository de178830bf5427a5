//! `fanout probe` – HEAD-probe a batch of URLs through the worker pool.

use anyhow::Result;
use fanout_core::cancel::CancelSource;
use fanout_core::config::FanoutConfig;
use fanout_core::pool::PoolSummary;
use fanout_core::probe::{self, ProbeRecord};
use std::time::Duration;

/// Command-line overrides for one probe run.
#[derive(Debug, Clone, Default)]
pub struct ProbeArgs {
    pub workers: Option<usize>,
    pub attempts: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub json: bool,
}

pub async fn run_probe(cfg: &FanoutConfig, urls: &[String], args: &ProbeArgs) -> Result<()> {
    let workers = args.workers.unwrap_or(cfg.max_workers);
    if workers == 0 {
        anyhow::bail!("--workers must be > 0");
    }
    let mut retry = cfg.retry_config();
    if let Some(n) = args.attempts {
        retry.max_attempts = n;
    }
    let policy = retry.to_policy()?;
    let deadline = args
        .timeout_ms
        .map(Duration::from_millis)
        .or_else(|| cfg.task_timeout());
    let source = match deadline {
        Some(d) => CancelSource::with_timeout(d),
        None => CancelSource::new(),
    };

    tracing::info!(
        "probing {} URL(s) with {} worker(s), {} attempt(s) each",
        urls.len(),
        workers,
        policy.max_attempts
    );

    let signal = source.signal();
    let probe_cfg = cfg.probe_config();
    let probing = probe::probe_all(&signal, urls, workers, &policy, &probe_cfg);
    tokio::pin!(probing);
    let reports = tokio::select! {
        res = &mut probing => res?,
        Ok(()) = tokio::signal::ctrl_c() => {
            eprintln!("interrupted; waiting for running probes to finish");
            source.cancel();
            probing.await?
        }
    };

    let records: Vec<ProbeRecord> = reports.iter().map(|r| r.record()).collect();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        println!("{:<14} {:<8} {:<6} {:<10} {}", "STATE", "ATTEMPTS", "HTTP", "SIZE", "URL");
        for rec in &records {
            println!("{}", format_line(rec));
        }
    }

    let summary = PoolSummary::from_outcomes(reports.iter().map(|r| &r.outcome));
    tracing::info!(
        "probe finished: {} succeeded, {} failed, {} not attempted",
        summary.succeeded,
        summary.failed,
        summary.not_attempted
    );
    if !args.json {
        println!(
            "{} succeeded, {} failed, {} not attempted",
            summary.succeeded, summary.failed, summary.not_attempted
        );
    }
    if !summary.all_succeeded() {
        anyhow::bail!(
            "{} of {} probe(s) did not succeed",
            summary.failed + summary.not_attempted,
            summary.total()
        );
    }
    Ok(())
}

fn format_line(rec: &ProbeRecord) -> String {
    let status = rec
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    let size = rec
        .content_length
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{:<14} {:<8} {:<6} {:<10} {}",
        rec.state, rec.attempts, status, size, rec.url
    );
    if let Some(err) = &rec.error {
        line.push_str("  (");
        line.push_str(err);
        line.push(')');
    }
    line
}
