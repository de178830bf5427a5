//! `fanout backoff` – print the retry wait schedule.

use anyhow::Result;
use fanout_core::config::FanoutConfig;

pub fn run_backoff(cfg: &FanoutConfig, attempts: Option<u32>, seed: Option<u64>) -> Result<()> {
    let mut retry = cfg.retry_config();
    if seed.is_some() {
        retry.seed = seed;
    }
    let backoff = retry.to_backoff()?;
    let waits = attempts.unwrap_or(retry.max_attempts.saturating_sub(1));

    println!(
        "base {}ms, max {}ms, factor {}, jitter {}",
        retry.base_delay_ms, retry.max_delay_ms, retry.factor, retry.jitter
    );
    println!("{:<6} {}", "RETRY", "WAIT");
    for (i, wait) in backoff.schedule(waits).iter().enumerate() {
        println!("{:<6} {}ms", i + 1, wait.as_millis());
    }
    Ok(())
}
