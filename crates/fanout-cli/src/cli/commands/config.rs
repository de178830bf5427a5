//! `fanout config` – show where the config lives and what is in effect.

use anyhow::Result;
use fanout_core::config::{self, FanoutConfig};

pub fn run_config(cfg: &FanoutConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", cfg.effective().to_toml()?);
    Ok(())
}
