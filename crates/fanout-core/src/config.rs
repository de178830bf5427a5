use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::{Backoff, RetryPolicy};

/// A config value outside its allowed range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_workers must be > 0")]
    NoWorkers,
    #[error("retry.max_attempts must be > 0")]
    NoAttempts,
    #[error("retry.base_delay_ms must be > 0")]
    ZeroBaseDelay,
    #[error("retry.max_delay_ms ({max}) must be >= retry.base_delay_ms ({base})")]
    MaxBelowBase { base: u64, max: u64 },
    #[error("retry.factor must be >= 1.0, got {0}")]
    Factor(f64),
    #[error("retry.jitter must be within [0, 1], got {0}")]
    Jitter(f64),
}

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per operation (including the first).
    pub max_attempts: u32,
    /// Wait before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Ceiling for the unjittered wait, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor between consecutive waits.
    pub factor: f64,
    /// Jitter ratio in [0, 1]; 0.2 = +/-20%.
    pub jitter: f64,
    /// Fixed jitter seed for reproducible schedules.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 50,
            max_delay_ms: 2000,
            factor: 2.0,
            jitter: 0.2,
            seed: None,
        }
    }
}

impl RetryConfig {
    /// Validate and build the backoff described by this section.
    pub fn to_backoff(&self) -> Result<Backoff, ConfigError> {
        if self.base_delay_ms == 0 {
            return Err(ConfigError::ZeroBaseDelay);
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigError::MaxBelowBase {
                base: self.base_delay_ms,
                max: self.max_delay_ms,
            });
        }
        if self.factor.is_nan() || self.factor < 1.0 {
            return Err(ConfigError::Factor(self.factor));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::Jitter(self.jitter));
        }
        let backoff = Backoff::new(
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.factor,
        )
        .with_jitter(self.jitter);
        Ok(match self.seed {
            Some(seed) => backoff.with_seed(seed),
            None => backoff,
        })
    }

    /// Validate and build the full retry policy.
    pub fn to_policy(&self) -> Result<RetryPolicy, ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        Ok(RetryPolicy::new(self.max_attempts, self.to_backoff()?))
    }
}

/// HEAD probe timeouts (optional section in config.toml).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub connect_timeout_ms: u64,
    /// Whole-request timeout per attempt.
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            timeout_ms: 10_000,
        }
    }
}

impl ProbeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Global configuration loaded from `~/.config/fanout/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Number of concurrent workers per batch.
    pub max_workers: usize,
    /// Optional deadline for a whole batch in milliseconds (None = no deadline).
    #[serde(default)]
    pub task_timeout_ms: Option<u64>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Optional probe timeouts; if missing, built-in defaults are used.
    #[serde(default)]
    pub probe: Option<ProbeConfig>,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            task_timeout_ms: None,
            retry: None,
            probe: None,
        }
    }
}

impl FanoutConfig {
    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    pub fn probe_config(&self) -> ProbeConfig {
        self.probe.unwrap_or_default()
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_ms.map(Duration::from_millis)
    }

    /// Copy with every optional section filled in with what is actually used.
    pub fn effective(&self) -> FanoutConfig {
        FanoutConfig {
            retry: Some(self.retry_config()),
            probe: Some(self.probe_config()),
            ..self.clone()
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every value that has a range restriction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        self.retry_config().to_policy().map(|_| ())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("fanout")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FanoutConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FanoutConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load and validate configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<FanoutConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: FanoutConfig = toml::from_str(&data)?;
    cfg.validate()?;
    Ok(cfg)
}
