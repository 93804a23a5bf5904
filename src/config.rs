use clap::Parser;
use std::time::Duration;

use crate::error::ConfigError;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "spending-api")]
#[command(about = "Users and spendings API with per-client rate limiting")]
pub struct Args {
    // Address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,

    // Sustained rate per client, tokens per second
    #[arg(long, default_value_t = 1.0)]
    pub rate: f64,

    // Burst size per client (bucket capacity)
    #[arg(long, default_value_t = 3)]
    pub burst: u32,

    // How often idle clients are swept, in seconds
    #[arg(long, default_value_t = 60)]
    pub sweep_interval: u64,

    // Clients unseen for longer than this many seconds are forgotten
    #[arg(long, default_value_t = 180)]
    pub idle_threshold: u64,

    // Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn limiter_config(&self) -> Result<LimiterConfig, ConfigError> {
        LimiterConfig {
            rate: self.rate,
            burst: self.burst,
            sweep_interval: Duration::from_secs(self.sweep_interval),
            idle_threshold: Duration::from_secs(self.idle_threshold),
        }
        .validate()
    }
}

/// Settings for the admission limiter and its idle sweeper.
#[derive(Debug, Clone, PartialEq)]
pub struct LimiterConfig {
    pub rate: f64,
    pub burst: u32,
    pub sweep_interval: Duration,
    pub idle_threshold: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            rate: 1.0,
            burst: 3,
            sweep_interval: Duration::from_secs(60),
            idle_threshold: Duration::from_secs(180),
        }
    }
}

impl LimiterConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.burst == 0 {
            return Err(ConfigError::ZeroBurst);
        }
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(ConfigError::InvalidRate(self.rate));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("sweep interval"));
        }
        if self.idle_threshold.is_zero() {
            return Err(ConfigError::ZeroDuration("idle threshold"));
        }
        Ok(self)
    }
}
