//! Command-line and environment configuration for `kimp-server`.
//!
//! | Option | Env | Default |
//! |--------|-----|---------|
//! | `--bind` | `KIMP_BIND` | `0.0.0.0:8000` |
//! | `--config` | `KIMP_CONFIG` | none (JSON file, missing keys use defaults) |
//! | `--timeout-ms` | `KIMP_TIMEOUT_MS` | `10000` |
//! | `--fallback-rate` | `KIMP_FALLBACK_RATE` | `1300` |
//! | `--cache-ttl-ms` | `KIMP_CACHE_TTL_MS` | `0` (disabled) |
//! | `--fx-url` | `KIMP_FX_URL` | `https://api.exchangerate-api.com` |
//! | `--binance-url` | `KIMP_BINANCE_URL` | `https://api.binance.com` |
//! | `--upbit-url` | `KIMP_UPBIT_URL` | `https://api.upbit.com` |
//! | `--max-retries` | `KIMP_MAX_RETRIES` | `1` |
//! | `--breaker-threshold` | `KIMP_BREAKER_THRESHOLD` | `3` |
//! | `--breaker-open-secs` | `KIMP_BREAKER_OPEN_SECS` | `30` |
//!
//! Explicit options override values from the config file.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use kimp_core::KimpConfig;

use crate::error::ServerError;

/// Kimchi premium aggregator: Binance USDT vs Upbit KRW prices over HTTP.
#[derive(Debug, Parser)]
#[command(name = "kimp-server", author, version, about)]
pub struct Cli {
    /// Address the HTTP server listens on.
    #[arg(long, env = "KIMP_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// JSON configuration file.
    #[arg(long, env = "KIMP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Per-request upstream timeout in milliseconds.
    #[arg(long, env = "KIMP_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// USD/KRW rate used when the live lookup fails.
    #[arg(long, env = "KIMP_FALLBACK_RATE")]
    pub fallback_rate: Option<f64>,

    /// Snapshot cache TTL in milliseconds; 0 disables caching.
    #[arg(long, env = "KIMP_CACHE_TTL_MS")]
    pub cache_ttl_ms: Option<u64>,

    #[arg(long, env = "KIMP_FX_URL")]
    pub fx_url: Option<String>,

    #[arg(long, env = "KIMP_BINANCE_URL")]
    pub binance_url: Option<String>,

    #[arg(long, env = "KIMP_UPBIT_URL")]
    pub upbit_url: Option<String>,

    /// Retries per upstream call for transient failures.
    #[arg(long, env = "KIMP_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Consecutive failures before an upstream circuit opens.
    #[arg(long, env = "KIMP_BREAKER_THRESHOLD")]
    pub breaker_threshold: Option<u32>,

    /// Seconds an open circuit waits before a probe request.
    #[arg(long, env = "KIMP_BREAKER_OPEN_SECS")]
    pub breaker_open_secs: Option<u64>,
}

impl Cli {
    /// Reads the config file (if any), applies explicit overrides and validates.
    pub fn load_config(&self) -> Result<KimpConfig, ServerError> {
        let base = match &self.config {
            Some(path) => {
                let raw =
                    std::fs::read_to_string(path).map_err(|source| ServerError::ConfigFile {
                        path: path.clone(),
                        source,
                    })?;
                KimpConfig::from_json_str(&raw)?
            }
            None => KimpConfig::default(),
        };

        let config = self.apply_overrides(base);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&self, mut config: KimpConfig) -> KimpConfig {
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(fallback_rate) = self.fallback_rate {
            config.fallback_rate = fallback_rate;
        }
        if let Some(cache_ttl_ms) = self.cache_ttl_ms {
            config.cache_ttl_ms = cache_ttl_ms;
        }
        if let Some(url) = &self.fx_url {
            config.fx_base_url = url.clone();
        }
        if let Some(url) = &self.binance_url {
            config.binance_base_url = url.clone();
        }
        if let Some(url) = &self.upbit_url {
            config.upbit_base_url = url.clone();
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(threshold) = self.breaker_threshold {
            config.breaker_failure_threshold = threshold;
        }
        if let Some(secs) = self.breaker_open_secs {
            config.breaker_open_timeout_ms = secs.saturating_mul(1_000);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_core_config() {
        let cli = Cli::try_parse_from(["kimp-server"]).expect("parses");

        assert_eq!(cli.bind, SocketAddr::from(([0, 0, 0, 0], 8000)));
        assert_eq!(cli.apply_overrides(KimpConfig::default()), KimpConfig::default());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "kimp-server",
            "--bind",
            "127.0.0.1:9000",
            "--timeout-ms",
            "2500",
            "--fallback-rate",
            "1375.5",
            "--cache-ttl-ms",
            "3000",
            "--breaker-open-secs",
            "5",
        ])
        .expect("parses");

        let config = cli.apply_overrides(KimpConfig::default());

        assert_eq!(cli.bind.port(), 9000);
        assert_eq!(config.timeout_ms, 2_500);
        assert_eq!(config.fallback_rate, 1_375.5);
        assert_eq!(config.cache_ttl_ms, 3_000);
        assert_eq!(config.breaker_open_timeout_ms, 5_000);
    }

    #[test]
    fn invalid_override_fails_validation() {
        let cli =
            Cli::try_parse_from(["kimp-server", "--fallback-rate", "0"]).expect("parses");

        assert!(matches!(
            cli.load_config(),
            Err(ServerError::Validation(_))
        ));
    }
}
