// src/config.rs

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Everything tunable via `MR_*` environment variables (or `.env`).
/// Every key has a default; a missing variable is never an error.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    // Signal
    pub rolling_window: usize,
    pub deviation_threshold_pct: f64,
    pub volatility_threshold_enabled: bool,
    pub volatility_multiplier: f64,

    // Exit rules
    pub min_hold_secs: u64,
    pub max_hold_secs: u64,
    pub break_even_secs: u64,
    pub break_even_band_low: f64,
    pub break_even_band_high: f64,
    pub stop_loss_pct: f64,
    pub stop_loss_floor: f64,
    pub max_loss_per_trade_pct: f64,

    // Entry gate
    pub min_open_interest: i64,
    pub max_spread_pct: f64,
    pub min_volume: i64,
    pub hours_before_close: f64,

    // Position sizing (latent unless enabled)
    pub sizing_enabled: bool,
    pub sizing_base_contracts: u32,
    pub sizing_max_contracts: u32,
    pub sizing_risk_pct: f64,

    // Loop
    pub poll_interval_secs: f64,
    pub error_backoff_secs: u64,

    // Execution & logging
    pub live_trading: bool,
    pub log_file: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("rolling_window", 15)?
            .set_default("deviation_threshold_pct", 5.0)?
            .set_default("volatility_threshold_enabled", true)?
            .set_default("volatility_multiplier", 1.0)?
            .set_default("min_hold_secs", 30)?
            .set_default("max_hold_secs", 2700)?
            .set_default("break_even_secs", 1800)?
            .set_default("break_even_band_low", -2.0)?
            .set_default("break_even_band_high", 3.0)?
            .set_default("stop_loss_pct", 0.10)?
            .set_default("stop_loss_floor", 0.35)?
            .set_default("max_loss_per_trade_pct", 12.0)?
            .set_default("min_open_interest", 100)?
            .set_default("max_spread_pct", 10.0)?
            .set_default("min_volume", 0)?
            .set_default("hours_before_close", 2.0)?
            .set_default("sizing_enabled", false)?
            .set_default("sizing_base_contracts", 10)?
            .set_default("sizing_max_contracts", 100)?
            .set_default("sizing_risk_pct", 1.0)?
            .set_default("poll_interval_secs", 2.0)?
            .set_default("error_backoff_secs", 3)?
            .set_default("live_trading", false)?
            .set_default("log_file", "trading_log.csv")?
            .add_source(Environment::with_prefix("MR").try_parsing(true));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_environment() {
        let cfg = AppConfig::new().expect("defaults must always deserialize");
        assert_eq!(cfg.rolling_window, 15);
        assert_eq!(cfg.min_hold_secs, 30);
        assert_eq!(cfg.max_hold_secs, 2700);
        assert!((cfg.stop_loss_floor - 0.35).abs() < f64::EPSILON);
        assert!(!cfg.live_trading);
        assert!(!cfg.sizing_enabled);
    }
}
