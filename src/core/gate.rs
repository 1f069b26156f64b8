// src/core/gate.rs
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::AppConfig;
use crate::types::MarketQuote;
use crate::utils::money::spread_pct;

/// Why a market was refused for a new tracking episode.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectReason {
    #[error("no open interest reported")]
    NoOpenInterest,
    #[error("open interest {oi} below minimum {min}")]
    LowOpenInterest { oi: i64, min: i64 },
    #[error("volume {volume} below minimum {min}")]
    LowVolume { volume: i64, min: i64 },
    #[error("spread {pct:.2}% above maximum {max:.2}%")]
    WideSpread { pct: f64, max: f64 },
    #[error("market closes in {hours:.1}h, buffer is {min:.1}h")]
    ClosingSoon { hours: f64, min: f64 },
}

/// Admission control for NEW tracking episodes only. A position that is
/// already tracked keeps being monitored for exits even if its market's
/// liquidity later degrades; the holder already has the exposure.
#[derive(Debug, Clone)]
pub struct EntryGate {
    min_open_interest: i64,
    max_spread_pct: f64,
    min_volume: i64,
    hours_before_close: f64,
}

impl EntryGate {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            min_open_interest: config.min_open_interest,
            max_spread_pct: config.max_spread_pct,
            min_volume: config.min_volume,
            hours_before_close: config.hours_before_close,
        }
    }

    /// Both checks must pass: liquidity (fail-closed on missing open
    /// interest) and time-to-close (fail-open on missing close time).
    pub fn admit(&self, quote: &MarketQuote, now: DateTime<Utc>) -> Result<(), RejectReason> {
        self.check_liquidity(quote)?;
        self.check_time_to_close(quote, now)
    }

    fn check_liquidity(&self, quote: &MarketQuote) -> Result<(), RejectReason> {
        let oi = quote.open_interest.unwrap_or(0);
        if oi == 0 {
            return Err(RejectReason::NoOpenInterest);
        }
        if oi < self.min_open_interest {
            return Err(RejectReason::LowOpenInterest {
                oi,
                min: self.min_open_interest,
            });
        }

        // Volume is fail-open: not every market reports it.
        if let Some(volume) = quote.volume {
            if volume < self.min_volume {
                return Err(RejectReason::LowVolume {
                    volume,
                    min: self.min_volume,
                });
            }
        }

        if let (Some(bid), Some(ask)) = (quote.yes_bid, quote.yes_ask) {
            if bid > 0.0 && ask > 0.0 {
                let pct = spread_pct(bid, ask);
                if pct > self.max_spread_pct {
                    return Err(RejectReason::WideSpread {
                        pct,
                        max: self.max_spread_pct,
                    });
                }
            }
        }
        Ok(())
    }

    fn check_time_to_close(
        &self,
        quote: &MarketQuote,
        now: DateTime<Utc>,
    ) -> Result<(), RejectReason> {
        // No published close time admits: inability to determine the close
        // must not block tracking of a position the account already holds.
        let Some(close_time) = quote.close_time else {
            return Ok(());
        };
        let hours = (close_time - now).num_seconds() as f64 / 3600.0;
        if hours < self.hours_before_close {
            return Err(RejectReason::ClosingSoon {
                hours,
                min: self.hours_before_close,
            });
        }
        Ok(())
    }
}
