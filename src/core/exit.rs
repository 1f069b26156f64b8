// src/core/exit.rs
//
// Per-episode exit decision. An episode is TRACKING until exactly one rule
// fires and the resulting order is confirmed, after which it is EXITED and
// never re-evaluated. Precedence is an explicit ordered rule list, not an
// if/else chain: take-profit first (exempt from the minimum-hold gate),
// then the four stop rules in fixed order, first match wins.

use crate::config::AppConfig;

/// Everything a single evaluation needs, captured at poll time.
#[derive(Debug, Clone, Copy)]
pub struct ExitInputs {
    pub current_price: f64,
    pub entry_price: f64,
    pub pnl_pct: f64,
    pub deviation_pct: f64,
    pub threshold_pct: f64,
    pub hold_secs: i64,
}

/// The single reason produced by a fired exit; its `Display` is the
/// string that goes to the trade log.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitReason {
    TakeProfit { deviation_pct: f64, threshold_pct: f64 },
    StopLoss { current: f64, stop_price: f64 },
    MaxLoss { pnl_pct: f64, limit_pct: f64 },
    TimeStop { hold_secs: i64, max_secs: u64 },
    BreakEven { hold_secs: i64, pnl_pct: f64 },
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::TakeProfit {
                deviation_pct,
                threshold_pct,
            } => write!(
                f,
                "take profit: deviation +{deviation_pct:.1}% above median (threshold {threshold_pct:.1}%)"
            ),
            ExitReason::StopLoss { current, stop_price } => {
                write!(f, "stop loss: ${current:.2} <= stop ${stop_price:.2}")
            }
            ExitReason::MaxLoss { pnl_pct, limit_pct } => {
                write!(f, "max loss: pnl {pnl_pct:.1}% breached -{limit_pct:.1}%")
            }
            ExitReason::TimeStop { hold_secs, max_secs } => {
                write!(f, "time stop: held {hold_secs}s >= {max_secs}s with negative pnl")
            }
            ExitReason::BreakEven { hold_secs, pnl_pct } => {
                write!(f, "break even: flat at {pnl_pct:.1}% after {hold_secs}s")
            }
        }
    }
}

/// The stop rules behind the minimum-hold gate, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopRule {
    PercentWithFloor,
    MaxLossPerTrade,
    TimeStop,
    BreakEven,
}

const STOP_RULES: [StopRule; 4] = [
    StopRule::PercentWithFloor,
    StopRule::MaxLossPerTrade,
    StopRule::TimeStop,
    StopRule::BreakEven,
];

#[derive(Debug, Clone)]
pub struct ExitPolicy {
    min_hold_secs: u64,
    stop_loss_pct: f64,
    stop_loss_floor: f64,
    max_loss_per_trade_pct: f64,
    max_hold_secs: u64,
    break_even_secs: u64,
    break_even_band_low: f64,
    break_even_band_high: f64,
}

impl ExitPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            min_hold_secs: config.min_hold_secs,
            stop_loss_pct: config.stop_loss_pct,
            stop_loss_floor: config.stop_loss_floor,
            max_loss_per_trade_pct: config.max_loss_per_trade_pct,
            max_hold_secs: config.max_hold_secs,
            break_even_secs: config.break_even_secs,
            break_even_band_low: config.break_even_band_low,
            break_even_band_high: config.break_even_band_high,
        }
    }

    /// Stop price for a given entry: percentage stop with a hard floor so
    /// the stop never drops below a platform-meaningful minimum.
    pub fn stop_price(&self, entry_price: f64) -> f64 {
        (entry_price * (1.0 - self.stop_loss_pct)).max(self.stop_loss_floor)
    }

    /// At most one reason per poll; `None` means keep holding.
    pub fn evaluate(&self, x: &ExitInputs) -> Option<ExitReason> {
        // Take-profit is exempt from the minimum-hold gate.
        if x.deviation_pct >= x.threshold_pct && x.pnl_pct > 0.0 {
            return Some(ExitReason::TakeProfit {
                deviation_pct: x.deviation_pct,
                threshold_pct: x.threshold_pct,
            });
        }

        // Entry-price noise right after fill: no stop fires this poll.
        if x.hold_secs < self.min_hold_secs as i64 {
            return None;
        }

        STOP_RULES.iter().find_map(|rule| self.eval_stop(*rule, x))
    }

    fn eval_stop(&self, rule: StopRule, x: &ExitInputs) -> Option<ExitReason> {
        match rule {
            StopRule::PercentWithFloor => {
                let stop_price = self.stop_price(x.entry_price);
                (x.current_price <= stop_price).then_some(ExitReason::StopLoss {
                    current: x.current_price,
                    stop_price,
                })
            }
            StopRule::MaxLossPerTrade => (x.pnl_pct <= -self.max_loss_per_trade_pct).then_some(
                ExitReason::MaxLoss {
                    pnl_pct: x.pnl_pct,
                    limit_pct: self.max_loss_per_trade_pct,
                },
            ),
            StopRule::TimeStop => {
                (x.hold_secs >= self.max_hold_secs as i64 && x.pnl_pct < 0.0).then_some(
                    ExitReason::TimeStop {
                        hold_secs: x.hold_secs,
                        max_secs: self.max_hold_secs,
                    },
                )
            }
            StopRule::BreakEven => {
                let flat = x.pnl_pct >= self.break_even_band_low
                    && x.pnl_pct <= self.break_even_band_high;
                (x.hold_secs >= self.break_even_secs as i64 && flat).then_some(
                    ExitReason::BreakEven {
                        hold_secs: x.hold_secs,
                        pnl_pct: x.pnl_pct,
                    },
                )
            }
        }
    }
}
