// src/core/sizing.rs
//
// Position sizing is a latent capability: the bot only inherits positions,
// it never opens them, so a sizing strategy can clamp the tracked quantity
// at admission time but never grow it. The default strategy is a no-op.

use crate::config::AppConfig;

pub trait SizingStrategy: Send + Sync {
    /// How many contracts to manage for a newly admitted episode, given
    /// what the account actually holds. Must never exceed `account_shares`.
    fn shares_for_entry(
        &self,
        account_shares: u32,
        entry_price: f64,
        cash_balance: Option<f64>,
    ) -> u32;

    /// Whether the engine should fetch the portfolio balance before
    /// admission. Spares a network call for the no-op default.
    fn needs_balance(&self) -> bool {
        false
    }
}

/// Default: track exactly what the account reports.
pub struct InheritSizing;

impl SizingStrategy for InheritSizing {
    fn shares_for_entry(&self, account_shares: u32, _entry: f64, _balance: Option<f64>) -> u32 {
        account_shares
    }
}

/// Balance-driven sizing: base contracts plus a risk fraction of cash,
/// capped at a maximum, clamped to the actual holding.
pub struct BalanceRiskSizing {
    base_contracts: u32,
    max_contracts: u32,
    risk_pct: f64,
}

impl BalanceRiskSizing {
    pub fn new(base_contracts: u32, max_contracts: u32, risk_pct: f64) -> Self {
        Self {
            base_contracts,
            max_contracts,
            risk_pct,
        }
    }
}

impl SizingStrategy for BalanceRiskSizing {
    fn shares_for_entry(
        &self,
        account_shares: u32,
        entry_price: f64,
        cash_balance: Option<f64>,
    ) -> u32 {
        let budget = match cash_balance {
            Some(balance) if entry_price > 0.0 => {
                (balance * self.risk_pct / 100.0 / entry_price) as u32
            }
            _ => 0,
        };
        let intended = (self.base_contracts + budget).min(self.max_contracts);
        intended.min(account_shares)
    }

    fn needs_balance(&self) -> bool {
        true
    }
}

pub fn from_config(config: &AppConfig) -> Box<dyn SizingStrategy> {
    if config.sizing_enabled {
        Box::new(BalanceRiskSizing::new(
            config.sizing_base_contracts,
            config.sizing_max_contracts,
            config.sizing_risk_pct,
        ))
    } else {
        Box::new(InheritSizing)
    }
}
