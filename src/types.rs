// src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Yes,
    No,
}

/// One open position as reported by the brokerage account.
/// `position` is signed (long/short); `market_exposure` is in cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPosition {
    pub ticker: String,
    pub position: i64,
    pub market_exposure: i64,
}

/// Market snapshot for a single ticker. Prices are in dollars;
/// fields the venue does not publish are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuote {
    pub ticker: String,
    pub title: String,
    pub yes_bid: Option<f64>,
    pub yes_ask: Option<f64>,
    pub open_interest: Option<i64>,
    pub volume: Option<i64>,
    pub close_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash_balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub ticker: String,
    pub action: OrderAction,
    pub side: OrderSide,
    pub count: u32,
    pub client_order_id: String,
}

impl OrderRequest {
    /// Immediate market sell of the full share count.
    pub fn market_sell(ticker: &str, count: u32) -> Self {
        Self {
            ticker: ticker.to_string(),
            action: OrderAction::Sell,
            side: OrderSide::Yes,
            count,
            client_order_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub status: String,
}

// --- Dashboard handoff ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    /// Below the minimum hold time; stop rules are suppressed.
    Warmup,
    Tracking,
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowStatus::Warmup => write!(f, "warmup"),
            RowStatus::Tracking => write!(f, "tracking"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardRow {
    pub ticker: String,
    pub title: String,
    pub entry: f64,
    pub now: f64,
    pub median: f64,
    pub peak: f64,
    pub deviation_pct: f64,
    pub pnl_pct: f64,
    pub hold_minutes: f64,
    pub sparkline: String,
    pub status: RowStatus,
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    Positions(Vec<DashboardRow>),
    Log(String),
}
