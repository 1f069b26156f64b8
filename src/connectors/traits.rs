// src/connectors/traits.rs
use crate::types::{AccountPosition, MarketQuote, OrderConfirmation, OrderRequest, Portfolio};
use anyhow::Result;
use async_trait::async_trait;

/// The brokerage seam. The engine only ever talks to this trait, so tests
/// drive full poll cycles against an in-memory implementation.
#[async_trait]
pub trait Brokerage: Send + Sync {
    /// All open positions, market and event, with signed share counts.
    async fn get_positions(&self) -> Result<Vec<AccountPosition>>;

    /// Current quote and microstructure for one market.
    async fn get_market(&self, ticker: &str) -> Result<MarketQuote>;

    /// Places an immediate market order; a returned confirmation means
    /// the venue accepted it.
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderConfirmation>;

    /// Account cash balance, used only by balance-driven sizing.
    async fn get_portfolio(&self) -> Result<Portfolio>;
}
