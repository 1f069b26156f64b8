// src/core/engine.rs
//
// One poll cycle: fetch positions -> update tracking -> compute signals ->
// decide exits -> act -> hand rows to the dashboard. Cycles run strictly
// sequentially; the only suspension points are the inter-cycle sleep and
// the blocking brokerage calls themselves. A cycle error is never fatal:
// it is logged and followed by a short backoff before the next attempt.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::connectors::traits::Brokerage;
use crate::core::exit::{ExitInputs, ExitPolicy, ExitReason};
use crate::core::gate::EntryGate;
use crate::core::signal;
use crate::core::sizing::{self, SizingStrategy};
use crate::core::tracker::{Admission, PositionTracker};
use crate::storage::TradeLog;
use crate::types::{AccountPosition, DashboardRow, OrderRequest, RowStatus, UiEvent};
use crate::utils::money::{infer_entry_price, pnl_pct};
use crate::utils::spark::sparkline;

/// Episode fields copied out for one evaluation, so the tracker borrow
/// does not outlive the decision.
struct EpisodeSnapshot {
    title: String,
    shares: u32,
    entry_price: f64,
    peak_price: f64,
    hold_secs: i64,
    sold: bool,
    prices: Vec<f64>,
}

pub struct TradingEngine<B> {
    config: AppConfig,
    client: B,
    tracker: PositionTracker,
    gate: EntryGate,
    policy: ExitPolicy,
    sizing: Box<dyn SizingStrategy>,
    trade_log: TradeLog,
    ui_sender: mpsc::Sender<UiEvent>,
    live_mode: bool,
}

impl<B> TradingEngine<B>
where
    B: Brokerage,
{
    pub fn new(config: AppConfig, client: B, ui_sender: mpsc::Sender<UiEvent>) -> Self {
        let gate = EntryGate::from_config(&config);
        let policy = ExitPolicy::from_config(&config);
        let sizing = sizing::from_config(&config);
        let trade_log = TradeLog::new(&config.log_file, config.live_trading);
        let tracker = PositionTracker::new(config.rolling_window);
        let live_mode = config.live_trading;
        Self {
            config,
            client,
            tracker,
            gate,
            policy,
            sizing,
            trade_log,
            ui_sender,
            live_mode,
        }
    }

    fn send_ui_event(&self, event: UiEvent) {
        match self.ui_sender.try_send(event) {
            Ok(_) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("UI channel closed; interface is likely dead");
            }
        }
    }

    /// Main loop. Exits only on Ctrl+C, between cycles, without forcing
    /// a final liquidation of open positions.
    pub async fn run(&mut self) -> Result<()> {
        info!("engine loop running, live mode: {}", self.live_mode);
        let poll = Duration::from_secs_f64(self.config.poll_interval_secs.max(0.1));
        let backoff = Duration::from_secs(self.config.error_backoff_secs);

        loop {
            let delay = match self.cycle().await {
                Ok(()) => poll,
                Err(e) => {
                    error!("cycle failed: {e:#}");
                    self.send_ui_event(UiEvent::Log(format!("cycle error: {e:#}")));
                    backoff
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, stopping without liquidating");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
        Ok(())
    }

    /// One full poll over the reported position set.
    async fn cycle(&mut self) -> Result<()> {
        let account_positions = self.client.get_positions().await?;
        let now = Utc::now();

        let mut reported = HashSet::new();
        let mut rows: Vec<DashboardRow> = Vec::new();

        for account in &account_positions {
            let shares = account.position.unsigned_abs().min(u32::MAX as u64) as u32;
            if shares == 0 {
                continue;
            }
            reported.insert(account.ticker.clone());

            // A single bad position never aborts the cycle.
            if let Err(e) = self.manage_position(account, shares, now, &mut rows).await {
                warn!(ticker = %account.ticker, "position skipped this cycle: {e:#}");
            }
        }

        // Positions the account stopped reporting were closed externally.
        self.tracker.prune_missing(&reported);

        PositionTracker::sort_rows(&mut rows);
        self.send_ui_event(UiEvent::Positions(rows));
        Ok(())
    }

    async fn manage_position(
        &mut self,
        account: &AccountPosition,
        shares: u32,
        now: DateTime<Utc>,
        rows: &mut Vec<DashboardRow>,
    ) -> Result<()> {
        let ticker = account.ticker.as_str();
        let quote = self.client.get_market(ticker).await?;

        // A missing or zero bid is a data anomaly, not an error: hold the
        // position and try again next poll.
        let Some(current) = quote.yes_bid.filter(|p| *p > 0.0) else {
            debug!(ticker, "no usable bid this poll");
            return Ok(());
        };

        if !self.tracker.contains(ticker) {
            let entry = infer_entry_price(account.market_exposure as f64, shares);
            if let Err(reject) = self.gate.admit(&quote, now) {
                debug!(ticker, %reject, "not admitted for tracking");
                return Ok(());
            }

            let balance = if self.sizing.needs_balance() {
                match self.client.get_portfolio().await {
                    Ok(portfolio) => Some(portfolio.cash_balance),
                    Err(e) => {
                        warn!("portfolio fetch failed, sizing without balance: {e:#}");
                        None
                    }
                }
            } else {
                None
            };
            let tracked = self.sizing.shares_for_entry(shares, entry, balance);

            if self.tracker.admit(ticker, &quote.title, tracked, entry, now)
                == Admission::LoggedNew
            {
                info!(ticker, entry, tracked, "new position under management");
                if let Err(e) = self.trade_log.log_new_position(ticker, &quote.title, entry) {
                    warn!("trade log write failed: {e:#}");
                }
                self.send_ui_event(UiEvent::Log(format!(
                    "tracking {ticker} ({tracked} @ ${entry:.2})"
                )));
            }
        }

        let snapshot = {
            let pos = self
                .tracker
                .observe(ticker, current, shares)
                .ok_or_else(|| anyhow::anyhow!("episode missing after admission"))?;
            EpisodeSnapshot {
                title: pos.title.clone(),
                shares: pos.shares,
                entry_price: pos.entry_price,
                peak_price: pos.peak_price,
                hold_secs: pos.hold_secs(now),
                sold: pos.sold,
                prices: pos.history.prices(),
            }
        };

        // Terminal within the episode: never re-evaluate a sold position.
        if snapshot.sold {
            return Ok(());
        }

        let deviation = signal::deviation(current, &snapshot.prices);
        let threshold = signal::dynamic_threshold(
            &snapshot.prices,
            self.config.deviation_threshold_pct,
            self.config.volatility_threshold_enabled,
            self.config.volatility_multiplier,
        );
        let pnl = pnl_pct(snapshot.entry_price, current);

        let inputs = ExitInputs {
            current_price: current,
            entry_price: snapshot.entry_price,
            pnl_pct: pnl,
            deviation_pct: deviation.pct(),
            threshold_pct: threshold,
            hold_secs: snapshot.hold_secs,
        };

        if let Some(reason) = self.policy.evaluate(&inputs) {
            if self.execute_exit(ticker, &snapshot, current, pnl, &reason).await {
                self.tracker.mark_sold(ticker);
                self.tracker.remove(ticker);
                return Ok(());
            }
            // Execution failed: stay TRACKING, re-evaluate next poll.
        }

        rows.push(DashboardRow {
            ticker: ticker.to_string(),
            title: snapshot.title,
            entry: snapshot.entry_price,
            now: current,
            median: deviation.median_or(current),
            peak: snapshot.peak_price,
            deviation_pct: deviation.pct(),
            pnl_pct: pnl,
            hold_minutes: snapshot.hold_secs as f64 / 60.0,
            sparkline: sparkline(&snapshot.prices),
            status: if snapshot.hold_secs < self.config.min_hold_secs as i64 {
                RowStatus::Warmup
            } else {
                RowStatus::Tracking
            },
        });
        Ok(())
    }

    /// Returns true only when the order is confirmed (or simulated).
    async fn execute_exit(
        &self,
        ticker: &str,
        snapshot: &EpisodeSnapshot,
        current: f64,
        pnl: f64,
        reason: &ExitReason,
    ) -> bool {
        let reason_text = reason.to_string();

        if !self.live_mode {
            info!(ticker, shares = snapshot.shares, %reason_text, "SIMULATED SELL");
            self.send_ui_event(UiEvent::Log(format!(
                "SIMULATED SELL {ticker} {} - {reason_text}",
                snapshot.shares
            )));
            self.record_exit(ticker, snapshot, current, pnl, &reason_text);
            return true;
        }

        let request = OrderRequest::market_sell(ticker, snapshot.shares);
        match self.client.create_order(&request).await {
            Ok(confirmation) => {
                info!(
                    ticker,
                    shares = snapshot.shares,
                    order_id = %confirmation.order_id,
                    %reason_text,
                    "LIVE SELL confirmed"
                );
                self.send_ui_event(UiEvent::Log(format!(
                    "LIVE SELL {ticker} {} - {reason_text}",
                    snapshot.shares
                )));
                self.record_exit(ticker, snapshot, current, pnl, &reason_text);
                true
            }
            Err(e) => {
                error!(ticker, "order failed: {e:#}");
                self.send_ui_event(UiEvent::Log(format!("order failed for {ticker}: {e:#}")));
                false
            }
        }
    }

    fn record_exit(
        &self,
        ticker: &str,
        snapshot: &EpisodeSnapshot,
        exit_price: f64,
        pnl: f64,
        reason: &str,
    ) {
        if let Err(e) = self.trade_log.log_exit(
            ticker,
            &snapshot.title,
            snapshot.entry_price,
            exit_price,
            pnl,
            reason,
        ) {
            warn!("trade log write failed: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketQuote, OrderConfirmation, Portfolio};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockBrokerage {
        positions: Mutex<Vec<AccountPosition>>,
        quote: Mutex<MarketQuote>,
        fail_orders: Mutex<bool>,
        orders_placed: Mutex<Vec<OrderRequest>>,
    }

    impl MockBrokerage {
        fn new(position: AccountPosition, quote: MarketQuote) -> Self {
            Self {
                positions: Mutex::new(vec![position]),
                quote: Mutex::new(quote),
                fail_orders: Mutex::new(false),
                orders_placed: Mutex::new(Vec::new()),
            }
        }

        fn set_bid(&self, bid: f64) {
            self.quote.lock().unwrap().yes_bid = Some(bid);
        }
    }

    #[async_trait]
    impl Brokerage for &MockBrokerage {
        async fn get_positions(&self) -> Result<Vec<AccountPosition>> {
            Ok(self.positions.lock().unwrap().clone())
        }

        async fn get_market(&self, _ticker: &str) -> Result<MarketQuote> {
            Ok(self.quote.lock().unwrap().clone())
        }

        async fn create_order(&self, request: &OrderRequest) -> Result<OrderConfirmation> {
            self.orders_placed.lock().unwrap().push(request.clone());
            if *self.fail_orders.lock().unwrap() {
                return Err(anyhow!("venue rejected order"));
            }
            Ok(OrderConfirmation {
                order_id: "ord-1".into(),
                status: "executed".into(),
            })
        }

        async fn get_portfolio(&self) -> Result<Portfolio> {
            Ok(Portfolio { cash_balance: 1000.0 })
        }
    }

    fn test_config(log_name: &str) -> AppConfig {
        let mut cfg = AppConfig::new().expect("defaults");
        cfg.log_file = std::env::temp_dir()
            .join(format!("engine-test-{log_name}-{}.csv", std::process::id()))
            .to_string_lossy()
            .into_owned();
        // take-profit math must be deterministic in tests
        cfg.volatility_threshold_enabled = false;
        // high enough that the partial 3-sample history does not fire early
        cfg.deviation_threshold_pct = 10.0;
        cfg.live_trading = true;
        cfg
    }

    fn account_position() -> AccountPosition {
        AccountPosition {
            ticker: "KXTEST".into(),
            position: 10,
            // 500 cents for 10 shares -> entry $0.50
            market_exposure: 500,
        }
    }

    fn open_quote(bid: f64) -> MarketQuote {
        MarketQuote {
            ticker: "KXTEST".into(),
            title: "Test market".into(),
            yes_bid: Some(bid),
            yes_ask: Some(bid + 0.01),
            open_interest: Some(500),
            volume: None,
            close_time: None,
        }
    }

    fn cleanup(cfg: &AppConfig) {
        let _ = std::fs::remove_file(&cfg.log_file);
    }

    #[tokio::test]
    async fn admitted_position_produces_a_row() {
        let cfg = test_config("row");
        let mock = MockBrokerage::new(account_position(), open_quote(0.50));
        let (tx, mut rx) = mpsc::channel(100);
        let mut engine = TradingEngine::new(cfg.clone(), &mock, tx);

        engine.cycle().await.unwrap();

        assert!(engine.tracker.contains("KXTEST"));
        let rows = loop {
            match rx.try_recv().unwrap() {
                UiEvent::Positions(rows) => break rows,
                UiEvent::Log(_) => continue,
            }
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ticker, "KXTEST");
        assert_eq!(rows[0].status, RowStatus::Warmup);
        cleanup(&cfg);
    }

    #[tokio::test]
    async fn gate_rejection_skips_admission() {
        let cfg = test_config("gate");
        let mut quote = open_quote(0.50);
        quote.open_interest = Some(10); // below the default minimum of 100
        let mock = MockBrokerage::new(account_position(), quote);
        let (tx, _rx) = mpsc::channel(100);
        let mut engine = TradingEngine::new(cfg.clone(), &mock, tx);

        engine.cycle().await.unwrap();
        assert!(engine.tracker.is_empty());
        cleanup(&cfg);
    }

    #[tokio::test]
    async fn take_profit_exit_clears_tracking() {
        let cfg = test_config("tp");
        let mock = MockBrokerage::new(account_position(), open_quote(0.50));
        let (tx, _rx) = mpsc::channel(100);
        let mut engine = TradingEngine::new(cfg.clone(), &mock, tx);

        // build history [0.50, 0.51, 0.55], then jump to 0.60:
        // median 0.53, deviation ~13.2% >= 10% threshold, pnl +20%
        for bid in [0.50, 0.51, 0.55] {
            mock.set_bid(bid);
            engine.cycle().await.unwrap();
            assert!(engine.tracker.contains("KXTEST"));
        }
        mock.set_bid(0.60);
        engine.cycle().await.unwrap();

        let orders = mock.orders_placed.lock().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].count, 10);
        assert!(!engine.tracker.contains("KXTEST"));
        cleanup(&cfg);
    }

    #[tokio::test]
    async fn failed_order_keeps_episode_tracking() {
        let cfg = test_config("fail");
        let mock = MockBrokerage::new(account_position(), open_quote(0.50));
        *mock.fail_orders.lock().unwrap() = true;
        let (tx, _rx) = mpsc::channel(100);
        let mut engine = TradingEngine::new(cfg.clone(), &mock, tx);

        for bid in [0.50, 0.51, 0.55] {
            mock.set_bid(bid);
            engine.cycle().await.unwrap();
        }
        mock.set_bid(0.60);
        engine.cycle().await.unwrap();
        // rejected: still tracked, retried on a later poll
        assert!(engine.tracker.contains("KXTEST"));

        // price keeps running, the signal stays armed, the retry also fails
        mock.set_bid(0.70);
        engine.cycle().await.unwrap();

        assert_eq!(mock.orders_placed.lock().unwrap().len(), 2);
        assert!(engine.tracker.contains("KXTEST"));
        cleanup(&cfg);
    }

    #[tokio::test]
    async fn vanished_position_is_pruned() {
        let cfg = test_config("prune");
        let mock = MockBrokerage::new(account_position(), open_quote(0.50));
        let (tx, _rx) = mpsc::channel(100);
        let mut engine = TradingEngine::new(cfg.clone(), &mock, tx);

        engine.cycle().await.unwrap();
        assert!(engine.tracker.contains("KXTEST"));

        mock.positions.lock().unwrap().clear();
        engine.cycle().await.unwrap();
        assert!(engine.tracker.is_empty());
        cleanup(&cfg);
    }

    #[tokio::test]
    async fn zero_bid_holds_without_evaluation() {
        let cfg = test_config("zerobid");
        let mock = MockBrokerage::new(account_position(), open_quote(0.50));
        let (tx, _rx) = mpsc::channel(100);
        let mut engine = TradingEngine::new(cfg.clone(), &mock, tx);

        engine.cycle().await.unwrap();
        mock.quote.lock().unwrap().yes_bid = None;
        engine.cycle().await.unwrap();

        // still tracked, no orders attempted
        assert!(engine.tracker.contains("KXTEST"));
        assert!(mock.orders_placed.lock().unwrap().is_empty());
        cleanup(&cfg);
    }
}
