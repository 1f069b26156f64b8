// src/core/tracker.rs
//
// Episode lifecycle state for every actively managed ticker. All per-ticker
// mutation funnels through this map; clearing an episode is a single record
// removal rather than a sweep over parallel dictionaries.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::core::history::PriceHistory;
use crate::types::DashboardRow;

/// One tracking episode: from first observation to confirmed exit.
#[derive(Debug, Clone)]
pub struct Position {
    pub ticker: String,
    pub title: String,
    pub shares: u32,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub peak_price: f64,
    pub history: PriceHistory,
    /// Set once an exit order is confirmed; terminal for the episode.
    pub sold: bool,
}

impl Position {
    pub fn hold_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.entry_time).num_seconds()
    }
}

/// Whether an admitted ticker should be logged as a new position.
/// The `known` mark survives an exit so a residual holding the account
/// still reports does not get re-logged as new.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    LoggedNew,
    AlreadyKnown,
}

#[derive(Default)]
pub struct PositionTracker {
    window: usize,
    positions: HashMap<String, Position>,
    known: HashSet<String>,
}

impl PositionTracker {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            positions: HashMap::new(),
            known: HashSet::new(),
        }
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.positions.contains_key(ticker)
    }

    pub fn position(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(ticker)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Starts a fresh episode. Entry price and time are fixed at first
    /// observation; history and peak start from scratch.
    pub fn admit(
        &mut self,
        ticker: &str,
        title: &str,
        shares: u32,
        entry_price: f64,
        now: DateTime<Utc>,
    ) -> Admission {
        self.positions.insert(
            ticker.to_string(),
            Position {
                ticker: ticker.to_string(),
                title: title.to_string(),
                shares,
                entry_price,
                entry_time: now,
                peak_price: entry_price,
                history: PriceHistory::new(self.window),
                sold: false,
            },
        );
        if self.known.insert(ticker.to_string()) {
            Admission::LoggedNew
        } else {
            Admission::AlreadyKnown
        }
    }

    /// Records a price observation for a tracked ticker: appends to the
    /// rolling history, raises the peak, and syncs the share count. The
    /// count can shrink (partial external close) but never grow within an
    /// episode; added contracts are a separate purchase, not this episode.
    pub fn observe(&mut self, ticker: &str, current: f64, account_shares: u32) -> Option<&Position> {
        let pos = self.positions.get_mut(ticker)?;
        pos.history.push(current);
        if current > pos.peak_price {
            pos.peak_price = current;
        }
        pos.shares = pos.shares.min(account_shares);
        Some(pos)
    }

    pub fn mark_sold(&mut self, ticker: &str) {
        if let Some(pos) = self.positions.get_mut(ticker) {
            pos.sold = true;
        }
    }

    /// Discards an episode. The `known` mark stays so a residual position
    /// the account still reports is not re-logged as new.
    pub fn remove(&mut self, ticker: &str) {
        self.positions.remove(ticker);
    }

    /// Drops episodes for tickers the account no longer reports (closed
    /// externally). Their `known` marks go too: a genuine re-entry later
    /// is a brand-new position and should be logged as one.
    pub fn prune_missing(&mut self, reported: &HashSet<String>) {
        self.positions.retain(|ticker, _| reported.contains(ticker));
        self.known.retain(|ticker| reported.contains(ticker));
    }

    /// Descending unrealized PnL; presentational only.
    pub fn sort_rows(rows: &mut [DashboardRow]) {
        rows.sort_by(|a, b| {
            b.pnl_pct
                .partial_cmp(&a.pnl_pct)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowStatus;

    fn row(ticker: &str, pnl: f64) -> DashboardRow {
        DashboardRow {
            ticker: ticker.into(),
            title: String::new(),
            entry: 0.5,
            now: 0.5,
            median: 0.5,
            peak: 0.5,
            deviation_pct: 0.0,
            pnl_pct: pnl,
            hold_minutes: 1.0,
            sparkline: String::new(),
            status: RowStatus::Tracking,
        }
    }

    #[test]
    fn first_admission_logs_as_new() {
        let mut t = PositionTracker::new(15);
        let now = Utc::now();
        assert_eq!(t.admit("KXA", "A", 10, 0.50, now), Admission::LoggedNew);
        assert!(t.contains("KXA"));
    }

    #[test]
    fn residual_after_exit_is_not_relogged() {
        let mut t = PositionTracker::new(15);
        let now = Utc::now();
        t.admit("KXA", "A", 10, 0.50, now);
        t.mark_sold("KXA");
        t.remove("KXA");
        assert!(!t.contains("KXA"));
        // account still reports a residual -> fresh episode, no new-position log
        assert_eq!(t.admit("KXA", "A", 2, 0.50, now), Admission::AlreadyKnown);
    }

    #[test]
    fn reentry_after_prune_is_a_new_episode() {
        let mut t = PositionTracker::new(15);
        let now = Utc::now();
        t.admit("KXA", "A", 10, 0.50, now);
        t.prune_missing(&HashSet::new());
        assert!(t.is_empty());
        assert_eq!(t.admit("KXA", "A", 10, 0.55, now), Admission::LoggedNew);
    }

    #[test]
    fn peak_never_decreases() {
        let mut t = PositionTracker::new(15);
        t.admit("KXA", "A", 10, 0.50, Utc::now());
        t.observe("KXA", 0.55, 10);
        t.observe("KXA", 0.52, 10);
        let pos = t.position("KXA").unwrap();
        assert!((pos.peak_price - 0.55).abs() < 1e-9);
        assert_eq!(pos.history.prices(), vec![0.55, 0.52]);
    }

    #[test]
    fn shares_shrink_but_never_grow() {
        let mut t = PositionTracker::new(15);
        t.admit("KXA", "A", 10, 0.50, Utc::now());
        t.observe("KXA", 0.50, 6);
        assert_eq!(t.position("KXA").unwrap().shares, 6);
        t.observe("KXA", 0.50, 20);
        assert_eq!(t.position("KXA").unwrap().shares, 6);
    }

    #[test]
    fn fresh_episode_resets_state() {
        let mut t = PositionTracker::new(15);
        let now = Utc::now();
        t.admit("KXA", "A", 10, 0.50, now);
        t.observe("KXA", 0.80, 10);
        t.remove("KXA");
        t.admit("KXA", "A", 10, 0.40, now);
        let pos = t.position("KXA").unwrap();
        assert!((pos.peak_price - 0.40).abs() < 1e-9);
        assert!(pos.history.is_empty());
        assert!(!pos.sold);
    }

    #[test]
    fn sold_marker_is_visible() {
        let mut t = PositionTracker::new(15);
        t.admit("KXA", "A", 10, 0.50, Utc::now());
        t.mark_sold("KXA");
        assert!(t.position("KXA").unwrap().sold);
    }

    #[test]
    fn rows_sort_by_descending_pnl() {
        let mut rows = vec![row("A", -5.0), row("B", 12.0), row("C", 3.0)];
        PositionTracker::sort_rows(&mut rows);
        let order: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
    }
}
