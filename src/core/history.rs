// src/core/history.rs
use std::collections::VecDeque;

/// Bounded price history for one tracked ticker, oldest evicted first.
/// Owned by the position record; no state is shared across tickers.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    prices: VecDeque<f64>,
    capacity: usize,
}

impl PriceHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            prices: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    /// Appends an observation, evicting the oldest once over capacity.
    pub fn push(&mut self, price: f64) {
        self.prices.push_back(price);
        while self.prices.len() > self.capacity {
            self.prices.pop_front();
        }
    }

    /// Ordered prices, oldest to newest.
    pub fn prices(&self) -> Vec<f64> {
        self.prices.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn clear(&mut self) {
        self.prices.clear();
    }
}
