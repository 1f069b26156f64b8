// src/core/signal.rs
//
// Rolling-median reversion signal. All calculations are total: below the
// minimum sample count the result is an explicit degenerate case, never
// an error, so a thin history can never abort a poll cycle.

/// Minimum samples before median/volatility are considered meaningful.
pub const MIN_SAMPLES: usize = 3;

/// Outcome of a deviation calculation. `Insufficient` is a policy branch,
/// not an error: callers substitute the latest price for the median and
/// treat the deviation as zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deviation {
    Computed { median: f64, pct: f64 },
    Insufficient,
}

impl Deviation {
    /// Deviation percentage, zero in the degenerate case.
    pub fn pct(&self) -> f64 {
        match self {
            Deviation::Computed { pct, .. } => *pct,
            Deviation::Insufficient => 0.0,
        }
    }

    /// Median for display, falling back to the given price.
    pub fn median_or(&self, fallback: f64) -> f64 {
        match self {
            Deviation::Computed { median, .. } => *median,
            Deviation::Insufficient => fallback,
        }
    }
}

/// Statistical median; `None` below [`MIN_SAMPLES`].
pub fn median(prices: &[f64]) -> Option<f64> {
    if prices.len() < MIN_SAMPLES {
        return None;
    }
    let mut sorted = prices.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Signed percentage distance of `current` from the rolling median.
/// A zero median yields a zero deviation (divide-by-zero guard).
pub fn deviation(current: f64, prices: &[f64]) -> Deviation {
    match median(prices) {
        Some(med) => {
            let pct = if med != 0.0 {
                (current - med) / med * 100.0
            } else {
                0.0
            };
            Deviation::Computed { median: med, pct }
        }
        None => Deviation::Insufficient,
    }
}

/// Coefficient of variation (sample stddev / mean); zero below
/// [`MIN_SAMPLES`] or when the mean is zero.
pub fn volatility(prices: &[f64]) -> f64 {
    if prices.len() < MIN_SAMPLES {
        return 0.0;
    }
    let n = prices.len() as f64;
    let mean = prices.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt() / mean
}

/// Deviation threshold scaled up with recent dispersion: in a noisier
/// market a small reversion is noise, so the exit bar rises.
/// Returns `base_pct` unchanged when adjustment is disabled or the
/// history is too short.
pub fn dynamic_threshold(prices: &[f64], base_pct: f64, enabled: bool, multiplier: f64) -> f64 {
    if !enabled || prices.len() < MIN_SAMPLES {
        return base_pct;
    }
    let vol_pct = volatility(prices) * 100.0;
    base_pct * (1.0 + vol_pct / 100.0 * multiplier)
}
