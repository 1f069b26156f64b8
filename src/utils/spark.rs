// src/utils/spark.rs

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Renders a price series as a unicode sparkline for the dashboard.
/// A flat series renders as mid-height bars.
pub fn sparkline(prices: &[f64]) -> String {
    if prices.is_empty() {
        return String::new();
    }
    let min = prices.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    prices
        .iter()
        .map(|p| {
            if range <= f64::EPSILON {
                BARS[3]
            } else {
                let idx = ((p - min) / range * (BARS.len() - 1) as f64).round() as usize;
                BARS[idx.min(BARS.len() - 1)]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_is_empty() {
        assert_eq!(sparkline(&[]), "");
    }

    #[test]
    fn flat_series_uses_mid_bar() {
        assert_eq!(sparkline(&[0.5, 0.5, 0.5]), "▄▄▄");
    }

    #[test]
    fn extremes_hit_first_and_last_bar() {
        let s = sparkline(&[0.1, 0.9]);
        let chars: Vec<char> = s.chars().collect();
        assert_eq!(chars[0], '▁');
        assert_eq!(chars[1], '█');
    }
}
