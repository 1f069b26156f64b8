// src/storage/mod.rs
//
// Append-only CSV trade log: one line per lifecycle event (new position
// observed, exit executed). The header is written once, when the file is
// first created.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

/// Exit-price column for new-position rows.
const NEW_POSITION_SENTINEL: &str = "--";

const HEADER: [&str; 8] = [
    "Timestamp", "Ticker", "Title", "Entry", "Exit", "PnL%", "Reason", "Mode",
];

pub struct TradeLog {
    path: PathBuf,
    live_mode: bool,
}

impl TradeLog {
    pub fn new(path: impl AsRef<Path>, live_mode: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            live_mode,
        }
    }

    pub fn log_new_position(&self, ticker: &str, title: &str, entry: f64) -> Result<()> {
        self.append(
            ticker,
            title,
            &format!("${entry:.2}"),
            NEW_POSITION_SENTINEL,
            "",
            "new position",
        )
    }

    pub fn log_exit(
        &self,
        ticker: &str,
        title: &str,
        entry: f64,
        exit: f64,
        pnl_pct: f64,
        reason: &str,
    ) -> Result<()> {
        self.append(
            ticker,
            title,
            &format!("${entry:.2}"),
            &format!("${exit:.2}"),
            &format!("{pnl_pct:.1}%"),
            reason,
        )
    }

    fn append(
        &self,
        ticker: &str,
        title: &str,
        entry: &str,
        exit: &str,
        pnl: &str,
        reason: &str,
    ) -> Result<()> {
        let new_file = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening trade log {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if new_file {
            writer.write_record(HEADER)?;
        }

        let timestamp = Local::now().format("%Y-%m-%d %I:%M:%S %p").to_string();
        let mode = if self.live_mode { "LIVE" } else { "SIMULATED" };
        writer.write_record([timestamp.as_str(), ticker, title, entry, exit, pnl, reason, mode])?;
        writer.flush()?;
        Ok(())
    }
}
