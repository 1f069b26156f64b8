// src/main.rs
use crate::config::AppConfig;
use crate::connectors::kalshi::KalshiClient;
use crate::core::engine::TradingEngine;
use dotenvy::dotenv;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod connectors;
mod core;
mod storage;
mod tui;
mod types;
mod utils;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 1. Load Configuration
    let config = AppConfig::new()?;

    // 2. Logging goes to a file; the dashboard owns the terminal
    let file_appender = tracing_appender::rolling::daily("logs", "reversion-bot.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    println!("========================================");
    println!("      MEDIAN REVERSION BOT - v0.1.0");
    println!("========================================");
    println!(
        "Mode:   {}",
        if config.live_trading {
            "🚨 LIVE TRADING"
        } else {
            "📝 SIMULATED"
        }
    );
    println!("Window: {} | Threshold: {}%", config.rolling_window, config.deviation_threshold_pct);
    println!("========================================");

    // 3. Initialize Components
    let client = KalshiClient::from_env()?;
    let live_mode = config.live_trading;

    // 4. Create Channels
    let (ui_tx, ui_rx) = mpsc::channel(100);

    // 5. Run dashboard task and engine loop
    let mut ui_task = tokio::spawn(tui::run(ui_rx, live_mode));
    let mut engine = TradingEngine::new(config, client, ui_tx);

    tokio::select! {
        result = engine.run() => {
            ui_task.abort();
            if let Err(e) = result {
                eprintln!("Fatal Engine Error: {}", e);
            }
        }
        _ = &mut ui_task => {
            info!("dashboard closed, stopping engine");
        }
    }

    Ok(())
}
