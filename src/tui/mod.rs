// src/tui/mod.rs
use crate::types::{DashboardRow, UiEvent};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table},
    Terminal,
};
use std::{io, time::Duration};
use tokio::sync::mpsc;

const MAX_LOG_LINES: usize = 50;

pub struct App {
    pub live_mode: bool,
    pub rows: Vec<DashboardRow>,
    pub logs: Vec<String>,
}

impl App {
    pub fn new(live_mode: bool) -> Self {
        Self {
            live_mode,
            rows: Vec::new(),
            logs: Vec::new(),
        }
    }

    pub fn on_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Positions(rows) => {
                self.rows = rows;
            }
            UiEvent::Log(msg) => {
                self.logs.push(msg);
                if self.logs.len() > MAX_LOG_LINES {
                    self.logs.remove(0);
                }
            }
        }
    }
}

pub async fn run(mut rx: mpsc::Receiver<UiEvent>, live_mode: bool) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(live_mode);

    loop {
        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if let KeyCode::Char('q') = key.code {
                    break;
                }
            }
        }

        while let Ok(event) = rx.try_recv() {
            app.on_event(event);
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}

fn ui(f: &mut ratatui::Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(10),
            ]
            .as_ref(),
        )
        .split(f.size());

    let mode = if app.live_mode {
        Span::styled("LIVE", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("SIMULATED", Style::default().fg(Color::Yellow))
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "Median Reversion Bot",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | Mode: "),
        mode,
        Span::raw(format!(" | Positions: {}", app.rows.len())),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(header, chunks[0]);

    f.render_widget(positions_table(&app.rows), chunks[1]);

    let logs: Vec<ListItem> = app
        .logs
        .iter()
        .rev()
        .map(|s| ListItem::new(Line::from(Span::raw(s.clone()))))
        .collect();
    let logs_list =
        List::new(logs).block(Block::default().borders(Borders::ALL).title("Events"));
    f.render_widget(logs_list, chunks[2]);
}

fn positions_table(rows: &[DashboardRow]) -> Table<'_> {
    let header = Row::new(vec![
        "Ticker", "Entry", "Now", "Median", "Peak", "Dev%", "PnL%", "Hold", "Trend", "Status",
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let body: Vec<Row> = rows
        .iter()
        .map(|r| {
            let pnl_style = if r.pnl_pct >= 0.0 {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Red)
            };
            Row::new(vec![
                Cell::from(r.ticker.clone()),
                Cell::from(format!("${:.2}", r.entry)),
                Cell::from(format!("${:.2}", r.now)),
                Cell::from(format!("${:.2}", r.median)),
                Cell::from(format!("${:.2}", r.peak)),
                Cell::from(format!("{:+.2}%", r.deviation_pct)),
                Cell::from(Span::styled(format!("{:+.1}%", r.pnl_pct), pnl_style)),
                Cell::from(format!("{:.1}m", r.hold_minutes)),
                Cell::from(r.sparkline.clone()),
                Cell::from(r.status.to_string()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(22),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(16),
        Constraint::Length(9),
    ];

    Table::new(body, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Positions"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowStatus;

    #[test]
    fn log_buffer_is_bounded() {
        let mut app = App::new(false);
        for i in 0..(MAX_LOG_LINES + 10) {
            app.on_event(UiEvent::Log(format!("line {i}")));
        }
        assert_eq!(app.logs.len(), MAX_LOG_LINES);
        assert_eq!(app.logs.last().unwrap(), &format!("line {}", MAX_LOG_LINES + 9));
    }

    #[test]
    fn positions_event_replaces_rows() {
        let mut app = App::new(false);
        let row = DashboardRow {
            ticker: "KXA".into(),
            title: "A".into(),
            entry: 0.5,
            now: 0.55,
            median: 0.52,
            peak: 0.56,
            deviation_pct: 5.8,
            pnl_pct: 10.0,
            hold_minutes: 3.0,
            sparkline: "▁▄█".into(),
            status: RowStatus::Tracking,
        };
        app.on_event(UiEvent::Positions(vec![row]));
        assert_eq!(app.rows.len(), 1);
        app.on_event(UiEvent::Positions(vec![]));
        assert!(app.rows.is_empty());
    }
}
