// src/tui/mod.rs
use crate::core::instruments::FIAT_CODE;
use crate::core::traits::ValuationSink;
use crate::types::{AssetValuation, UiEvent};
use crate::utils::precision::{format_balance, format_usd};
use chrono::{DateTime, Local};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table},
    Terminal,
};
use rust_decimal::Decimal;
use std::{cmp::Ordering, io, time::Duration};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const MAX_LOGS: usize = 20;

/// Forwards valuations to the UI without ever blocking the stream loop.
/// If the UI falls behind, the frame is dropped; the next tick carries a full snapshot anyway.
pub struct UiSink {
    tx: mpsc::Sender<UiEvent>,
    ui_gone: bool,
}

impl UiSink {
    pub fn new(tx: mpsc::Sender<UiEvent>) -> Self {
        Self { tx, ui_gone: false }
    }
}

impl ValuationSink for UiSink {
    fn deliver(&mut self, valuations: Vec<AssetValuation>) {
        match self.tx.try_send(UiEvent::Portfolio(valuations)) {
            Ok(_) => {}
            Err(mpsc::error::TrySendError::Full(_)) => debug!("UI busy, dropping frame"),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                if !self.ui_gone {
                    self.ui_gone = true;
                    warn!("Portfolio screen has exited, discarding further valuations");
                }
            }
        }
    }
}

pub struct App {
    pub crypto: Vec<AssetValuation>,
    pub fiat: Option<AssetValuation>,
    pub total: Decimal,
    pub last_update: Option<DateTime<Local>>,
    pub logs: Vec<String>,
}

impl App {
    pub fn new() -> Self {
        Self {
            crypto: Vec::new(),
            fiat: None,
            total: Decimal::ZERO,
            last_update: None,
            logs: Vec::new(),
        }
    }

    pub fn on_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Portfolio(assets) => {
                let (crypto, fiat) = split_portfolio(assets);
                self.total = crypto
                    .iter()
                    .chain(fiat.iter())
                    .fold(Decimal::ZERO, |acc, a| {
                        acc.checked_add(a.usd_value).unwrap_or(Decimal::MAX)
                    });
                self.crypto = crypto;
                self.fiat = fiat;
                self.last_update = Some(Local::now());
            }
            UiEvent::Log(msg) => {
                self.logs.push(msg);
                if self.logs.len() > MAX_LOGS {
                    self.logs.remove(0);
                }
            }
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Separates the fiat row and orders the rest by USD value, largest first.
pub fn split_portfolio(
    assets: Vec<AssetValuation>,
) -> (Vec<AssetValuation>, Option<AssetValuation>) {
    let (fiat, mut crypto): (Vec<_>, Vec<_>) =
        assets.into_iter().partition(|a| a.asset == FIAT_CODE);
    crypto.sort_by(|a, b| {
        b.usd_value
            .cmp(&a.usd_value)
            .then_with(|| a.asset.cmp(&b.asset))
    });
    (crypto, fiat.into_iter().next())
}

pub fn price_color(current: Decimal, previous: Decimal) -> Color {
    match current.cmp(&previous) {
        Ordering::Greater => Color::Green,
        Ordering::Less => Color::Red,
        Ordering::Equal => Color::Reset,
    }
}

/// Draws until the user quits or the sender side goes away.
pub async fn run(mut rx: mpsc::Receiver<UiEvent>) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    rx: &mut mpsc::Receiver<UiEvent>,
) -> anyhow::Result<()> {
    let mut app = App::new();

    loop {
        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                let ctrl_c = key.code == KeyCode::Char('c')
                    && key.modifiers.contains(KeyModifiers::CONTROL);
                if key.kind == KeyEventKind::Press
                    && (ctrl_c || matches!(key.code, KeyCode::Char('q') | KeyCode::Esc))
                {
                    return Ok(());
                }
            }
        }

        loop {
            match rx.try_recv() {
                Ok(event) => app.on_event(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => return Ok(()),
            }
        }
    }
}

fn ui(f: &mut ratatui::Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Length(6),
        ])
        .split(f.size());

    let header = Paragraph::new(Line::from(Span::styled(
        "KRAKEN PORTFOLIO",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    let mut rows: Vec<Row> = app
        .crypto
        .iter()
        .map(|asset| {
            Row::new(vec![
                Cell::from(asset.asset.clone()),
                Cell::from(format_balance(asset.balance)),
                Cell::from(format_usd(asset.price))
                    .style(Style::default().fg(price_color(asset.price, asset.prev_price))),
                Cell::from(format_usd(asset.usd_value)),
            ])
        })
        .collect();

    if let Some(usd) = &app.fiat {
        rows.push(Row::new(vec![Cell::from("─".repeat(6)); 4]).style(Style::default().fg(Color::DarkGray)));
        rows.push(Row::new(vec![
            Cell::from(usd.asset.clone()),
            Cell::from(format!("{:.2}", usd.balance.round_dp(2))),
            Cell::from("-"),
            Cell::from(format_usd(usd.usd_value)),
        ]));
    }

    let widths = [
        Constraint::Length(8),
        Constraint::Length(18),
        Constraint::Length(14),
        Constraint::Min(14),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["ASSET", "BALANCE", "PRICE", "VALUE (USD)"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title("Holdings"));
    f.render_widget(table, chunks[1]);

    let updated = match app.last_update {
        Some(t) => t.format("%H:%M:%S").to_string(),
        None => "waiting for data...".to_string(),
    };
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("TOTAL VALUE: {}", format_usd(app.total)),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  | updated {}  | q / Ctrl+C to exit", updated)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[2]);

    let logs: Vec<ListItem> = app
        .logs
        .iter()
        .rev()
        .map(|s| ListItem::new(Line::from(Span::raw(s))))
        .collect();
    let logs_list =
        List::new(logs).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(logs_list, chunks[3]);
}
