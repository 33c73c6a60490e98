use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};
use tracing::{error, info};

use pizza_radar::config::RadarConfig;
use pizza_radar::fake_population::fake_population;
use pizza_radar::ingest;
use pizza_radar::logging;
use pizza_radar::percentile::{PercentileScore, ScoreOutcome};
use pizza_radar::pizza::performance_band;
use pizza_radar::position::describe_groups;
use pizza_radar::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "pizza_radar", about = "Percentile radar terminal")]
struct Args {
    /// Player export (CSV). Falls back to PIZZA_DATA / the config file.
    data: Option<PathBuf>,
    /// Run on a synthetic population instead of an export.
    #[arg(long)]
    demo: bool,
    /// Where SVG and xlsx exports are written.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

struct App {
    state: AppState,
    out_dir: PathBuf,
    should_quit: bool,
}

impl App {
    fn new(state: AppState, out_dir: PathBuf) -> Self {
        Self {
            state,
            out_dir,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.search_active {
            self.on_search_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('t') | KeyCode::Char('T') => self.state.cycle_template(),
            KeyCode::Char('p') | KeyCode::Char('P') => {
                self.state.cycle_scope();
                let label = self.state.scope_label();
                self.state.push_log(format!("[INFO] Sample scope: {label}"));
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                let res = self.state.export_svg(&self.out_dir);
                self.report_export(res);
            }
            KeyCode::Char('e') | KeyCode::Char('E') => {
                let res = self.state.export_xlsx(&self.out_dir);
                self.report_export(res);
            }
            KeyCode::Char('/') => self.state.search_active = true,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn on_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.state.search_active = false,
            KeyCode::Backspace => {
                let mut search = self.state.search.clone();
                search.pop();
                self.state.set_search(search);
            }
            KeyCode::Char(c) => {
                let mut search = self.state.search.clone();
                search.push(c);
                self.state.set_search(search);
            }
            _ => {}
        }
    }

    fn report_export(&mut self, res: Result<PathBuf>) {
        match res {
            Ok(path) => info!(path = %path.display(), "export written"),
            Err(err) => {
                error!("export failed: {err:#}");
                self.state.push_log(format!("[WARN] Export failed: {err:#}"));
            }
        }
    }
}

fn load_state(args: &Args) -> Result<AppState> {
    let mut config = RadarConfig::from_env()?;
    if let Some(path) = &args.data {
        config.data_path = Some(path.clone());
    }
    if args.demo {
        return Ok(AppState::new(fake_population(1500, 26), config, "demo population"));
    }
    let path = config
        .data_path
        .clone()
        .context("no export given: pass a CSV path, set PIZZA_DATA, or use --demo")?;
    let (population, report) = ingest::load_population(&path, config.header_style)?;
    let mut state = AppState::new(population, config, path.display().to_string());
    if report.rows_skipped > 0 {
        state.push_log(format!("[WARN] Skipped {} rows without a player", report.rows_skipped));
    }
    if !report.unmapped_columns.is_empty() {
        state.push_log(format!(
            "[INFO] {} unmapped columns ignored",
            report.unmapped_columns.len()
        ));
    }
    Ok(state)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_path = std::env::var("PIZZA_LOG_FILE")
        .unwrap_or_else(|_| logging::DEFAULT_LOG_FILE.to_string());
    logging::init_file(Path::new(&log_path))?;

    let state = load_state(&args)?;
    let mut app = App::new(state, args.out_dir.clone());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(40)])
        .split(chunks[1]);
    render_player_list(frame, columns[0], &app.state);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(8)])
        .split(columns[1]);
    render_percentiles(frame, right[0], &app.state);
    render_logs(frame, right[1], &app.state);

    let footer = Paragraph::new(footer_text(&app.state));
    frame.render_widget(footer, chunks[2]);

    if app.state.help_overlay {
        render_help_overlay(frame, area);
    }
}

fn header_text(state: &AppState) -> String {
    let groups: Vec<_> = state.active_filter().position_groups.into_iter().collect();
    let line1 = format!(
        "  PIZZA RADAR | {} | Template: {} | Sample: {} ({})",
        state.source,
        state.template_label(),
        describe_groups(&groups),
        state.scope_label()
    );
    let line2 = match &state.report {
        Some(report) => format!(
            "  {} | {} | vs {} players",
            report.player,
            report.team.as_deref().unwrap_or("-"),
            report.sample_size
        ),
        None => "  No player selected".to_string(),
    };
    format!("{line1}\n{line2}")
}

fn footer_text(state: &AppState) -> String {
    if state.search_active {
        return format!("Search: {}_  (Enter/Esc done)", state.search);
    }
    "j/k/↑/↓ Move | t Template | p Sample scope | / Search | s SVG | e xlsx | ? Help | q Quit"
        .to_string()
}

fn render_player_list(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Players").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = state.visible_rows();
    if rows.is_empty() {
        let empty = Paragraph::new("No players match")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
        return;
    }

    let visible = inner.height as usize;
    let (start, end) = visible_range(state.selected, rows.len(), visible);
    let lines: Vec<Line> = (start..end)
        .filter_map(|idx| {
            let entity = state.population.get(rows[idx])?;
            let group = entity.position_group.map(|g| g.code()).unwrap_or("--");
            let text = format!("{group:<3} {}", entity.display_label());
            let style = if idx == state.selected {
                Style::default()
                    .fg(Color::White)
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Some(Line::styled(text, style))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_percentiles(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Percentiles").borders(Borders::ALL);
    if let Some(err) = &state.error {
        let msg = Paragraph::new(err.as_str())
            .style(Style::default().fg(Color::Red))
            .block(block);
        frame.render_widget(msg, area);
        return;
    }
    let Some(report) = &state.report else {
        frame.render_widget(Paragraph::new("").block(block), area);
        return;
    };
    if report.scores.is_empty() {
        let msg = Paragraph::new("No metrics selected (t cycles templates)")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(msg, area);
        return;
    }
    frame.render_widget(percentile_bar_chart(&report.scores).block(block), area);
}

fn band_color(percentile: f64) -> Color {
    match performance_band(percentile) {
        0 => Color::Red,
        1 => Color::LightRed,
        2 => Color::Yellow,
        3 => Color::LightYellow,
        4 => Color::LightGreen,
        _ => Color::Green,
    }
}

fn percentile_bar_chart(scores: &[PercentileScore]) -> BarChart<'static> {
    let bars: Vec<Bar> = scores
        .iter()
        .map(|s| {
            let style = match s.outcome {
                ScoreOutcome::Ranked => Style::default().fg(band_color(s.percentile)),
                _ => Style::default().fg(Color::DarkGray),
            };
            let value = match s.value {
                Some(v) => format!("{:.1} ({v:.2})", s.percentile),
                None => format!("{:.1} (n/a)", s.percentile),
            };
            Bar::default()
                .value(s.percentile.round() as u64)
                .label(Line::from(format!("{:<22}", s.metric.label())))
                .text_value(value)
                .style(style)
        })
        .collect();

    BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .group_gap(0)
        .max(100)
}

fn render_logs(frame: &mut Frame, area: Rect, state: &AppState) {
    let height = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = state
        .logs
        .iter()
        .rev()
        .take(height)
        .rev()
        .map(|l| Line::from(l.as_str()))
        .collect();
    let logs = Paragraph::new(lines).block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(logs, area);
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Pizza Radar - Help",
        "",
        "  j/k or ↑/↓   Select player",
        "  /            Search by name or team",
        "  t            Cycle radar template",
        "  p            Cycle sample scope (configured, same group, each group)",
        "  s            Write SVG pizza chart",
        "  e            Write xlsx workbook",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Grey bars: value missing or metric not in export (shown as 50).",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
