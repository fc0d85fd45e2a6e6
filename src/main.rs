use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::widgets::{
    Axis, Block, Borders, Chart, Clear, Dataset, GraphType, Paragraph, Row, Table,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ffl_terminal::config::{LeagueConfig, arg_value};
use ffl_terminal::draft;
use ffl_terminal::espn_api::EspnClient;
use ffl_terminal::export;
use ffl_terminal::http_cache::CachedFetch;
use ffl_terminal::matchup::{self, LuckRegion, Outcome};
use ffl_terminal::schedule::GameKind;
use ffl_terminal::state::{AppState, DraftRange, Page};

const LOG_FILE: &str = "ffl_terminal.log";
const TEAM_COLORS: &[Color] = &[
    Color::Cyan,
    Color::Yellow,
    Color::Magenta,
    Color::Green,
    Color::LightRed,
    Color::LightBlue,
    Color::White,
    Color::LightYellow,
];

struct App {
    state: AppState,
    fetch: CachedFetch<EspnClient>,
    should_quit: bool,
}

impl App {
    fn new(cfg: &LeagueConfig) -> Self {
        Self {
            state: AppState::new(cfg),
            fetch: CachedFetch::new(EspnClient::new(cfg)),
            should_quit: false,
        }
    }

    fn reload(&mut self) {
        self.state.reload(&self.fetch);
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.state.page = self.state.page.toggle(),
            KeyCode::Char('[') | KeyCode::Left => {
                if self.state.select_prev_season() {
                    self.reload();
                }
            }
            KeyCode::Char(']') | KeyCode::Right => {
                if self.state.select_next_season() {
                    self.reload();
                }
            }
            KeyCode::Char('r') => {
                self.fetch.cache().clear();
                self.state.push_log("[INFO] Response cache cleared");
                self.reload();
            }
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => match self.state.page {
                Page::Matchups => self.on_matchup_key(key),
                Page::Draft => self.on_draft_key(key),
            },
        }
    }

    fn on_matchup_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('p') => self.state.league_stat = self.state.league_stat.toggle(),
            KeyCode::Char('m') => self.state.compare_stat = self.state.compare_stat.toggle(),
            KeyCode::Char('j') | KeyCode::Down => self.state.move_team_cursor(true),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_team_cursor(false),
            KeyCode::Char(' ') | KeyCode::Enter => self.state.toggle_compare_team(),
            KeyCode::Char('n') => self.state.move_drilldown(true),
            KeyCode::Char('N') => self.state.move_drilldown(false),
            _ => {}
        }
    }

    fn on_draft_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('f') => self.state.cycle_position_filter(),
            KeyCode::Char('d') => self.state.cycle_drafter_filter(),
            KeyCode::Char('t') => self.state.cycle_pro_team_filter(),
            KeyCode::Char('K') => self.state.cycle_keeper_filter(),
            KeyCode::Char('a') => self.state.step_range(DraftRange::SeasonAverage, false, true),
            KeyCode::Char('A') => self.state.step_range(DraftRange::SeasonAverage, false, false),
            KeyCode::Char('s') => self.state.step_range(DraftRange::SeasonAverage, true, false),
            KeyCode::Char('S') => self.state.step_range(DraftRange::SeasonAverage, true, true),
            KeyCode::Char('b') => self.state.step_range(DraftRange::BidAmount, false, true),
            KeyCode::Char('B') => self.state.step_range(DraftRange::BidAmount, false, false),
            KeyCode::Char('v') => self.state.step_range(DraftRange::BidAmount, true, false),
            KeyCode::Char('V') => self.state.step_range(DraftRange::BidAmount, true, true),
            KeyCode::Char('c') => self.state.clear_draft_filters(),
            _ => {}
        }
    }

    fn export(&mut self) {
        let Some(data) = self.state.data.as_ref() else {
            self.state.push_log("[INFO] Nothing loaded to export");
            return;
        };
        let path = PathBuf::from(format!("ffl_{}.xlsx", data.season));
        match export::export_season(&path, data) {
            Ok(report) => self.state.push_log(format!(
                "[INFO] Exported {} games, {} luck rows to {}",
                report.games,
                report.luck_rows,
                path.display()
            )),
            Err(err) => self.state.push_log(format!("[WARN] Export failed: {err:#}")),
        }
    }
}

fn main() -> Result<()> {
    let log_file = std::fs::File::create(LOG_FILE).context("create log file")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ffl_terminal=info")),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let cfg = LeagueConfig::from_env()?;
    info!(league_id = cfg.league_id, seasons = ?cfg.seasons(), "starting dashboard");

    let mut app = App::new(&cfg);
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(raw) = arg_value(&args, "--season") {
        let season = cfg.parse_season(&raw)?;
        app.state.select_season(season);
    }
    app.reload();

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
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(1)])
        .split(chunks[1]);
    render_sidebar(frame, body[0], &app.state);

    match app.state.page {
        Page::Matchups => render_matchups(frame, body[1], &app.state),
        Page::Draft => render_draft(frame, body[1], &app.state),
    }

    let footer = Paragraph::new(footer_text(&app.state))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    if app.state.help_overlay {
        let area = frame.size();
        render_help_overlay(frame, area);
    }
}

fn header_text(state: &AppState) -> String {
    let season = state
        .selected_season()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        " FFL TERMINAL | {} | Season {} | Playoffs from week {}",
        state.page.label(),
        season,
        state.playoff_start_week
    )
}

fn footer_text(state: &AppState) -> String {
    let keys = match state.page {
        Page::Matchups => {
            "Tab Draft | [/] Season | p League stat | m Compare stat | j/k Team | Space Toggle | n/N Drilldown | e Export | ? Help | q Quit"
        }
        Page::Draft => {
            "Tab Matchups | [/] Season | f Pos | d Drafter | t NFL | K Keepers | a/A s/S Avg | b/B v/V Bid | c Clear | ? Help | q Quit"
        }
    };
    let last = state.logs.back().map(String::as_str).unwrap_or("");
    format!("{keys}\n{last}")
}

fn render_sidebar(frame: &mut Frame, area: Rect, state: &AppState) {
    let mut lines: Vec<Line> = vec![Line::from(Span::styled(
        "Seasons",
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    for (idx, season) in state.seasons.iter().enumerate().rev() {
        let style = if idx == state.season_idx {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(format!("  {season}"), style)));
    }

    if state.page == Page::Matchups {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Teams (compare)",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for (idx, team) in state.team_options().iter().enumerate() {
            let mark = if state.compare_teams.contains(team) { "[x]" } else { "[ ]" };
            let style = if idx == state.team_cursor {
                Style::default().fg(Color::Black).bg(Color::Gray)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(format!("{mark} {team}"), style)));
        }
    }

    let block = Block::default().borders(Borders::RIGHT).title("Navigation");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_empty(frame: &mut Frame, area: Rect, msg: &str) {
    let empty = Paragraph::new(msg.to_string()).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(empty, area);
}

fn render_matchups(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(data) = state.data.as_ref() else {
        render_empty(frame, area, "No season data loaded");
        return;
    };
    if data.games.is_empty() {
        render_empty(frame, area, "No played games this season");
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(area);

    render_league_trends(frame, rows[0], state);
    render_team_comparison(frame, rows[1], state);
    render_luck_scatter(frame, rows[2], state);
}

fn render_league_trends(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(data) = state.data.as_ref() else {
        return;
    };
    let boxes = matchup::stat_quantiles(&data.long_format, state.league_stat);
    let header = Row::new(vec!["Team", "Type", "Min", "Q1", "Median", "Q3", "Max"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows: Vec<Row> = boxes
        .iter()
        .map(|b| {
            Row::new(vec![
                b.team.clone(),
                b.kind.label().to_string(),
                format!("{:.1}", b.min),
                format!("{:.1}", b.q1),
                format!("{:.1}", b.median),
                format!("{:.1}", b.q3),
                format!("{:.1}", b.max),
            ])
        })
        .collect();
    let widths = [
        Constraint::Min(20),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(7),
    ];
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Scoring {} Quantiles", state.league_stat.label())),
    );
    frame.render_widget(table, area);
}

fn render_team_comparison(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(data) = state.data.as_ref() else {
        return;
    };
    let series = matchup::team_series(&data.long_format, &state.compare_teams, state.compare_stat);
    let title = format!("Scoring {} over the Season", state.compare_stat.label());
    if series.iter().all(|s| s.points.is_empty()) {
        let block = Block::default().borders(Borders::ALL).title(title);
        frame.render_widget(Paragraph::new("Select teams with Space").block(block), area);
        return;
    }

    let (x_max, y_min, y_max) = series
        .iter()
        .flat_map(|s| s.points.iter())
        .fold((1.0_f64, 0.0_f64, 0.0_f64), |(xm, lo, hi), (x, y)| {
            (xm.max(*x), lo.min(*y), hi.max(*y))
        });

    let datasets: Vec<Dataset> = series
        .iter()
        .enumerate()
        .map(|(i, s)| {
            Dataset::default()
                .name(s.team.clone())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(TEAM_COLORS[i % TEAM_COLORS.len()]))
                .data(&s.points)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_axis(
            Axis::default()
                .title("Week")
                .bounds([1.0, x_max])
                .labels(vec![Span::raw("1"), Span::raw(format!("{x_max:.0}"))]),
        )
        .y_axis(
            Axis::default()
                .title(state.compare_stat.label())
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(format!("{y_min:.0}")),
                    Span::raw(format!("{y_max:.0}")),
                ]),
        );
    frame.render_widget(chart, area);
}

fn render_luck_scatter(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some((_, team)) = state.drilldown_team() else {
        render_empty(frame, area, "No team to drill into");
        return;
    };
    let luck = state.drilldown_luck();
    let extent = matchup::luck_axis_extent(&luck);

    let groups: Vec<(GameKind, Outcome, Vec<(f64, f64)>)> = [GameKind::Regular, GameKind::Playoff]
        .into_iter()
        .flat_map(|kind| [Outcome::Win, Outcome::Loss].map(|o| (kind, o)))
        .map(|(kind, outcome)| (kind, outcome, matchup::luck_points(&luck, kind, outcome)))
        .collect();
    let diagonal = [(-extent, -extent), (extent, extent)];

    let lucky = luck.iter().filter(|r| r.region() == LuckRegion::LuckyWin).count();
    let unlucky = luck.iter().filter(|r| r.region() == LuckRegion::UnluckyLoss).count();

    let mut datasets = vec![
        Dataset::default()
            .marker(Marker::Dot)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&diagonal),
    ];
    // color = game type, marker = result
    for (kind, outcome, data) in &groups {
        let color = match kind {
            GameKind::Regular => Color::Cyan,
            GameKind::Playoff => Color::Magenta,
        };
        let marker = match outcome {
            Outcome::Win => Marker::Block,
            Outcome::Loss => Marker::Dot,
        };
        datasets.push(
            Dataset::default()
                .name(format!("{} {}", kind.label(), outcome.label()))
                .marker(marker)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(color))
                .data(data),
        );
    }

    let labels = || {
        vec![
            Span::raw(format!("{:.0}", -extent)),
            Span::raw("0"),
            Span::raw(format!("{extent:.0}")),
        ]
    };
    let title = format!(
        "{team}: Weekly Scores, Centered at League Average | lucky wins {lucky}, unlucky losses {unlucky}"
    );
    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_axis(
            Axis::default()
                .title("Points For")
                .bounds([-extent, extent])
                .labels(labels()),
        )
        .y_axis(
            Axis::default()
                .title("Points Against")
                .bounds([-extent, extent])
                .labels(labels()),
        );
    frame.render_widget(chart, area);
}

fn render_draft(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(data) = state.data.as_ref() else {
        render_empty(frame, area, "No season data loaded");
        return;
    };
    if data.draft.is_empty() {
        let msg = data
            .draft_error
            .clone()
            .unwrap_or_else(|| "No draft picks this season".to_string());
        render_empty(frame, area, &msg);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let filtered = state.filtered_draft();
    let point = |r: &&draft::DraftRow| Some((r.bid_amount?, r.season_average?));
    let kept: Vec<(f64, f64)> = filtered.iter().filter(|r| r.keeper).filter_map(point).collect();
    let drafted: Vec<(f64, f64)> = filtered.iter().filter(|r| !r.keeper).filter_map(point).collect();
    let line = draft::fit_through_origin(&data.draft)
        .map(|slope| draft::regression_line(slope, &data.draft))
        .unwrap_or_default();

    let x_max = data.draft.iter().filter_map(|r| r.bid_amount).fold(1.0, f64::max) + 2.0;
    let y_max = data
        .draft
        .iter()
        .filter_map(|r| r.season_average)
        .fold(1.0, f64::max)
        + 2.0;

    let datasets = vec![
        Dataset::default()
            .name("Fit")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::DarkGray))
            .data(&line),
        Dataset::default()
            .name("Keeper")
            .marker(Marker::Block)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Red))
            .data(&kept),
        Dataset::default()
            .name("Drafted")
            .marker(Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Blue))
            .data(&drafted),
    ];
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Season Averages vs. Auction Amount"),
        )
        .x_axis(
            Axis::default()
                .title("Bid Amount")
                .bounds([-2.0, x_max])
                .labels(vec![Span::raw("0"), Span::raw(format!("{x_max:.0}"))]),
        )
        .y_axis(
            Axis::default()
                .title("Season Avg")
                .bounds([-2.0, y_max])
                .labels(vec![Span::raw("0"), Span::raw(format!("{y_max:.0}"))]),
        );
    frame.render_widget(chart, rows[0]);

    let header = Row::new(vec!["Pick", "Player", "Pos", "NFL", "Drafter", "Bid", "Keeper", "Avg"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let table_rows: Vec<Row> = filtered
        .iter()
        .map(|r| {
            Row::new(vec![
                r.overall_pick.map(|p| p.to_string()).unwrap_or_default(),
                r.player.clone().unwrap_or_default(),
                r.position.clone().unwrap_or_default(),
                r.pro_team.clone().unwrap_or_default(),
                r.drafter.clone().unwrap_or_default(),
                r.bid_amount.map(|b| format!("{b:.0}")).unwrap_or_default(),
                if r.keeper { "yes" } else { "" }.to_string(),
                r.season_average.map(|a| format!("{a:.1}")).unwrap_or_default(),
            ])
        })
        .collect();
    let widths = [
        Constraint::Length(5),
        Constraint::Min(18),
        Constraint::Length(5),
        Constraint::Length(4),
        Constraint::Min(18),
        Constraint::Length(5),
        Constraint::Length(7),
        Constraint::Length(6),
    ];
    let chosen = |set: Option<&HashSet<String>>| {
        set.and_then(|s| s.iter().next().cloned())
            .unwrap_or_else(|| "all".to_string())
    };
    let filter = &state.draft_filter;
    let keepers = match filter.keepers.as_ref() {
        None => "all",
        Some(s) if s.contains(&true) => "only",
        Some(_) => "none",
    };
    let range = |r: DraftRange| {
        state
            .range_bounds(r)
            .map(|(lo, hi)| format!("{} {lo:.0}-{hi:.0}", r.label()))
            .unwrap_or_else(|| format!("{} -", r.label()))
    };
    let table = Table::new(table_rows, widths).header(header).block(
        Block::default().borders(Borders::ALL).title(format!(
            "Picks ({} shown) | pos: {} | drafter: {} | nfl: {} | keepers: {keepers} | {} | {}",
            filtered.len(),
            chosen(filter.positions.as_ref()),
            chosen(filter.drafters.as_ref()),
            chosen(filter.pro_teams.as_ref()),
            range(DraftRange::SeasonAverage),
            range(DraftRange::BidAmount),
        )),
    );
    frame.render_widget(table, rows[1]);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let width = area.width.min(64);
    let height = area.height.min(18);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };
    let text = vec![
        Line::from("Tab        switch Matchups / Draft"),
        Line::from("[ ] ← →    previous / next season"),
        Line::from("r          clear cache and reload"),
        Line::from("e          export season workbook"),
        Line::from(""),
        Line::from("Matchups: p/m toggle Points/Margin, j/k move,"),
        Line::from("          Space add/remove team, n/N drilldown team"),
        Line::from("Draft:    f position, d drafter, t NFL team, K keepers"),
        Line::from("          a/A avg min up/down, s/S avg max down/up"),
        Line::from("          b/B bid min up/down, v/V bid max down/up, c clear"),
        Line::from(""),
        Line::from("Luck: points are centered on the week's league"),
        Line::from("average. Below the diagonal is a win."),
    ];
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Help")),
        popup,
    );
}
