use std::collections::{HashSet, VecDeque};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::LeagueConfig;
use crate::draft::{self, DraftFilter, DraftRow};
use crate::espn_api::{DRAFT_VIEW, Fetch, MATCHUP_VIEW, PLAYER_VIEW, TEAM_VIEW, season_params};
use crate::matchup::{self, AVERAGE_TEAM, LuckRecord, Stat, TeamWeekRecord};
use crate::schedule::{self, Game, RawTeam, TeamDirectory};

const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Matchups,
    Draft,
}

impl Page {
    pub fn label(self) -> &'static str {
        match self {
            Page::Matchups => "Matchups",
            Page::Draft => "Draft",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Page::Matchups => Page::Draft,
            Page::Draft => Page::Matchups,
        }
    }
}

/// Everything derived for one season. Rebuilt from scratch on every selection.
#[derive(Debug, Clone)]
pub struct SeasonData {
    pub season: i32,
    pub teams: Vec<(u32, String)>,
    pub games: Vec<Game>,
    pub long_format: Vec<TeamWeekRecord>,
    pub draft: Vec<DraftRow>,
    pub draft_error: Option<String>,
}

impl SeasonData {
    pub fn luck_for(&self, team_id: u32) -> Vec<LuckRecord> {
        matchup::build_luck(&self.games, team_id)
    }
}

pub fn load_season(fetch: &impl Fetch, season: i32, playoff_start_week: u32) -> Result<SeasonData> {
    let params = season_params(season);
    let matchups = fetch
        .fetch(MATCHUP_VIEW, &params)
        .with_context(|| format!("fetch matchups for {season}"))?;
    let team_payload = fetch
        .fetch(TEAM_VIEW, &params)
        .with_context(|| format!("fetch teams for {season}"))?;

    let raw_games = schedule::parse_schedule(&matchups).context("schedule payload")?;
    let raw_teams = schedule::parse_teams(&team_payload).context("teams payload")?;
    let directory = TeamDirectory::from_raw(&raw_teams);
    let games = schedule::normalize_with(&raw_games, &directory, playoff_start_week);
    let long_format = matchup::build_long_format(&games, playoff_start_week);

    let (draft, draft_error) = match load_draft(fetch, season, &raw_teams) {
        Ok(rows) => (rows, None),
        Err(err) => {
            warn!(season, error = %format!("{err:#}"), "draft data unavailable");
            (Vec::new(), Some(format!("{err:#}")))
        }
    };

    info!(
        season,
        games = games.len(),
        records = long_format.len(),
        picks = draft.len(),
        "season loaded"
    );
    Ok(SeasonData {
        season,
        teams: directory.teams(),
        games,
        long_format,
        draft,
        draft_error,
    })
}

fn load_draft(fetch: &impl Fetch, season: i32, teams: &[RawTeam]) -> Result<Vec<DraftRow>> {
    let params = season_params(season);
    let players = fetch.fetch(PLAYER_VIEW, &params).context("fetch players")?;
    let picks = fetch.fetch(DRAFT_VIEW, &params).context("fetch draft")?;
    let players = draft::parse_players(&players)?;
    let picks = draft::parse_picks(&picks)?;
    Ok(draft::build_draft_rows(&picks, &players, teams, season))
}

/// The two numeric draft columns with a slider-style range control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftRange {
    SeasonAverage,
    BidAmount,
}

impl DraftRange {
    pub fn label(self) -> &'static str {
        match self {
            DraftRange::SeasonAverage => "avg",
            DraftRange::BidAmount => "bid",
        }
    }

    fn step(self) -> f64 {
        match self {
            DraftRange::SeasonAverage => 1.0,
            DraftRange::BidAmount => 5.0,
        }
    }

    fn value(self, row: &DraftRow) -> Option<f64> {
        match self {
            DraftRange::SeasonAverage => row.season_average,
            DraftRange::BidAmount => row.bid_amount,
        }
    }
}

// all -> each option in turn -> all
fn next_choice(current: Option<usize>, len: usize) -> Option<usize> {
    match current {
        None if len > 0 => Some(0),
        Some(i) if i + 1 < len => Some(i + 1),
        _ => None,
    }
}

fn single(options: &[String], choice: Option<usize>) -> Option<HashSet<String>> {
    choice
        .and_then(|i| options.get(i).cloned())
        .map(|v| [v].into_iter().collect())
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub page: Page,
    pub seasons: Vec<i32>,
    pub season_idx: usize,
    pub playoff_start_week: u32,
    pub data: Option<SeasonData>,
    pub league_stat: Stat,
    pub compare_stat: Stat,
    pub compare_teams: Vec<String>,
    pub team_cursor: usize,
    pub drilldown: usize,
    pub draft_filter: DraftFilter,
    pub position_filter: Option<usize>,
    pub drafter_filter: Option<usize>,
    pub pro_team_filter: Option<usize>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    generation: u64,
}

impl AppState {
    pub fn new(cfg: &LeagueConfig) -> Self {
        let seasons: Vec<i32> = cfg.seasons().collect();
        Self {
            page: Page::Matchups,
            season_idx: seasons.len().saturating_sub(1),
            seasons,
            playoff_start_week: cfg.playoff_start_week,
            data: None,
            league_stat: Stat::Points,
            compare_stat: Stat::Points,
            compare_teams: vec![AVERAGE_TEAM.to_string()],
            team_cursor: 0,
            drilldown: 0,
            draft_filter: DraftFilter::default(),
            position_filter: None,
            drafter_filter: None,
            pro_team_filter: None,
            logs: VecDeque::new(),
            help_overlay: false,
            generation: 0,
        }
    }

    pub fn selected_season(&self) -> Option<i32> {
        self.seasons.get(self.season_idx).copied()
    }

    pub fn select_next_season(&mut self) -> bool {
        if self.season_idx + 1 >= self.seasons.len() {
            return false;
        }
        self.season_idx += 1;
        true
    }

    pub fn select_season(&mut self, season: i32) -> bool {
        match self.seasons.iter().position(|s| *s == season) {
            Some(idx) => {
                self.season_idx = idx;
                true
            }
            None => false,
        }
    }

    pub fn select_prev_season(&mut self) -> bool {
        if self.season_idx == 0 {
            return false;
        }
        self.season_idx -= 1;
        true
    }

    /// Starts a load and returns its generation; older generations are stale.
    pub fn begin_load(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// Applies a finished load unless a newer one was started meanwhile.
    pub fn finish_load(&mut self, generation: u64, result: Result<SeasonData>) -> bool {
        if generation != self.generation {
            info!(generation, current = self.generation, "discarding stale season load");
            return false;
        }
        match result {
            Ok(data) => {
                self.push_log(format!(
                    "[INFO] Season {}: {} games, {} teams",
                    data.season,
                    data.games.len(),
                    data.teams.len()
                ));
                if let Some(err) = &data.draft_error {
                    self.push_log(format!("[WARN] Draft: {err}"));
                }
                self.set_data(data);
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "season load failed");
                self.push_log(format!("[WARN] {err:#}"));
                self.data = None;
            }
        }
        true
    }

    pub fn reload(&mut self, fetch: &impl Fetch) {
        let Some(season) = self.selected_season() else {
            self.push_log("[WARN] No seasons configured");
            return;
        };
        let generation = self.begin_load();
        self.push_log(format!("[INFO] Loading season {season}"));
        let result = load_season(fetch, season, self.playoff_start_week);
        self.finish_load(generation, result);
    }

    fn set_data(&mut self, data: SeasonData) {
        self.data = Some(data);
        let options = self.team_options();
        self.compare_teams.retain(|t| options.contains(t));
        if self.compare_teams.is_empty() && options.iter().any(|t| t == AVERAGE_TEAM) {
            self.compare_teams.push(AVERAGE_TEAM.to_string());
        }
        self.team_cursor = self.team_cursor.min(options.len().saturating_sub(1));
        let teams = self.data.as_ref().map_or(0, |d| d.teams.len());
        self.drilldown = self.drilldown.min(teams.saturating_sub(1));
        self.clear_draft_filters();
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn team_options(&self) -> Vec<String> {
        self.data
            .as_ref()
            .map(|d| matchup::team_names(&d.long_format))
            .unwrap_or_default()
    }

    pub fn move_team_cursor(&mut self, forward: bool) {
        let n = self.team_options().len();
        if n == 0 {
            return;
        }
        self.team_cursor = if forward {
            (self.team_cursor + 1) % n
        } else {
            (self.team_cursor + n - 1) % n
        };
    }

    pub fn toggle_compare_team(&mut self) {
        let Some(team) = self.team_options().get(self.team_cursor).cloned() else {
            return;
        };
        if let Some(pos) = self.compare_teams.iter().position(|t| *t == team) {
            self.compare_teams.remove(pos);
        } else {
            self.compare_teams.push(team);
        }
    }

    pub fn move_drilldown(&mut self, forward: bool) {
        let n = self.data.as_ref().map_or(0, |d| d.teams.len());
        if n == 0 {
            return;
        }
        self.drilldown = if forward {
            (self.drilldown + 1) % n
        } else {
            (self.drilldown + n - 1) % n
        };
    }

    pub fn drilldown_team(&self) -> Option<(u32, &str)> {
        let data = self.data.as_ref()?;
        data.teams
            .get(self.drilldown)
            .map(|(id, name)| (*id, name.as_str()))
    }

    pub fn drilldown_luck(&self) -> Vec<LuckRecord> {
        match (self.data.as_ref(), self.drilldown_team()) {
            (Some(data), Some((id, _))) => data.luck_for(id),
            _ => Vec::new(),
        }
    }

    pub fn position_options(&self) -> Vec<String> {
        self.draft_options(|r| r.position.as_ref())
    }

    pub fn drafter_options(&self) -> Vec<String> {
        self.draft_options(|r| r.drafter.as_ref())
    }

    pub fn pro_team_options(&self) -> Vec<String> {
        self.draft_options(|r| r.pro_team.as_ref())
    }

    fn draft_options(&self, column: impl Fn(&DraftRow) -> Option<&String>) -> Vec<String> {
        self.data
            .as_ref()
            .map(|d| draft::distinct_values(&d.draft, column))
            .unwrap_or_default()
    }

    /// all -> each position in turn -> all
    pub fn cycle_position_filter(&mut self) {
        let options = self.position_options();
        self.position_filter = next_choice(self.position_filter, options.len());
        self.draft_filter.positions = single(&options, self.position_filter);
    }

    pub fn cycle_drafter_filter(&mut self) {
        let options = self.drafter_options();
        self.drafter_filter = next_choice(self.drafter_filter, options.len());
        self.draft_filter.drafters = single(&options, self.drafter_filter);
    }

    pub fn cycle_pro_team_filter(&mut self) {
        let options = self.pro_team_options();
        self.pro_team_filter = next_choice(self.pro_team_filter, options.len());
        self.draft_filter.pro_teams = single(&options, self.pro_team_filter);
    }

    /// all -> keepers only -> non-keepers only -> all
    pub fn cycle_keeper_filter(&mut self) {
        let next = match self.draft_filter.keepers.as_ref() {
            None => Some(true),
            Some(set) if set.contains(&true) => Some(false),
            Some(_) => None,
        };
        self.draft_filter.keepers = next.map(|k| [k].into_iter().collect());
    }

    /// Full slider span for a range control: zero up to the largest value drafted.
    pub fn range_span(&self, range: DraftRange) -> Option<(f64, f64)> {
        let data = self.data.as_ref()?;
        let max = data
            .draft
            .iter()
            .filter_map(|r| range.value(r))
            .reduce(f64::max)?;
        Some((0.0, max.max(0.0)))
    }

    /// Current bounds of a range control; the full span when unset.
    pub fn range_bounds(&self, range: DraftRange) -> Option<(f64, f64)> {
        self.range_filter(range).or_else(|| self.range_span(range))
    }

    fn range_filter(&self, range: DraftRange) -> Option<(f64, f64)> {
        match range {
            DraftRange::SeasonAverage => self.draft_filter.season_average,
            DraftRange::BidAmount => self.draft_filter.bid_amount,
        }
    }

    fn range_filter_mut(&mut self, range: DraftRange) -> &mut Option<(f64, f64)> {
        match range {
            DraftRange::SeasonAverage => &mut self.draft_filter.season_average,
            DraftRange::BidAmount => &mut self.draft_filter.bid_amount,
        }
    }

    /// Moves one end of a range by its step, kept inside the span and never
    /// past the other end. Back at the full span the range is unset again, so
    /// rows with no value show.
    pub fn step_range(&mut self, range: DraftRange, upper: bool, raise: bool) {
        let Some((span_lo, span_hi)) = self.range_span(range) else {
            return;
        };
        let (mut lo, mut hi) = self.range_filter(range).unwrap_or((span_lo, span_hi));
        let delta = if raise { range.step() } else { -range.step() };
        if upper {
            hi = (hi + delta).min(span_hi).max(lo);
        } else {
            lo = (lo + delta).max(span_lo).min(hi);
        }
        *self.range_filter_mut(range) = if lo <= span_lo && hi >= span_hi {
            None
        } else {
            Some((lo, hi))
        };
    }

    pub fn clear_draft_filters(&mut self) {
        self.position_filter = None;
        self.drafter_filter = None;
        self.pro_team_filter = None;
        self.draft_filter = DraftFilter::default();
    }

    pub fn filtered_draft(&self) -> Vec<&DraftRow> {
        self.data
            .as_ref()
            .map(|d| self.draft_filter.apply(&d.draft))
            .unwrap_or_default()
    }
}
