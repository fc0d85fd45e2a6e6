use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use serde_json::Value;

use ffl_terminal::config::{Credentials, LeagueConfig};
use ffl_terminal::espn_api::{
    DRAFT_VIEW, Fetch, MATCHUP_VIEW, PLAYER_VIEW, Params, TEAM_VIEW, season_params,
};
use ffl_terminal::http_cache::CachedFetch;
use ffl_terminal::state::{AppState, DraftRange, load_season};

fn read_fixture(name: &str) -> Value {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    let raw = fs::read_to_string(path).expect("fixture file should be readable");
    serde_json::from_str(&raw).expect("fixture should be valid json")
}

/// Serves fixture documents per view and counts upstream calls.
struct FixtureFetch {
    views: HashMap<&'static str, Value>,
    calls: AtomicUsize,
}

impl FixtureFetch {
    fn full() -> Self {
        Self {
            views: HashMap::from([
                (MATCHUP_VIEW, read_fixture("mmatchup.json")),
                (TEAM_VIEW, read_fixture("mteam.json")),
                (PLAYER_VIEW, read_fixture("kona_player_info.json")),
                (DRAFT_VIEW, read_fixture("mdraftdetail.json")),
            ]),
            calls: AtomicUsize::new(0),
        }
    }

    fn without(mut self, view: &str) -> Self {
        self.views.remove(view);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetch for FixtureFetch {
    fn fetch(&self, endpoint: &str, params: &Params) -> Result<Arc<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if params.get("seasonId").map(String::as_str) != Some("2021") {
            return Ok(Arc::new(Value::Array(Vec::new())));
        }
        self.views
            .get(endpoint)
            .cloned()
            .map(Arc::new)
            .ok_or_else(|| anyhow!("http 404: no view {endpoint}"))
    }
}

fn config() -> LeagueConfig {
    LeagueConfig {
        league_id: 987654,
        credentials: Credentials {
            swid: String::new(),
            espn_s2: String::new(),
        },
        min_season: 2020,
        max_season: 2021,
        playoff_start_week: 3,
    }
}

#[test]
fn season_load_builds_every_table() {
    let data = load_season(&FixtureFetch::full(), 2021, 3).expect("season should load");
    assert_eq!(data.games.len(), 6);
    assert_eq!(data.long_format.len(), 15);
    assert_eq!(data.teams.len(), 4);
    assert_eq!(data.draft.len(), 4);
    assert!(data.draft_error.is_none());
    assert_eq!(data.luck_for(1).len(), 3);
}

#[test]
fn repeated_loads_hit_upstream_once_per_view() {
    let fetch = CachedFetch::new(FixtureFetch::full());
    load_season(&fetch, 2021, 3).unwrap();
    load_season(&fetch, 2021, 3).unwrap();
    assert_eq!(fetch.inner().calls(), 4);
    assert_eq!(fetch.cache().len(), 4);

    let again = fetch.fetch(MATCHUP_VIEW, &season_params(2021)).unwrap();
    let first = fetch.fetch(MATCHUP_VIEW, &season_params(2021)).unwrap();
    assert!(Arc::ptr_eq(&again, &first));
    assert_eq!(fetch.inner().calls(), 4);
}

#[test]
fn absent_schedule_fails_fast() {
    let fetch = FixtureFetch::full();
    let err = load_season(&fetch, 2020, 3).expect_err("empty payload must not compute");
    assert!(format!("{err:#}").contains("schedule"));

    let missing = FixtureFetch::full().without(MATCHUP_VIEW);
    assert!(load_season(&missing, 2021, 3).is_err());
}

#[test]
fn missing_draft_is_not_fatal() {
    let fetch = FixtureFetch::full().without(DRAFT_VIEW);
    let data = load_season(&fetch, 2021, 3).expect("matchups still load");
    assert!(data.draft.is_empty());
    assert!(data.draft_error.as_deref().is_some_and(|e| e.contains("draft")));
    assert_eq!(data.games.len(), 6);
}

#[test]
fn app_state_reload_tracks_selection() {
    let fetch = CachedFetch::new(FixtureFetch::full());
    let mut state = AppState::new(&config());
    state.reload(&fetch);
    let data = state.data.as_ref().expect("latest season loads");
    assert_eq!(data.season, 2021);
    assert_eq!(state.compare_teams, vec!["Average".to_string()]);
    assert_eq!(state.drilldown_team(), Some((1, "Gotham Knights")));
    assert_eq!(state.drilldown_luck().len(), 3);

    assert!(state.select_prev_season());
    state.reload(&fetch);
    assert!(state.data.is_none());
    assert!(state.logs.iter().any(|l| l.starts_with("[WARN]")));
}

#[test]
fn draft_filters_apply_through_state() {
    let fetch = FixtureFetch::full();
    let mut state = AppState::new(&config());
    state.reload(&fetch);
    assert_eq!(state.filtered_draft().len(), 4);

    state.cycle_keeper_filter();
    let keepers = state.filtered_draft();
    assert_eq!(keepers.len(), 1);
    assert_eq!(keepers[0].player.as_deref(), Some("Lamar Jackson"));
    assert_eq!(keepers[0].season_average, Some(21.4));

    state.cycle_keeper_filter();
    state.cycle_keeper_filter();
    assert_eq!(state.position_options(), vec!["D/ST", "QB", "RB", "WR"]);
    state.cycle_position_filter();
    let dst = state.filtered_draft();
    assert_eq!(dst.len(), 1);
    assert_eq!(dst[0].pro_team.as_deref(), Some("BAL"));

    state.clear_draft_filters();
    assert_eq!(
        state.drafter_options(),
        vec!["Coast Sharks", "Gotham Knights", "Metro Meteors", "Star Rangers"]
    );
    state.cycle_drafter_filter();
    let coast = state.filtered_draft();
    assert_eq!(coast.len(), 1);
    assert_eq!(coast[0].player.as_deref(), Some("Ravens D/ST"));
    for _ in 0..4 {
        state.cycle_drafter_filter();
    }
    assert!(state.draft_filter.drafters.is_none());

    assert_eq!(state.pro_team_options(), vec!["BAL", "DAL", "NYG"]);
    state.cycle_pro_team_filter();
    assert_eq!(state.filtered_draft().len(), 2);
    state.clear_draft_filters();
    assert_eq!(state.filtered_draft().len(), 4);
}

#[test]
fn draft_range_controls_span_zero_to_max() {
    let fetch = FixtureFetch::full();
    let mut state = AppState::new(&config());
    state.reload(&fetch);

    assert_eq!(state.range_span(DraftRange::BidAmount), Some((0.0, 52.0)));
    assert_eq!(state.range_span(DraftRange::SeasonAverage), Some((0.0, 21.4)));
    assert_eq!(state.range_bounds(DraftRange::BidAmount), Some((0.0, 52.0)));

    // bid >= 35 keeps the 45 and 52 picks, bounds inclusive
    for _ in 0..7 {
        state.step_range(DraftRange::BidAmount, false, true);
    }
    assert_eq!(state.draft_filter.bid_amount, Some((35.0, 52.0)));
    let bids: Vec<f64> = state.filtered_draft().iter().filter_map(|r| r.bid_amount).collect();
    assert_eq!(bids, vec![45.0, 52.0]);

    // avg >= 12 drops Barkley (11.3)
    for _ in 0..12 {
        state.step_range(DraftRange::SeasonAverage, false, true);
    }
    let kept = state.filtered_draft();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].player.as_deref(), Some("Lamar Jackson"));

    state.step_range(DraftRange::SeasonAverage, true, false);
    assert!(state.filtered_draft().is_empty());

    // the upper end never passes the span or the lower end
    for _ in 0..50 {
        state.step_range(DraftRange::BidAmount, true, true);
        state.step_range(DraftRange::BidAmount, false, true);
    }
    assert_eq!(state.draft_filter.bid_amount, Some((52.0, 52.0)));

    // back at the full span the range is unset and rows without a value return
    for _ in 0..20 {
        state.step_range(DraftRange::BidAmount, false, false);
    }
    assert!(state.draft_filter.bid_amount.is_none());
    state.clear_draft_filters();
    assert!(state.draft_filter.season_average.is_none());
    assert_eq!(state.filtered_draft().len(), 4);
}
