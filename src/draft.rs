//! Draft value analysis: auction picks joined with player season averages.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::schedule::{RawTeam, TeamDirectory, league_array, league_document, tolerant};

const REGRESSION_STEPS: usize = 50;
const REGRESSION_PAD: f64 = 5.0;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPick {
    #[serde(default)]
    pub player_id: Option<i64>,
    #[serde(default)]
    pub team_id: Option<u32>,
    #[serde(default)]
    pub bid_amount: Option<f64>,
    #[serde(default)]
    pub keeper: Option<bool>,
    #[serde(default)]
    pub overall_pick_number: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStatBlock {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub applied_average: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlayer {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub default_position_id: Option<u32>,
    #[serde(default)]
    pub pro_team_id: Option<u32>,
    #[serde(default)]
    pub stats: Vec<RawStatBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawPlayerEntry {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub player: Option<RawPlayer>,
}

pub fn parse_players(payload: &Value) -> Result<Vec<RawPlayerEntry>> {
    let players = league_array(payload, "players")?;
    Ok(players.iter().map(|p| tolerant(p, "player")).collect())
}

pub fn parse_picks(payload: &Value) -> Result<Vec<RawPick>> {
    let picks = league_document(payload)
        .and_then(|doc| doc.get("draftDetail"))
        .and_then(|d| d.get("picks"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow!("payload has no draft picks"))?;
    Ok(picks.iter().map(|p| tolerant(p, "pick")).collect())
}

/// ESPN `defaultPositionId`.
pub fn position_label(id: u32) -> Option<&'static str> {
    Some(match id {
        1 => "QB",
        2 => "RB",
        3 => "WR",
        4 => "TE",
        5 => "K",
        16 => "D/ST",
        _ => return None,
    })
}

/// ESPN `proTeamId`.
pub fn pro_team_label(id: u32) -> Option<&'static str> {
    Some(match id {
        0 => "FA",
        1 => "ATL",
        2 => "BUF",
        3 => "CHI",
        4 => "CIN",
        5 => "CLE",
        6 => "DAL",
        7 => "DEN",
        8 => "DET",
        9 => "GB",
        10 => "TEN",
        11 => "IND",
        12 => "KC",
        13 => "LV",
        14 => "LAR",
        15 => "MIA",
        16 => "MIN",
        17 => "NE",
        18 => "NO",
        19 => "NYG",
        20 => "NYJ",
        21 => "PHI",
        22 => "ARI",
        23 => "PIT",
        24 => "LAC",
        25 => "SF",
        26 => "SEA",
        27 => "TB",
        28 => "WSH",
        29 => "CAR",
        30 => "JAX",
        33 => "BAL",
        34 => "HOU",
        _ => return None,
    })
}

/// Season-long scoring average; ESPN keys that block as `"00{season}"`.
pub fn season_average(player: &RawPlayer, season: i32) -> Option<f64> {
    let key = format!("00{season}");
    player
        .stats
        .iter()
        .rev()
        .find(|s| s.id.as_deref() == Some(key.as_str()))
        .and_then(|s| s.applied_average)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftRow {
    pub overall_pick: Option<u32>,
    pub player_id: Option<i64>,
    pub player: Option<String>,
    pub drafter: Option<String>,
    pub position: Option<String>,
    pub pro_team: Option<String>,
    pub bid_amount: Option<f64>,
    pub keeper: bool,
    pub season_average: Option<f64>,
}

pub fn build_draft_rows(
    picks: &[RawPick],
    players: &[RawPlayerEntry],
    teams: &[RawTeam],
    season: i32,
) -> Vec<DraftRow> {
    let directory = TeamDirectory::from_raw(teams);
    let by_id: HashMap<i64, &RawPlayer> = players
        .iter()
        .filter_map(|entry| {
            let player = entry.player.as_ref()?;
            Some((entry.id.or(player.id)?, player))
        })
        .collect();

    let rows: Vec<DraftRow> = picks
        .iter()
        .map(|pick| {
            let player = pick.player_id.and_then(|id| by_id.get(&id).copied());
            DraftRow {
                overall_pick: pick.overall_pick_number,
                player_id: pick.player_id,
                player: player.and_then(|p| p.full_name.clone()),
                drafter: directory.name(pick.team_id),
                position: player
                    .and_then(|p| p.default_position_id)
                    .and_then(position_label)
                    .map(str::to_string),
                pro_team: player
                    .and_then(|p| p.pro_team_id)
                    .and_then(pro_team_label)
                    .map(str::to_string),
                bid_amount: pick.bid_amount,
                keeper: pick.keeper.unwrap_or(false),
                season_average: player.and_then(|p| season_average(p, season)),
            }
        })
        .collect();
    debug!(picks = picks.len(), season, "built draft rows");
    rows
}

/// `None` on any field means "all". Ranges are inclusive and exclude rows
/// with no value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftFilter {
    pub positions: Option<HashSet<String>>,
    pub pro_teams: Option<HashSet<String>>,
    pub drafters: Option<HashSet<String>>,
    pub keepers: Option<HashSet<bool>>,
    pub season_average: Option<(f64, f64)>,
    pub bid_amount: Option<(f64, f64)>,
}

impl DraftFilter {
    pub fn matches(&self, row: &DraftRow) -> bool {
        in_set(&self.positions, row.position.as_ref())
            && in_set(&self.pro_teams, row.pro_team.as_ref())
            && in_set(&self.drafters, row.drafter.as_ref())
            && in_set(&self.keepers, Some(&row.keeper))
            && in_range(self.season_average, row.season_average)
            && in_range(self.bid_amount, row.bid_amount)
    }

    pub fn apply<'a>(&self, rows: &'a [DraftRow]) -> Vec<&'a DraftRow> {
        rows.iter().filter(|r| self.matches(r)).collect()
    }
}

fn in_set<T: Eq + std::hash::Hash>(set: &Option<HashSet<T>>, value: Option<&T>) -> bool {
    match set {
        None => true,
        Some(set) => value.is_some_and(|v| set.contains(v)),
    }
}

fn in_range(range: Option<(f64, f64)>, value: Option<f64>) -> bool {
    match range {
        None => true,
        Some((lo, hi)) => value.is_some_and(|v| v >= lo && v <= hi),
    }
}

/// Distinct non-empty values of one column, sorted, for filter menus.
pub fn distinct_values(rows: &[DraftRow], column: impl Fn(&DraftRow) -> Option<&String>) -> Vec<String> {
    let mut out: Vec<String> = rows
        .iter()
        .filter_map(|r| column(r).cloned())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    out.sort();
    out
}

/// Least-squares slope of season average on bid amount, no intercept.
pub fn fit_through_origin(rows: &[DraftRow]) -> Option<f64> {
    let (sxy, sxx) = rows
        .iter()
        .filter_map(|r| Some((r.bid_amount?, r.season_average?)))
        .fold((0.0, 0.0), |(sxy, sxx), (x, y)| (sxy + x * y, sxx + x * x));
    (sxx > 0.0).then(|| sxy / sxx)
}

/// Evenly spaced points of `y = slope * x` spanning the bid range with padding.
pub fn regression_line(slope: f64, rows: &[DraftRow]) -> Vec<(f64, f64)> {
    let max_bid = rows
        .iter()
        .filter_map(|r| r.bid_amount)
        .fold(0.0, f64::max);
    let start = -REGRESSION_PAD;
    let end = max_bid + REGRESSION_PAD;
    let step = (end - start) / (REGRESSION_STEPS - 1) as f64;
    (0..REGRESSION_STEPS)
        .map(|i| {
            let x = start + step * i as f64;
            (x, slope * x)
        })
        .collect()
}
