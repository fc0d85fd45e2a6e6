use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::schedule::{Game, GameKind};

pub const AVERAGE_TEAM: &str = "Average";
/// Center of the luck scatter; the four quadrants are split here.
pub const LUCK_ORIGIN: (f64, f64) = (0.0, 0.0);
const LUCK_AXIS_PADDING: f64 = 5.0;
const UNKNOWN_TEAM: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stat {
    Points,
    Margin,
}

impl Stat {
    pub fn label(self) -> &'static str {
        match self {
            Stat::Points => "Points",
            Stat::Margin => "Margin",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Stat::Points => Stat::Margin,
            Stat::Margin => Stat::Points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamWeekRecord {
    pub week: u32,
    pub team: Option<String>,
    pub team_id: Option<u32>,
    pub points: f64,
    pub margin: f64,
    pub kind: GameKind,
    pub synthetic: bool,
}

impl TeamWeekRecord {
    /// Display name; unresolved teams stay apart by id, e.g. `Unknown (7)`.
    pub fn label(&self) -> String {
        match (&self.team, self.team_id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("{UNKNOWN_TEAM} ({id})"),
            (None, None) => UNKNOWN_TEAM.to_string(),
        }
    }

    pub fn stat(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Points => self.points,
            Stat::Margin => self.margin,
        }
    }
}

/// One row per team per game plus a synthetic league "Average" row per week,
/// sorted by week then team name.
pub fn build_long_format(games: &[Game], playoff_start_week: u32) -> Vec<TeamWeekRecord> {
    let mut out = Vec::with_capacity(games.len() * 2);
    for g in games {
        out.push(TeamWeekRecord {
            week: g.week,
            team: g.home_team.clone(),
            team_id: g.home_team_id,
            points: g.home_points,
            margin: g.home_margin,
            kind: g.kind,
            synthetic: false,
        });
        out.push(TeamWeekRecord {
            week: g.week,
            team: g.away_team.clone(),
            team_id: g.away_team_id,
            points: g.away_points,
            margin: g.away_margin,
            kind: g.kind,
            synthetic: false,
        });
    }

    let mut weekly: BTreeMap<u32, (f64, f64, usize)> = BTreeMap::new();
    for r in &out {
        let acc = weekly.entry(r.week).or_insert((0.0, 0.0, 0));
        acc.0 += r.points;
        acc.1 += r.margin;
        acc.2 += 1;
    }
    for (week, (points, margin, n)) in weekly {
        let n = n as f64;
        out.push(TeamWeekRecord {
            week,
            team: Some(AVERAGE_TEAM.to_string()),
            team_id: None,
            points: points / n,
            margin: margin / n,
            kind: GameKind::for_week(week, playoff_start_week),
            synthetic: true,
        });
    }

    out.sort_by(|a, b| a.week.cmp(&b.week).then_with(|| a.team.cmp(&b.team)));
    out
}

/// Mean of every score posted in each week, home and away alike.
pub fn weekly_averages(games: &[Game]) -> BTreeMap<u32, f64> {
    let mut sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for g in games {
        let acc = sums.entry(g.week).or_insert((0.0, 0));
        acc.0 += g.home_points + g.away_points;
        acc.1 += 2;
    }
    sums.into_iter()
        .map(|(week, (total, n))| (week, total / n as f64))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    /// Strictly greater wins; a tie counts as a loss.
    pub fn from_points(team: f64, opponent: f64) -> Self {
        if team > opponent { Outcome::Win } else { Outcome::Loss }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Win => "Win",
            Outcome::Loss => "Loss",
        }
    }
}

/// A game seen from one team's side: that team always sits in the `team_*` slot.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamPerspective {
    pub week: u32,
    pub team_id: u32,
    pub team: Option<String>,
    pub team_points: f64,
    pub opponent_id: Option<u32>,
    pub opponent: Option<String>,
    pub opponent_points: f64,
    pub kind: GameKind,
}

pub fn perspective(game: &Game, team_id: u32) -> Option<TeamPerspective> {
    if game.home_team_id == Some(team_id) {
        Some(TeamPerspective {
            week: game.week,
            team_id,
            team: game.home_team.clone(),
            team_points: game.home_points,
            opponent_id: game.away_team_id,
            opponent: game.away_team.clone(),
            opponent_points: game.away_points,
            kind: game.kind,
        })
    } else if game.away_team_id == Some(team_id) {
        Some(TeamPerspective {
            week: game.week,
            team_id,
            team: game.away_team.clone(),
            team_points: game.away_points,
            opponent_id: game.home_team_id,
            opponent: game.home_team.clone(),
            opponent_points: game.home_points,
            kind: game.kind,
        })
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    BothAbove,
    BothBelow,
    TeamAboveOnly,
    OpponentAboveOnly,
    OnAxis,
}

impl Quadrant {
    pub fn classify(points_for: f64, points_against: f64) -> Self {
        let (x0, y0) = LUCK_ORIGIN;
        let x = points_for - x0;
        let y = points_against - y0;
        if x == 0.0 || y == 0.0 {
            Quadrant::OnAxis
        } else if x > 0.0 && y > 0.0 {
            Quadrant::BothAbove
        } else if x < 0.0 && y < 0.0 {
            Quadrant::BothBelow
        } else if x > 0.0 {
            Quadrant::TeamAboveOnly
        } else {
            Quadrant::OpponentAboveOnly
        }
    }

    fn same_sign(self) -> bool {
        matches!(self, Quadrant::BothAbove | Quadrant::BothBelow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LuckRegion {
    LuckyWin,
    UnluckyLoss,
    Earned,
}

impl LuckRegion {
    pub fn label(self) -> &'static str {
        match self {
            LuckRegion::LuckyWin => "Lucky Win",
            LuckRegion::UnluckyLoss => "Unlucky Loss",
            LuckRegion::Earned => "Earned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LuckRecord {
    pub week: u32,
    pub opponent: Option<String>,
    pub opponent_id: Option<u32>,
    pub team_points: f64,
    pub opponent_points: f64,
    pub weekly_average: f64,
    pub points_for: f64,
    pub points_against: f64,
    pub outcome: Outcome,
    pub kind: GameKind,
}

impl LuckRecord {
    pub fn quadrant(&self) -> Quadrant {
        Quadrant::classify(self.points_for, self.points_against)
    }

    /// Both scores landed on the same side of the weekly average, so the
    /// result hinged on the other team more than usual.
    pub fn region(&self) -> LuckRegion {
        match (self.outcome, self.quadrant().same_sign()) {
            (Outcome::Win, true) => LuckRegion::LuckyWin,
            (Outcome::Loss, true) => LuckRegion::UnluckyLoss,
            _ => LuckRegion::Earned,
        }
    }
}

pub fn build_luck(games: &[Game], team_id: u32) -> Vec<LuckRecord> {
    let averages = weekly_averages(games);
    games
        .iter()
        .filter_map(|g| perspective(g, team_id))
        .filter_map(|p| {
            let avg = *averages.get(&p.week)?;
            Some(LuckRecord {
                week: p.week,
                opponent: p.opponent,
                opponent_id: p.opponent_id,
                team_points: p.team_points,
                opponent_points: p.opponent_points,
                weekly_average: avg,
                points_for: p.team_points - avg,
                points_against: p.opponent_points - avg,
                outcome: Outcome::from_points(p.team_points, p.opponent_points),
                kind: p.kind,
            })
        })
        .collect()
}

/// Scatter points for one (game type, result) series of the luck chart.
pub fn luck_points(records: &[LuckRecord], kind: GameKind, outcome: Outcome) -> Vec<(f64, f64)> {
    records
        .iter()
        .filter(|r| r.kind == kind && r.outcome == outcome)
        .map(|r| (r.points_for, r.points_against))
        .collect()
}

/// Half-width of a square scatter that holds every luck point with some padding.
pub fn luck_axis_extent(records: &[LuckRecord]) -> f64 {
    records
        .iter()
        .flat_map(|r| [r.points_for.abs(), r.points_against.abs()])
        .fold(0.0, f64::max)
        + LUCK_AXIS_PADDING
}

pub fn team_names(records: &[TeamWeekRecord]) -> Vec<String> {
    let mut seen = Vec::new();
    for r in records {
        let label = r.label();
        if !seen.contains(&label) {
            seen.push(label);
        }
    }
    seen
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub team: String,
    pub kind: GameKind,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Five-number summary per (team, kind), teams ordered by ascending total of `stat`.
pub fn stat_quantiles(records: &[TeamWeekRecord], stat: Stat) -> Vec<BoxSummary> {
    let mut groups: BTreeMap<(String, GameKind), Vec<f64>> = BTreeMap::new();
    let mut totals: HashMap<String, f64> = HashMap::new();
    for r in records {
        let v = r.stat(stat);
        let label = r.label();
        groups.entry((label.clone(), r.kind)).or_default().push(v);
        *totals.entry(label).or_insert(0.0) += v;
    }

    let mut out: Vec<BoxSummary> = groups
        .into_iter()
        .map(|((team, kind), mut values)| {
            values.sort_by(f64::total_cmp);
            BoxSummary {
                team,
                kind,
                count: values.len(),
                min: values[0],
                q1: quantile(&values, 0.25),
                median: quantile(&values, 0.5),
                q3: quantile(&values, 0.75),
                max: values[values.len() - 1],
            }
        })
        .collect();
    out.sort_by(|a, b| {
        let ta = totals.get(&a.team).copied().unwrap_or(0.0);
        let tb = totals.get(&b.team).copied().unwrap_or(0.0);
        ta.total_cmp(&tb)
            .then_with(|| a.team.cmp(&b.team))
            .then_with(|| a.kind.cmp(&b.kind))
    });
    out
}

// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamSeries {
    pub team: String,
    pub points: Vec<(f64, f64)>,
}

/// `(week, stat)` series for each selected team, in the order given.
pub fn team_series(records: &[TeamWeekRecord], teams: &[String], stat: Stat) -> Vec<TeamSeries> {
    teams
        .iter()
        .map(|team| {
            let mut rows: Vec<&TeamWeekRecord> =
                records.iter().filter(|r| r.label() == *team).collect();
            rows.sort_by_key(|r| r.week);
            TeamSeries {
                team: team.clone(),
                points: rows.iter().map(|r| (r.week as f64, r.stat(stat))).collect(),
            }
        })
        .collect()
}

pub fn team_distribution<'a>(
    records: &'a [TeamWeekRecord],
    teams: &[String],
    stat: Stat,
) -> Vec<&'a TeamWeekRecord> {
    let mut rows: Vec<&TeamWeekRecord> = records
        .iter()
        .filter(|r| {
            let label = r.label();
            teams.iter().any(|t| *t == label)
        })
        .collect();
    rows.sort_by(|a, b| a.stat(stat).total_cmp(&b.stat(stat)));
    rows
}
