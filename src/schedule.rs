//! Schedule normalization: ESPN `mMatchup` / `mTeam` payloads into a flat table
//! of played games with resolved team names.

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GameKind {
    Regular,
    Playoff,
}

impl GameKind {
    /// Inclusive on the playoff side: `week == playoff_start_week` is a playoff game.
    pub fn for_week(week: u32, playoff_start_week: u32) -> Self {
        if week >= playoff_start_week {
            GameKind::Playoff
        } else {
            GameKind::Regular
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GameKind::Regular => "Regular",
            GameKind::Playoff => "Playoff",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSide {
    #[serde(default)]
    pub team_id: Option<u32>,
    #[serde(default)]
    pub total_points: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGame {
    #[serde(default)]
    pub matchup_period_id: Option<u32>,
    #[serde(default)]
    pub home: Option<RawSide>,
    #[serde(default)]
    pub away: Option<RawSide>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawTeam {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl RawTeam {
    pub fn display_name(&self) -> Option<String> {
        let location = self.location.as_deref()?;
        let nickname = self.nickname.as_deref()?;
        Some(format!("{location} {nickname}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Game {
    pub week: u32,
    pub home_team_id: Option<u32>,
    pub away_team_id: Option<u32>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub home_points: f64,
    pub away_points: f64,
    pub home_margin: f64,
    pub away_margin: f64,
    pub kind: GameKind,
}

impl Game {
    pub fn involves(&self, team_id: u32) -> bool {
        self.home_team_id == Some(team_id) || self.away_team_id == Some(team_id)
    }
}

/// Season-scoped lookup from team id to display name.
#[derive(Debug, Clone, Default)]
pub struct TeamDirectory {
    names: HashMap<u32, Option<String>>,
}

impl TeamDirectory {
    pub fn from_raw(teams: &[RawTeam]) -> Self {
        let names = teams
            .iter()
            .filter_map(|t| Some((t.id?, t.display_name())))
            .collect();
        Self { names }
    }

    pub fn name(&self, team_id: Option<u32>) -> Option<String> {
        let id = team_id?;
        match self.names.get(&id) {
            Some(name) => name.clone(),
            None => {
                debug!(team_id = id, "team id has no team record");
                None
            }
        }
    }

    /// `(id, name)` pairs sorted by id; teams without a usable name are skipped.
    pub fn teams(&self) -> Vec<(u32, String)> {
        let mut out: Vec<(u32, String)> = self
            .names
            .iter()
            .filter_map(|(id, name)| name.clone().map(|n| (*id, n)))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }
}

/// The league document: `leagueHistory` answers with an array of season
/// objects, a direct season request with the object itself.
pub(crate) fn league_document(payload: &Value) -> Option<&Value> {
    match payload {
        Value::Array(items) => items.first(),
        Value::Object(_) => Some(payload),
        _ => None,
    }
}

pub(crate) fn league_array<'a>(payload: &'a Value, key: &str) -> Result<&'a Vec<Value>> {
    league_document(payload)
        .and_then(|doc| doc.get(key))
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow!("payload has no `{key}` array"))
}

/// Maps one record with serde; a record that doesn't fit becomes all-`None`
/// and is filtered downstream.
pub(crate) fn tolerant<T: for<'de> Deserialize<'de> + Default>(item: &Value, what: &str) -> T {
    match T::deserialize(item) {
        Ok(v) => v,
        Err(err) => {
            warn!(%err, "unreadable {what} record");
            T::default()
        }
    }
}

pub fn parse_schedule(payload: &Value) -> Result<Vec<RawGame>> {
    let games = league_array(payload, "schedule")?;
    if games.is_empty() {
        return Err(anyhow!("schedule payload is empty"));
    }
    Ok(games.iter().map(|g| tolerant(g, "schedule")).collect())
}

pub fn parse_teams(payload: &Value) -> Result<Vec<RawTeam>> {
    let teams = league_array(payload, "teams")?;
    if teams.is_empty() {
        return Err(anyhow!("teams payload is empty"));
    }
    Ok(teams.iter().map(|t| tolerant(t, "team")).collect())
}

pub fn normalize(games: &[RawGame], teams: &[RawTeam], playoff_start_week: u32) -> Vec<Game> {
    let directory = TeamDirectory::from_raw(teams);
    normalize_with(games, &directory, playoff_start_week)
}

pub fn normalize_with(
    games: &[RawGame],
    directory: &TeamDirectory,
    playoff_start_week: u32,
) -> Vec<Game> {
    let mut out = Vec::with_capacity(games.len());
    for raw in games {
        let home = raw.home.clone().unwrap_or_default();
        let away = raw.away.clone().unwrap_or_default();
        let (Some(week), Some(home_points), Some(away_points)) =
            (raw.matchup_period_id, home.total_points, away.total_points)
        else {
            continue;
        };
        let home_margin = home_points - away_points;
        out.push(Game {
            week,
            home_team_id: home.team_id,
            away_team_id: away.team_id,
            home_team: directory.name(home.team_id),
            away_team: directory.name(away.team_id),
            home_points,
            away_points,
            home_margin,
            away_margin: -home_margin,
            kind: GameKind::for_week(week, playoff_start_week),
        });
    }
    debug!(raw = games.len(), played = out.len(), "normalized schedule");
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(week: u32, home: Option<(u32, Option<f64>)>, away: Option<(u32, Option<f64>)>) -> RawGame {
        let side = |s: Option<(u32, Option<f64>)>| {
            s.map(|(id, pts)| RawSide {
                team_id: Some(id),
                total_points: pts,
            })
        };
        RawGame {
            matchup_period_id: Some(week),
            home: side(home),
            away: side(away),
        }
    }

    fn team(id: u32, location: &str, nickname: &str) -> RawTeam {
        RawTeam {
            id: Some(id),
            location: Some(location.to_string()),
            nickname: Some(nickname.to_string()),
        }
    }

    #[test]
    fn playoff_boundary_is_inclusive() {
        assert_eq!(GameKind::for_week(14, 14), GameKind::Playoff);
        assert_eq!(GameKind::for_week(13, 14), GameKind::Regular);
        assert_eq!(GameKind::for_week(17, 14), GameKind::Playoff);
    }

    #[test]
    fn bye_and_unplayed_games_are_dropped() {
        let games = vec![
            raw(1, Some((1, Some(100.0))), Some((2, Some(90.0)))),
            raw(1, Some((3, Some(80.0))), None),
            raw(2, Some((1, None)), Some((2, None))),
            raw(2, None, Some((4, Some(70.0)))),
        ];
        let out = normalize(&games, &[team(1, "A", "B")], 14);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].week, 1);
    }

    #[test]
    fn margins_are_inverse() {
        let games = vec![raw(3, Some((1, Some(101.5))), Some((2, Some(120.25))))];
        let out = normalize(&games, &[], 14);
        assert_eq!(out[0].home_margin, -18.75);
        assert_eq!(out[0].away_margin, -out[0].home_margin);
    }

    #[test]
    fn unknown_team_ids_yield_no_name() {
        let games = vec![raw(1, Some((1, Some(100.0))), Some((9, Some(90.0))))];
        let out = normalize(&games, &[team(1, "Gotham", "Knights")], 14);
        assert_eq!(out[0].home_team.as_deref(), Some("Gotham Knights"));
        assert_eq!(out[0].away_team, None);
        assert_eq!(out[0].away_team_id, Some(9));
    }

    #[test]
    fn display_name_needs_both_parts() {
        let partial = RawTeam {
            id: Some(5),
            location: Some("Nowhere".to_string()),
            nickname: None,
        };
        assert_eq!(partial.display_name(), None);
        let dir = TeamDirectory::from_raw(&[partial]);
        assert_eq!(dir.name(Some(5)), None);
        assert!(dir.teams().is_empty());
    }

    #[test]
    fn parse_tolerates_mistyped_records() {
        let payload = json!([{
            "schedule": [
                {"matchupPeriodId": 1, "home": {"teamId": 1, "totalPoints": 99.5}, "away": {"teamId": 2, "totalPoints": 80.0}},
                {"matchupPeriodId": "two", "home": {"teamId": 1}},
                {"home": {"teamId": 3, "totalPoints": 50.0}}
            ]
        }]);
        let games = parse_schedule(&payload).unwrap();
        assert_eq!(games.len(), 3);
        assert_eq!(games[1], RawGame::default());
        assert_eq!(games[2].matchup_period_id, None);
        assert_eq!(normalize(&games, &[], 14).len(), 1);
    }

    #[test]
    fn absent_payloads_fail_fast() {
        assert!(parse_schedule(&Value::Null).is_err());
        assert!(parse_schedule(&json!([])).is_err());
        assert!(parse_schedule(&json!([{"teams": []}])).is_err());
        assert!(parse_schedule(&json!([{"schedule": []}])).is_err());
        assert!(parse_teams(&json!([{"teams": []}])).is_err());
    }

    #[test]
    fn accepts_bare_league_object() {
        let payload = json!({"teams": [{"id": 1, "location": "Gotham", "nickname": "Knights"}]});
        let teams = parse_teams(&payload).unwrap();
        assert_eq!(teams[0].display_name().as_deref(), Some("Gotham Knights"));
    }
}
