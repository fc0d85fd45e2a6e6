use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::auction::AuctionPlayer;
use crate::draft::DraftRow;
use crate::matchup::{LuckRecord, TeamWeekRecord};
use crate::schedule::Game;
use crate::state::SeasonData;

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<Option<&str>> for Cell {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Cell::Blank, Cell::from)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Blank, Cell::Number)
    }
}

fn int_cell<T: Into<f64>>(value: Option<T>) -> Cell {
    value.map_or(Cell::Blank, |v| Cell::Number(v.into()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub games: usize,
    pub long_rows: usize,
    pub luck_rows: usize,
    pub draft_rows: usize,
}

pub fn export_season(path: &Path, data: &SeasonData) -> Result<ExportReport> {
    let games: Vec<Vec<Cell>> = data.games.iter().map(game_row).collect();
    let long: Vec<Vec<Cell>> = data.long_format.iter().map(long_row).collect();
    let mut luck = Vec::new();
    for (id, name) in &data.teams {
        luck.extend(data.luck_for(*id).iter().map(|r| luck_row(name, r)));
    }
    let draft: Vec<Vec<Cell>> = data.draft.iter().map(draft_row).collect();

    let mut workbook = Workbook::new();
    add_sheet(
        &mut workbook,
        "Games",
        &[
            "Week", "Type", "Home Team ID", "Home Team", "Home Points", "Away Team ID",
            "Away Team", "Away Points", "Home Margin", "Away Margin",
        ],
        &games,
    )?;
    add_sheet(
        &mut workbook,
        "LongFormat",
        &["Week", "Team", "Team ID", "Points", "Margin", "Type"],
        &long,
    )?;
    add_sheet(
        &mut workbook,
        "Luck",
        &[
            "Team", "Week", "Opponent", "Points", "Opponent Points", "Week Average",
            "Points For", "Points Against", "Result", "Type", "Region",
        ],
        &luck,
    )?;
    add_sheet(
        &mut workbook,
        "Draft",
        &[
            "Pick", "Player ID", "Player", "Drafter", "Position", "Pro Team", "Bid",
            "Keeper", "Season Average",
        ],
        &draft,
    )?;

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        games: games.len(),
        long_rows: long.len(),
        luck_rows: luck.len(),
        draft_rows: draft.len(),
    })
}

pub fn export_auction(path: &Path, players: &[AuctionPlayer]) -> Result<usize> {
    let rows: Vec<Vec<Cell>> = players
        .iter()
        .map(|p| {
            vec![
                p.player_id.map_or(Cell::Blank, |id| Cell::Number(id as f64)),
                p.player_name.as_deref().into(),
                p.position.as_deref().into(),
                p.average_auction_value.into(),
                p.average_draft_position.into(),
                p.percent_owned.into(),
                p.injured
                    .map_or(Cell::Blank, |i| Cell::from(if i { "yes" } else { "no" })),
            ]
        })
        .collect();

    let mut workbook = Workbook::new();
    add_sheet(
        &mut workbook,
        "AuctionRanks",
        &[
            "Player ID", "Player", "Position", "Avg Auction Value", "ADP", "% Owned", "Injured",
        ],
        &rows,
    )?;
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(rows.len())
}

fn game_row(g: &Game) -> Vec<Cell> {
    vec![
        f64::from(g.week).into(),
        g.kind.label().into(),
        int_cell(g.home_team_id),
        g.home_team.as_deref().into(),
        g.home_points.into(),
        int_cell(g.away_team_id),
        g.away_team.as_deref().into(),
        g.away_points.into(),
        g.home_margin.into(),
        g.away_margin.into(),
    ]
}

fn long_row(r: &TeamWeekRecord) -> Vec<Cell> {
    vec![
        f64::from(r.week).into(),
        Cell::Text(r.label()),
        int_cell(r.team_id),
        r.points.into(),
        r.margin.into(),
        r.kind.label().into(),
    ]
}

fn luck_row(team: &str, r: &LuckRecord) -> Vec<Cell> {
    vec![
        team.into(),
        f64::from(r.week).into(),
        r.opponent.as_deref().into(),
        r.team_points.into(),
        r.opponent_points.into(),
        r.weekly_average.into(),
        r.points_for.into(),
        r.points_against.into(),
        r.outcome.label().into(),
        r.kind.label().into(),
        r.region().label().into(),
    ]
}

fn draft_row(r: &DraftRow) -> Vec<Cell> {
    vec![
        int_cell(r.overall_pick),
        r.player_id.map_or(Cell::Blank, |id| Cell::Number(id as f64)),
        r.player.as_deref().into(),
        r.drafter.as_deref().into(),
        r.position.as_deref().into(),
        r.pro_team.as_deref().into(),
        r.bid_amount.into(),
        Cell::from(if r.keeper { "yes" } else { "no" }),
        r.season_average.into(),
    ]
}

fn add_sheet(workbook: &mut Workbook, name: &str, header: &[&str], rows: &[Vec<Cell>]) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(name)?;
    for (col_idx, title) in header.iter().enumerate() {
        sheet
            .write_string(0, col_idx as u16, *title)
            .with_context(|| format!("write header {name}:{col_idx}"))?;
    }
    write_rows(sheet, rows, 1)
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<Cell>], offset: u32) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        let r = offset + row_idx as u32;
        for (col_idx, value) in row.iter().enumerate() {
            let c = col_idx as u16;
            match value {
                Cell::Text(text) => {
                    worksheet.write_string(r, c, text)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(r, c, *n)?;
                }
                Cell::Blank => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_cells_are_blank_when_missing() {
        assert_eq!(Cell::from(None::<&str>), Cell::Blank);
        assert_eq!(Cell::from(None::<f64>), Cell::Blank);
        assert_eq!(int_cell(Some(3u32)), Cell::Number(3.0));
    }

    #[test]
    fn season_export_writes_workbook() {
        let data = SeasonData {
            season: 2021,
            teams: vec![(1, "A".to_string()), (2, "B".to_string())],
            games: vec![Game {
                week: 1,
                home_team_id: Some(1),
                away_team_id: Some(2),
                home_team: Some("A".to_string()),
                away_team: Some("B".to_string()),
                home_points: 100.0,
                away_points: 90.0,
                home_margin: 10.0,
                away_margin: -10.0,
                kind: crate::schedule::GameKind::Regular,
            }],
            long_format: Vec::new(),
            draft: Vec::new(),
            draft_error: None,
        };
        let long = crate::matchup::build_long_format(&data.games, 14);
        let data = SeasonData {
            long_format: long,
            ..data
        };
        let path = std::env::temp_dir().join(format!("ffl_terminal_export_{}.xlsx", std::process::id()));
        let report = export_season(&path, &data).unwrap();
        assert_eq!(
            report,
            ExportReport {
                games: 1,
                long_rows: 3,
                luck_rows: 2,
                draft_rows: 0,
            }
        );
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
    }
}
