use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use ffl_terminal::draft::{
    DraftFilter, build_draft_rows, fit_through_origin, parse_picks, parse_players,
};
use ffl_terminal::matchup::{Stat, build_long_format, build_luck, stat_quantiles};
use ffl_terminal::schedule::{RawGame, RawSide, RawTeam, normalize, parse_schedule, parse_teams};

const MATCHUP_JSON: &str = include_str!("../tests/fixtures/mmatchup.json");
const TEAM_JSON: &str = include_str!("../tests/fixtures/mteam.json");
const PLAYER_JSON: &str = include_str!("../tests/fixtures/kona_player_info.json");
const DRAFT_JSON: &str = include_str!("../tests/fixtures/mdraftdetail.json");

const TEAMS: u32 = 12;
const WEEKS: u32 = 17;

/// Round-robin-ish season: every team plays once per week.
fn synthetic_season() -> (Vec<RawGame>, Vec<RawTeam>) {
    let teams = (1..=TEAMS)
        .map(|id| RawTeam {
            id: Some(id),
            location: Some(format!("City {id}")),
            nickname: Some("Squad".to_string()),
        })
        .collect();
    let mut games = Vec::new();
    for week in 1..=WEEKS {
        for slot in 0..TEAMS / 2 {
            let home = slot + 1;
            let away = (slot + week) % (TEAMS / 2) + TEAMS / 2 + 1;
            let points = |id: u32| 70.0 + f64::from((id * 37 + week * 11) % 60) + 0.25;
            games.push(RawGame {
                matchup_period_id: Some(week),
                home: Some(RawSide {
                    team_id: Some(home),
                    total_points: Some(points(home)),
                }),
                away: Some(RawSide {
                    team_id: Some(away),
                    total_points: Some(points(away)),
                }),
            });
        }
    }
    (games, teams)
}

fn bench_fixture_parse(c: &mut Criterion) {
    c.bench_function("fixture_parse_normalize", |b| {
        b.iter(|| {
            let schedule: serde_json::Value = serde_json::from_str(black_box(MATCHUP_JSON)).unwrap();
            let teams: serde_json::Value = serde_json::from_str(black_box(TEAM_JSON)).unwrap();
            let games = normalize(
                &parse_schedule(&schedule).unwrap(),
                &parse_teams(&teams).unwrap(),
                14,
            );
            black_box(games.len());
        })
    });
}

fn bench_normalize(c: &mut Criterion) {
    let (games, teams) = synthetic_season();
    c.bench_function("normalize_season", |b| {
        b.iter(|| {
            let out = normalize(black_box(&games), black_box(&teams), 14);
            black_box(out.len());
        })
    });
}

fn bench_long_format(c: &mut Criterion) {
    let (games, teams) = synthetic_season();
    let games = normalize(&games, &teams, 14);
    c.bench_function("long_format_and_quantiles", |b| {
        b.iter(|| {
            let long = build_long_format(black_box(&games), 14);
            let boxes = stat_quantiles(&long, Stat::Margin);
            black_box(boxes.len());
        })
    });
}

fn bench_luck_all_teams(c: &mut Criterion) {
    let (games, teams) = synthetic_season();
    let games = normalize(&games, &teams, 14);
    c.bench_function("luck_all_teams", |b| {
        b.iter(|| {
            let total: usize = (1..=TEAMS)
                .map(|id| build_luck(black_box(&games), id).len())
                .sum();
            black_box(total);
        })
    });
}

fn bench_draft_rows(c: &mut Criterion) {
    let players: serde_json::Value = serde_json::from_str(PLAYER_JSON).unwrap();
    let picks: serde_json::Value = serde_json::from_str(DRAFT_JSON).unwrap();
    let teams: serde_json::Value = serde_json::from_str(TEAM_JSON).unwrap();
    let players = parse_players(&players).unwrap();
    let picks = parse_picks(&picks).unwrap();
    let teams = parse_teams(&teams).unwrap();
    let filter = DraftFilter {
        bid_amount: Some((1.0, 60.0)),
        ..DraftFilter::default()
    };

    c.bench_function("draft_rows_filter_fit", |b| {
        b.iter(|| {
            let rows = build_draft_rows(black_box(&picks), black_box(&players), &teams, 2021);
            let kept = filter.apply(&rows);
            black_box((kept.len(), fit_through_origin(&rows)));
        })
    });
}

criterion_group!(
    benches,
    bench_fixture_parse,
    bench_normalize,
    bench_long_format,
    bench_luck_all_teams,
    bench_draft_rows
);
criterion_main!(benches);
