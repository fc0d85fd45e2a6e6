use std::ops::RangeInclusive;

use anyhow::{Context, Result, anyhow};
use chrono::Datelike;

const DEFAULT_MIN_SEASON: i32 = 2014;
const DEFAULT_MAX_SEASON: i32 = 2022;
const DEFAULT_PLAYOFF_WEEK: u32 = 14;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub swid: String,
    pub espn_s2: String,
}

#[derive(Debug, Clone)]
pub struct LeagueConfig {
    pub league_id: u64,
    pub credentials: Credentials,
    pub min_season: i32,
    pub max_season: i32,
    pub playoff_start_week: u32,
}

impl LeagueConfig {
    /// Loads `.env.local` then `.env` (real env vars win) and reads the league settings.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| std::env::var(key).ok(), chrono::Local::now().year())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, current_year: i32) -> Result<Self> {
        let league_id = lookup("LEAGUE_ID")
            .ok_or_else(|| anyhow!("LEAGUE_ID is not set"))?
            .trim()
            .parse::<u64>()
            .context("LEAGUE_ID must be an integer")?;

        let credentials = Credentials {
            swid: lookup("SWID").unwrap_or_default(),
            espn_s2: lookup("ESPN_S2").unwrap_or_default(),
        };

        let min_season = parse_or(&lookup, "FFL_MIN_SEASON", DEFAULT_MIN_SEASON);
        let max_season = parse_or(&lookup, "FFL_MAX_SEASON", DEFAULT_MAX_SEASON).min(current_year);
        if min_season > max_season {
            return Err(anyhow!(
                "empty season range {min_season}..={max_season}"
            ));
        }
        let playoff_start_week = parse_or(&lookup, "FFL_PLAYOFF_WEEK", DEFAULT_PLAYOFF_WEEK).max(1);

        Ok(Self {
            league_id,
            credentials,
            min_season,
            max_season,
            playoff_start_week,
        })
    }

    pub fn seasons(&self) -> RangeInclusive<i32> {
        self.min_season..=self.max_season
    }

    pub fn contains_season(&self, season: i32) -> bool {
        self.seasons().contains(&season)
    }

    /// Parses a `--season` value and checks it against the configured range.
    pub fn parse_season(&self, raw: &str) -> Result<i32> {
        let season = raw
            .trim()
            .parse::<i32>()
            .with_context(|| format!("season `{raw}` is not a year"))?;
        if !self.contains_season(season) {
            return Err(anyhow!(
                "season {season} is outside {}..={}",
                self.min_season,
                self.max_season
            ));
        }
        Ok(season)
    }
}

/// Value of `--name=value` or `--name value` in `args` (program name excluded).
pub fn arg_value(args: &[String], name: &str) -> Option<String> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(name).and_then(|rest| rest.strip_prefix('=')) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_or<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|val| val.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_league_id_is_set() {
        let cfg = LeagueConfig::from_lookup(lookup_from(&[("LEAGUE_ID", "12345")]), 2026).unwrap();
        assert_eq!(cfg.league_id, 12345);
        assert_eq!(cfg.seasons(), 2014..=2022);
        assert_eq!(cfg.playoff_start_week, 14);
        assert!(cfg.credentials.swid.is_empty());
    }

    #[test]
    fn missing_league_id_is_an_error() {
        assert!(LeagueConfig::from_lookup(lookup_from(&[]), 2026).is_err());
    }

    #[test]
    fn max_season_is_clamped_to_current_year() {
        let cfg = LeagueConfig::from_lookup(
            lookup_from(&[("LEAGUE_ID", "1"), ("FFL_MAX_SEASON", "2030")]),
            2024,
        )
        .unwrap();
        assert_eq!(cfg.max_season, 2024);
        assert!(cfg.contains_season(2024));
        assert!(!cfg.contains_season(2025));
    }

    #[test]
    fn season_argument_must_be_in_range() {
        let cfg = LeagueConfig::from_lookup(lookup_from(&[("LEAGUE_ID", "1")]), 2026).unwrap();
        assert_eq!(cfg.parse_season(" 2019 ").unwrap(), 2019);
        assert!(cfg.parse_season("2013").is_err());
        assert!(cfg.parse_season("last year").is_err());
    }

    #[test]
    fn arg_value_accepts_both_forms() {
        let args: Vec<String> = ["--out", "x.xlsx", "--season=2021", "--empty="]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(arg_value(&args, "--season").as_deref(), Some("2021"));
        assert_eq!(arg_value(&args, "--out").as_deref(), Some("x.xlsx"));
        assert_eq!(arg_value(&args, "--empty"), None);
        assert_eq!(arg_value(&args, "--missing"), None);
    }

    #[test]
    fn unparseable_values_fall_back_to_defaults() {
        let cfg = LeagueConfig::from_lookup(
            lookup_from(&[("LEAGUE_ID", "1"), ("FFL_PLAYOFF_WEEK", "soon")]),
            2026,
        )
        .unwrap();
        assert_eq!(cfg.playoff_start_week, 14);
    }

    #[test]
    fn inverted_season_range_is_rejected() {
        let res = LeagueConfig::from_lookup(
            lookup_from(&[("LEAGUE_ID", "1"), ("FFL_MIN_SEASON", "2023"), ("FFL_MAX_SEASON", "2020")]),
            2026,
        );
        assert!(res.is_err());
    }
}
