use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use reqwest::header::COOKIE;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::{Credentials, LeagueConfig};
use crate::http_client::http_client;

const LEAGUE_HISTORY_BASE: &str = "https://fantasy.espn.com/apis/v3/games/ffl/leagueHistory";
const READS_BASE: &str = "https://lm-api-reads.fantasy.espn.com/apis/v3/games/ffl";
const FANTASY_FILTER_HEADER: &str = "x-fantasy-filter";
const PLAYER_POOL_LIMIT: u32 = 10_000;

pub const MATCHUP_VIEW: &str = "mMatchup";
pub const TEAM_VIEW: &str = "mTeam";
pub const DRAFT_VIEW: &str = "mDraftDetail";
pub const PLAYER_VIEW: &str = "kona_player_info";

/// Query parameters sent alongside a view. Ordered so that equal maps hash and
/// print identically.
pub type Params = BTreeMap<String, String>;

/// The single upstream operation the pipeline depends on.
pub trait Fetch {
    fn fetch(&self, endpoint: &str, params: &Params) -> Result<Arc<Value>>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn fetch(&self, endpoint: &str, params: &Params) -> Result<Arc<Value>> {
        (**self).fetch(endpoint, params)
    }
}

pub fn season_params(season: i32) -> Params {
    Params::from([("seasonId".to_string(), season.to_string())])
}

#[derive(Debug, Clone)]
pub struct EspnClient {
    league_id: u64,
    credentials: Credentials,
}

impl EspnClient {
    pub fn new(cfg: &LeagueConfig) -> Self {
        Self {
            league_id: cfg.league_id,
            credentials: cfg.credentials.clone(),
        }
    }

    pub fn league_url(&self) -> String {
        format!("{LEAGUE_HISTORY_BASE}/{}", self.league_id)
    }

    fn cookie_header(&self) -> Option<String> {
        let Credentials { swid, espn_s2 } = &self.credentials;
        if swid.trim().is_empty() && espn_s2.trim().is_empty() {
            return None;
        }
        Some(format!("swid={swid}; espn_s2={espn_s2}"))
    }
}

impl Fetch for EspnClient {
    fn fetch(&self, endpoint: &str, params: &Params) -> Result<Arc<Value>> {
        let client = http_client()?;
        let url = self.league_url();
        let mut query: Vec<(&str, &str)> = vec![("view", endpoint)];
        query.extend(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let mut req = client.get(&url).query(&query);
        if let Some(cookie) = self.cookie_header() {
            req = req.header(COOKIE, cookie);
        }
        debug!(%url, endpoint, ?params, "fetching league view");
        let resp = req
            .send()
            .with_context(|| format!("{endpoint} request failed"))?;
        read_json(resp).map(Arc::new)
    }
}

/// League-independent player pool ranked by PPR draft rank. Needs no credentials.
pub fn fetch_player_defaults(season: i32) -> Result<Value> {
    let client = http_client()?;
    let url = format!("{READS_BASE}/seasons/{season}/segments/0/leaguedefaults/3");
    let filter = json!({
        "players": {
            "limit": PLAYER_POOL_LIMIT,
            "sortDraftRanks": {"sortPriority": 100, "sortAsc": true, "value": "PPR"},
        }
    });
    debug!(%url, "fetching player defaults");
    let resp = client
        .get(&url)
        .query(&[("view", PLAYER_VIEW)])
        .header(FANTASY_FILTER_HEADER, filter.to_string())
        .send()
        .context("player defaults request failed")?;
    read_json(resp)
}

fn read_json(resp: reqwest::blocking::Response) -> Result<Value> {
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow!("http {}: {}", status, body));
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("empty response body"));
    }
    serde_json::from_str(trimmed).context("invalid json response")
}
