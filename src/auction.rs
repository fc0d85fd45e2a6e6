use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::draft::position_label;
use crate::schedule::tolerant;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOwnership {
    #[serde(default)]
    auction_value_average: Option<f64>,
    #[serde(default)]
    average_draft_position: Option<f64>,
    #[serde(default)]
    percent_owned: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPoolPlayer {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    default_position_id: Option<u32>,
    #[serde(default)]
    injured: Option<bool>,
    #[serde(default)]
    ownership: Option<RawOwnership>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawPoolEntry {
    #[serde(default)]
    player: Option<RawPoolPlayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuctionPlayer {
    pub player_id: Option<i64>,
    pub player_name: Option<String>,
    pub position: Option<String>,
    pub average_auction_value: Option<f64>,
    pub average_draft_position: Option<f64>,
    pub percent_owned: Option<f64>,
    pub injured: Option<bool>,
}

pub fn parse_auction_players(payload: &Value) -> Result<Vec<AuctionPlayer>> {
    let players = payload
        .get("players")
        .and_then(|p| p.as_array())
        .ok_or_else(|| anyhow!("player pool payload has no `players` array"))?;

    Ok(players
        .iter()
        .filter_map(|item| tolerant::<RawPoolEntry>(item, "player pool").player)
        .map(|p| {
            let ownership = p.ownership.unwrap_or_default();
            AuctionPlayer {
                player_id: p.id,
                player_name: p.full_name,
                position: p
                    .default_position_id
                    .and_then(position_label)
                    .map(str::to_string),
                average_auction_value: ownership.auction_value_average,
                average_draft_position: ownership.average_draft_position,
                percent_owned: ownership.percent_owned,
                injured: p.injured,
            }
        })
        .collect())
}

/// Ascending ADP; players nobody drafts sink to the bottom.
pub fn sort_by_adp(players: &mut [AuctionPlayer]) {
    players.sort_by(|a, b| match (a.average_draft_position, b.average_draft_position) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}
