use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::Datelike;
use tracing_subscriber::EnvFilter;

use ffl_terminal::auction;
use ffl_terminal::config::arg_value;
use ffl_terminal::espn_api::fetch_player_defaults;
use ffl_terminal::export;

const DEFAULT_OUT: &str = "espn_auction_ranks.xlsx";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ffl_terminal=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let season = arg_value(&args, "--season")
        .map(|raw| raw.parse::<i32>().context("--season must be a year"))
        .transpose()?
        .unwrap_or_else(|| chrono::Local::now().year());
    let out = arg_value(&args, "--out")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT));

    let payload = fetch_player_defaults(season)?;
    let mut players = auction::parse_auction_players(&payload)?;
    if players.is_empty() {
        return Err(anyhow!("no players returned for {season}"));
    }
    auction::sort_by_adp(&mut players);
    let written = export::export_auction(&out, &players)?;

    println!("Auction ranks {season}");
    println!("Players: {written}");
    println!("Wrote: {}", out.display());
    Ok(())
}
