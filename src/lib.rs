pub mod auction;
pub mod config;
pub mod draft;
pub mod espn_api;
pub mod export;
pub mod http_cache;
pub mod http_client;
pub mod matchup;
pub mod schedule;
pub mod state;
