use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::error::FetchError;
use super::provider::SourceAdapter;
use super::wire::{build_client, get_json, parse_base_url, parse_kickoff, parse_record, records, season_start_year, utc};
use crate::fixtures::{Fixture, FixtureStatus};

/// Fixture provider backed by the free OpenLigaDB API.
/// Docs: <https://api.openligadb.de/index.html>
///
/// The match-data endpoint returns a whole season at once, so the lookahead
/// window is applied downstream by the normalizer.
pub struct OpenLigaDb {
    http: Client,
    name: String,
    league: String,
    /// Season start year; derived from today's date when unset
    season: Option<i32>,
    /// Base URL for overriding in tests
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchRecord {
    #[serde(default)]
    league_name: Option<String>,
    #[serde(rename = "matchDateTimeUTC", default)]
    match_date_time_utc: Option<String>,
    #[serde(default)]
    match_date_time: Option<String>,
    team1: Team,
    team2: Team,
    match_is_finished: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Team {
    team_name: String,
}

impl OpenLigaDb {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
    /// Nominal match length used to flag a started, unfinished match as live.
    const MATCH_LENGTH_MINUTES: i64 = 115;

    pub fn new(
        league: &str,
        season: Option<i32>,
        base_url: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let timeout = timeout.unwrap_or(Self::DEFAULT_TIMEOUT);
        let base_url = base_url.unwrap_or("https://api.openligadb.de");
        parse_base_url(base_url)?;
        Ok(OpenLigaDb {
            http: build_client(timeout)?,
            name: format!("openligadb:{}", league),
            league: league.to_string(),
            season,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn season_for(&self, now: DateTime<Utc>) -> i32 {
        self.season.unwrap_or_else(|| season_start_year(now))
    }
}

#[async_trait]
impl SourceAdapter for OpenLigaDb {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, _lookahead_days: u32) -> Result<Vec<Fixture>, FetchError> {
        let now = Utc::now();
        let url = Url::parse(&format!(
            "{}/getmatchdata/{}/{}",
            self.base_url,
            self.league,
            self.season_for(now)
        ))
        .map_err(|e| FetchError::Request(e.to_string()))?;

        let raw = get_json(&self.http, url, &[], self.timeout).await?;
        parse_match_data(&raw, &self.name, &self.league, now)
    }
}

fn parse_match_data(
    raw: &Value,
    source_id: &str,
    league: &str,
    now: DateTime<Utc>,
) -> Result<Vec<Fixture>, FetchError> {
    // OpenLigaDB local times are German time; only used when the UTC field is absent.
    let berlin = FixedOffset::east_opt(3600).unwrap_or_else(utc);

    records(raw, "")?
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let m: MatchRecord = parse_record(i, v)?;

            let kickoff = m
                .match_date_time_utc
                .as_deref()
                .and_then(|s| parse_kickoff(s, berlin))
                .or_else(|| {
                    m.match_date_time
                        .as_deref()
                        .and_then(|s| parse_kickoff(s, berlin))
                })
                .ok_or_else(|| FetchError::malformed(i, "missing or invalid kickoff"))?;

            let status = if m.match_is_finished {
                FixtureStatus::Finished
            } else {
                let started = kickoff.with_timezone(&Utc) <= now;
                let over = kickoff
                    .with_timezone(&Utc)
                    .checked_add_signed(ChronoDuration::minutes(OpenLigaDb::MATCH_LENGTH_MINUTES))
                    .is_some_and(|end| end <= now);
                match (started, over) {
                    (false, _) => FixtureStatus::Scheduled,
                    (true, false) => FixtureStatus::Live,
                    // Past kickoff + full length but not marked finished
                    (true, true) => FixtureStatus::Unknown,
                }
            };

            Ok(Fixture {
                competition: m.league_name.unwrap_or_else(|| league.to_string()),
                kickoff,
                home_team: m.team1.team_name,
                away_team: m.team2.team_name,
                status,
                source_id: source_id.to_string(),
            })
        })
        .collect()
}
