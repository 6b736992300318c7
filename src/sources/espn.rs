use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::error::FetchError;
use super::provider::SourceAdapter;
use super::wire::{
    build_client, date_range, get_json, parse_base_url, parse_kickoff, parse_record, records, utc,
};
use crate::fixtures::{Fixture, FixtureStatus};

/// Fixture provider backed by ESPN's public soccer scoreboard.
///
/// `league` is ESPN's slug, e.g. `eng.1` (Premier League) or `ger.1`.
pub struct EspnScoreboard {
    http: Client,
    name: String,
    league: String,
    /// Base URL for overriding in tests
    base_url: String,
    timeout: Duration,
}

// ESPN wire shapes. Only the fields we need; everything else is ignored.

#[derive(Debug, Deserialize)]
struct EspnEvent {
    date: String,
    status: EspnStatus,
    competitions: Vec<EspnCompetition>,
}

#[derive(Debug, Deserialize)]
struct EspnStatus {
    #[serde(rename = "type")]
    status_type: EspnStatusType,
}

#[derive(Debug, Deserialize)]
struct EspnStatusType {
    name: String,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EspnCompetition {
    competitors: Vec<EspnCompetitor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnCompetitor {
    home_away: String,
    team: EspnTeam,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EspnTeam {
    display_name: String,
}

impl EspnScoreboard {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

    pub fn new(league: &str, base_url: Option<&str>, timeout: Option<Duration>) -> Result<Self> {
        let timeout = timeout.unwrap_or(Self::DEFAULT_TIMEOUT);
        let base_url = base_url.unwrap_or("https://site.api.espn.com");
        parse_base_url(base_url)?;
        Ok(EspnScoreboard {
            http: build_client(timeout)?,
            name: format!("espn:{}", league),
            league: league.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl SourceAdapter for EspnScoreboard {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, lookahead_days: u32) -> Result<Vec<Fixture>, FetchError> {
        let (from, to) = date_range(Utc::now().date_naive(), lookahead_days)?;
        let dates = format!("{}-{}", from.format("%Y%m%d"), to.format("%Y%m%d"));

        let url = Url::parse_with_params(
            &format!(
                "{}/apis/site/v2/sports/soccer/{}/scoreboard",
                self.base_url, self.league
            ),
            &[("dates", dates.as_str()), ("limit", "200")],
        )
        .map_err(|e| FetchError::Request(e.to_string()))?;

        let raw = get_json(&self.http, url, &[], self.timeout).await?;
        parse_scoreboard(&raw, &self.name, &self.league)
    }
}

fn parse_scoreboard(raw: &Value, source_id: &str, league: &str) -> Result<Vec<Fixture>, FetchError> {
    let competition = raw
        .pointer("/leagues/0/name")
        .and_then(Value::as_str)
        .unwrap_or(league)
        .to_string();

    records(raw, "/events")?
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let ev: EspnEvent = parse_record(i, v)?;

            let kickoff = parse_kickoff(&ev.date, utc())
                .ok_or_else(|| FetchError::malformed(i, format!("invalid date '{}'", ev.date)))?;

            let competitors = &ev
                .competitions
                .first()
                .ok_or_else(|| FetchError::malformed(i, "no competitions"))?
                .competitors;
            let side = |which: &str| {
                competitors
                    .iter()
                    .find(|c| c.home_away == which)
                    .map(|c| c.team.display_name.clone())
                    .ok_or_else(|| FetchError::malformed(i, format!("missing {} competitor", which)))
            };

            let mut status = FixtureStatus::from_provider(&ev.status.status_type.name);
            if status == FixtureStatus::Unknown {
                if let Some(state) = &ev.status.status_type.state {
                    status = FixtureStatus::from_provider(state);
                }
            }

            Ok(Fixture {
                competition: competition.clone(),
                kickoff,
                home_team: side("home")?,
                away_team: side("away")?,
                status,
                source_id: source_id.to_string(),
            })
        })
        .collect()
}
