use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::error::FetchError;
use super::provider::SourceAdapter;
use super::wire::{
    build_client, date_range, get_json, parse_base_url, parse_kickoff, parse_record, records,
    season_start_year, utc,
};
use crate::fixtures::{Fixture, FixtureStatus};

const RAPIDAPI_HOST: &str = "api-football-v1.p.rapidapi.com";

/// Fixture provider backed by API-Football via RapidAPI.
/// Docs: <https://www.api-football.com/documentation-v3>
///
/// Requires a RapidAPI key; without one this adapter is never constructed.
pub struct ApiFootball {
    http: Client,
    name: String,
    api_key: String,
    /// Numeric API-Football league id, e.g. 39 for the Premier League
    league_id: u32,
    season: Option<i32>,
    /// Base URL for overriding in tests
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct FixtureRecord {
    fixture: FixtureInfo,
    league: LeagueInfo,
    teams: Teams,
}

#[derive(Debug, Deserialize)]
struct FixtureInfo {
    date: String,
    status: StatusInfo,
}

#[derive(Debug, Deserialize)]
struct StatusInfo {
    short: String,
}

#[derive(Debug, Deserialize)]
struct LeagueInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Teams {
    home: TeamInfo,
    away: TeamInfo,
}

#[derive(Debug, Deserialize)]
struct TeamInfo {
    name: String,
}

impl ApiFootball {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

    pub fn new(
        api_key: &str,
        league_id: u32,
        season: Option<i32>,
        base_url: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let timeout = timeout.unwrap_or(Self::DEFAULT_TIMEOUT);
        let base_url = base_url.unwrap_or("https://api-football-v1.p.rapidapi.com");
        parse_base_url(base_url)?;
        Ok(ApiFootball {
            http: build_client(timeout)?,
            name: format!("api-football:{}", league_id),
            api_key: api_key.to_string(),
            league_id,
            season,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl SourceAdapter for ApiFootball {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, lookahead_days: u32) -> Result<Vec<Fixture>, FetchError> {
        let now = Utc::now();
        let (from, to) = date_range(now.date_naive(), lookahead_days)?;
        let season = self.season.unwrap_or_else(|| season_start_year(now)).to_string();
        let league = self.league_id.to_string();
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();

        let url = Url::parse_with_params(
            &format!("{}/v3/fixtures", self.base_url),
            &[
                ("league", league.as_str()),
                ("season", season.as_str()),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("timezone", "UTC"),
            ],
        )
        .map_err(|e| FetchError::Request(e.to_string()))?;

        let headers = [
            ("x-rapidapi-key", self.api_key.as_str()),
            ("x-rapidapi-host", RAPIDAPI_HOST),
        ];
        let raw = get_json(&self.http, url, &headers, self.timeout).await?;
        parse_fixtures(&raw, &self.name)
    }
}

fn parse_fixtures(raw: &Value, source_id: &str) -> Result<Vec<Fixture>, FetchError> {
    // Quota and auth failures come back as 200 with a populated `errors`.
    let reported = match &raw["errors"] {
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => false,
    };
    if reported {
        debug!("API-Football errors: {}", raw["errors"]);
        return Err(FetchError::Parse(format!(
            "provider reported errors: {}",
            raw["errors"]
        )));
    }

    records(raw, "/response")?
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let rec: FixtureRecord = parse_record(i, v)?;
            let kickoff = parse_kickoff(&rec.fixture.date, utc()).ok_or_else(|| {
                FetchError::malformed(i, format!("invalid date '{}'", rec.fixture.date))
            })?;

            Ok(Fixture {
                competition: rec.league.name,
                kickoff,
                home_team: rec.teams.home.name,
                away_team: rec.teams.away.name,
                status: FixtureStatus::from_provider(&rec.fixture.status.short),
                source_id: source_id.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(home: &str, away: &str, date: &str, short: &str) -> Value {
        json!({
            "fixture": {
                "id": 1208021,
                "timezone": "UTC",
                "date": date,
                "status": { "long": "whatever", "short": short, "elapsed": null }
            },
            "league": { "id": 39, "name": "Premier League", "country": "England", "season": 2024 },
            "teams": {
                "home": { "id": 42, "name": home },
                "away": { "id": 49, "name": away }
            },
            "goals": { "home": null, "away": null }
        })
    }

    #[test]
    fn test_parse_fixtures() {
        let raw = json!({
            "get": "fixtures",
            "errors": [],
            "results": 2,
            "response": [
                record("Arsenal", "Chelsea", "2025-01-01T15:00:00+00:00", "NS"),
                record("Fulham", "Ipswich", "2025-01-01T12:30:00+00:00", "FT"),
            ]
        });
        let fixtures = parse_fixtures(&raw, "api-football:39").unwrap();
        assert_eq!(fixtures.len(), 2);
        assert_eq!(fixtures[0].competition, "Premier League");
        assert_eq!(fixtures[0].status, FixtureStatus::Scheduled);
        assert_eq!(fixtures[1].status, FixtureStatus::Finished);
        assert_eq!(fixtures[1].source_id, "api-football:39");
    }

    #[test]
    fn test_reported_errors_fail_the_fetch() {
        let raw = json!({
            "errors": { "token": "Error/Missing application key." },
            "response": []
        });
        assert!(matches!(parse_fixtures(&raw, "x"), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_missing_teams_is_malformed() {
        let mut rec = record("A", "B", "2025-01-01T15:00:00+00:00", "NS");
        rec.as_object_mut().unwrap().remove("teams");
        let raw = json!({ "errors": [], "response": [record("C", "D", "2025-01-01T15:00:00+00:00", "NS"), rec] });
        let err = parse_fixtures(&raw, "x").unwrap_err();
        assert!(matches!(err, FetchError::MalformedRecord { index: 1, .. }));
    }

    #[tokio::test]
    async fn test_fetch_sends_rapidapi_headers() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/v3/fixtures")
            .match_query(mockito::Matcher::Any)
            .match_header("x-rapidapi-key", "secret")
            .match_header("x-rapidapi-host", RAPIDAPI_HOST)
            .with_status(200)
            .with_body(json!({ "errors": [], "response": [] }).to_string())
            .create_async()
            .await;

        let source = ApiFootball::new("secret", 39, Some(2024), Some(&server.url()), None).unwrap();
        assert!(source.fetch(1).await.unwrap().is_empty());
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_rejects_unrepresentable_lookahead() {
        let server = mockito::Server::new_async().await;
        let source = ApiFootball::new("k", 39, Some(2024), Some(&server.url()), None).unwrap();
        assert!(matches!(
            source.fetch(u32::MAX).await,
            Err(FetchError::Request(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_forbidden() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/v3/fixtures")
            .match_query(mockito::Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let source = ApiFootball::new("bad", 39, Some(2024), Some(&server.url()), None).unwrap();
        assert_eq!(source.fetch(1).await.unwrap_err(), FetchError::Http(403));
    }
}
