//! HTTP and JSON helpers shared by the concrete adapters.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::error::FetchError;

const USER_AGENT: &str = concat!("fixture-feed/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

pub(crate) fn parse_base_url(base_url: &str) -> Result<Url> {
    Url::parse(base_url).with_context(|| format!("Invalid base URL '{}'", base_url))
}

/// Issue a single GET and decode the body as JSON. Anything other than a
/// 200 is an error.
pub(crate) async fn get_json(
    http: &Client,
    url: Url,
    headers: &[(&str, &str)],
    budget: Duration,
) -> Result<Value, FetchError> {
    debug!("GET {}", url);

    let mut req = http.get(url);
    for (name, value) in headers {
        req = req.header(*name, *value);
    }

    let resp = req
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(e, budget))?;

    if resp.status() != StatusCode::OK {
        return Err(FetchError::Http(resp.status().as_u16()));
    }

    let body = resp
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(e, budget))?;
    Ok(serde_json::from_str(&body)?)
}

/// The array of match records at `pointer` (JSON pointer, "" for the root).
pub(crate) fn records<'a>(raw: &'a Value, pointer: &str) -> Result<&'a [Value], FetchError> {
    raw.pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| FetchError::Parse(format!("expected an array at '{}'", pointer)))
}

/// Decode one record; a missing or mistyped required field makes the
/// whole response unusable.
pub(crate) fn parse_record<T: DeserializeOwned>(index: usize, v: &Value) -> Result<T, FetchError> {
    T::deserialize(v).map_err(|e| FetchError::malformed(index, e.to_string()))
}

pub(crate) fn utc() -> FixedOffset {
    Utc.fix()
}

/// Parse a provider kickoff string into a UTC-offset timestamp.
///
/// Strings carrying their own offset (or a trailing `Z`) are honoured;
/// bare local times are read in `provider_offset`.
pub(crate) fn parse_kickoff(s: &str, provider_offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&utc()));
    }

    let (naive_part, offset) = match s.strip_suffix('Z') {
        Some(rest) => (rest, utc()),
        None => (s, provider_offset),
    };

    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ];
    let naive = FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive_part, fmt).ok())?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&utc()))
}

/// Query range for a dated feed: one day either side of `[today, today +
/// lookahead]` so display offsets far from UTC still see their whole local
/// window.
pub(crate) fn date_range(
    today: NaiveDate,
    lookahead_days: u32,
) -> Result<(NaiveDate, NaiveDate), FetchError> {
    let from = today.checked_sub_days(Days::new(1));
    let to = today.checked_add_days(Days::new(u64::from(lookahead_days) + 1));
    from.zip(to).ok_or_else(|| {
        FetchError::Request(format!("lookahead of {} days is out of range", lookahead_days))
    })
}

/// European seasons start in July: 2025-03 belongs to the 2024 season.
pub(crate) fn season_start_year(now: DateTime<Utc>) -> i32 {
    if now.month() >= 7 {
        now.year()
    } else {
        now.year() - 1
    }
}
