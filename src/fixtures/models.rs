use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// A single scheduled or in-progress match.
///
/// Fixtures are plain values: every adapter call builds fresh ones and the
/// cache replaces them wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fixture {
    /// League or tournament display name
    pub competition: String,
    /// Kickoff time. Adapters emit UTC; the normalizer moves it to the
    /// display offset before the fixture leaves the aggregator.
    pub kickoff: DateTime<FixedOffset>,
    pub home_team: String,
    pub away_team: String,
    pub status: FixtureStatus,
    /// Name of the adapter that produced this record
    pub source_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixtureStatus {
    Scheduled,
    Live,
    Finished,
    Postponed,
    Unknown,
}

impl FixtureStatus {
    /// Map a provider-specific status string onto the fixed set.
    /// Unrecognised strings become `Unknown`.
    pub fn from_provider(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "ns" | "not started" | "scheduled" | "tbd" | "timed" | "pre"
            | "status_scheduled" => FixtureStatus::Scheduled,
            "1h" | "2h" | "ht" | "et" | "bt" | "p" | "live" | "in progress" | "in play"
            | "half time" | "halftime" | "in" | "status_in_progress" | "status_first_half"
            | "status_second_half" | "status_halftime" => FixtureStatus::Live,
            "ft" | "finished" | "match finished" | "aet" | "pen" | "post"
            | "status_full_time" | "status_final" | "status_final_aet"
            | "status_final_pen" => FixtureStatus::Finished,
            "pst" | "postponed" | "match postponed" | "susp" | "suspended"
            | "status_postponed" | "status_suspended" => FixtureStatus::Postponed,
            _ => FixtureStatus::Unknown,
        }
    }
}
