//! Fixture normalization: timezone conversion, lookahead-window filtering,
//! de-duplication and stable ordering.
//!
//! Input order matters. Callers pass fixtures in source-priority order, so
//! when two records describe the same match the first one (from the
//! higher-priority adapter) is the one kept.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};
use std::collections::HashSet;

use super::models::{Fixture, FixtureStatus};

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Canonical offset every kickoff is converted to
    pub display_offset: FixedOffset,
    /// "Now" for window purposes; the window starts at midnight of this day
    /// in the display offset
    pub window_start: DateTime<Utc>,
    /// Forward days to keep, not counting today
    pub lookahead_days: u32,
    /// Drop finished fixtures
    pub upcoming_only: bool,
}

pub fn normalize(raw: Vec<Fixture>, opts: &NormalizeOptions) -> Vec<Fixture> {
    let window_from = day_start(opts.window_start, opts.display_offset);
    // Past chrono's range the window is simply open-ended.
    let window_to = window_from
        .checked_add_signed(Duration::days(i64::from(opts.lookahead_days) + 1))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let mut seen: HashSet<(String, String, i64)> = HashSet::new();
    let mut out: Vec<Fixture> = Vec::with_capacity(raw.len());

    for mut fixture in raw {
        if opts.upcoming_only && fixture.status == FixtureStatus::Finished {
            continue;
        }

        let kickoff_utc = fixture.kickoff.with_timezone(&Utc);
        let in_window = kickoff_utc >= window_from && kickoff_utc < window_to;
        // A live match that kicked off before midnight is still relevant.
        let live_carryover = fixture.status == FixtureStatus::Live && kickoff_utc < window_to;
        if !in_window && !live_carryover {
            continue;
        }

        let key = (
            fixture.home_team.trim().to_string(),
            fixture.away_team.trim().to_string(),
            kickoff_utc.timestamp().div_euclid(60),
        );
        if !seen.insert(key) {
            continue;
        }

        fixture.kickoff = fixture.kickoff.with_timezone(&opts.display_offset);
        out.push(fixture);
    }

    out.sort_by(|a, b| {
        a.kickoff
            .cmp(&b.kickoff)
            .then_with(|| a.competition.cmp(&b.competition))
    });
    out
}

/// Midnight of `at`'s calendar day in `offset`, expressed in UTC.
pub fn day_start(at: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = at
        .with_timezone(&offset)
        .date_naive()
        .and_time(NaiveTime::default());
    offset
        .from_local_datetime(&local_midnight)
        .single()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(at)
}
