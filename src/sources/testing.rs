//! Scripted adapters for chain, cache and service tests.

use async_trait::async_trait;
use chrono::DateTime;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::error::FetchError;
use super::provider::SourceAdapter;
use crate::fixtures::{Fixture, FixtureStatus};

pub fn fixture(home: &str, away: &str, kickoff: &str) -> Fixture {
    Fixture {
        competition: "Premier League".into(),
        kickoff: DateTime::parse_from_rfc3339(kickoff).unwrap(),
        home_team: home.into(),
        away_team: away.into(),
        status: FixtureStatus::Scheduled,
        source_id: "stub".into(),
    }
}

/// Adapter returning a fixed result. Clones share the call counter.
#[derive(Clone)]
pub struct StubSource {
    name: String,
    result: Result<Vec<Fixture>, FetchError>,
    delay: Duration,
    timeout: Duration,
    calls: Arc<AtomicUsize>,
}

impl StubSource {
    pub fn ok(name: &str, fixtures: Vec<Fixture>) -> Self {
        let fixtures = fixtures
            .into_iter()
            .map(|mut f| {
                f.source_id = name.to_string();
                f
            })
            .collect();
        Self::with_result(name, Ok(fixtures))
    }

    pub fn failing(name: &str, err: FetchError) -> Self {
        Self::with_result(name, Err(err))
    }

    fn with_result(name: &str, result: Result<Vec<Fixture>, FetchError>) -> Self {
        StubSource {
            name: name.to_string(),
            result,
            delay: Duration::ZERO,
            timeout: Duration::from_secs(2),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn boxed(&self) -> Arc<dyn SourceAdapter> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl SourceAdapter for StubSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, _lookahead_days: u32) -> Result<Vec<Fixture>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }
}
