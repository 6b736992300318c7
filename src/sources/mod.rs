pub mod api_football;
pub mod error;
pub mod espn;
pub mod merged;
pub mod openligadb;
pub mod provider;
pub mod thesportsdb;
mod wire;

#[cfg(test)]
pub(crate) mod testing;

pub use api_football::ApiFootball;
pub use error::FetchError;
pub use espn::EspnScoreboard;
pub use merged::MergedSource;
pub use openligadb::OpenLigaDb;
pub use provider::SourceAdapter;
pub use thesportsdb::TheSportsDb;

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::fixtures::{normalize, Fixture, NormalizeOptions};

/// What a successful-but-empty adapter result means for the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EmptyPolicy {
    /// Treat zero fixtures like a failure and try the next source.
    #[default]
    Continue,
    /// Trust the empty answer and stop.
    Stop,
}

/// Ordered list of sources tried strictly one after another.
///
/// The first source whose normalized result is non-empty wins and later
/// sources are never called. Adapter errors are logged here and never reach
/// the caller: `fetch_all` always yields a (possibly empty) list.
pub struct SourceChain {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    empty_policy: EmptyPolicy,
}

impl SourceChain {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, empty_policy: EmptyPolicy) -> Self {
        SourceChain {
            adapters,
            empty_policy,
        }
    }

    /// Stable identity of this configuration, used in cache keys.
    pub fn identity(&self) -> String {
        self.adapters
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>()
            .join(">")
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Upper bound on one `fetch_all` when every source times out.
    pub fn worst_case_latency(&self) -> Duration {
        self.adapters.iter().map(|a| a.timeout()).sum()
    }

    pub async fn fetch_all(&self, opts: &NormalizeOptions) -> Vec<Fixture> {
        for adapter in &self.adapters {
            let budget = adapter.timeout();
            let result =
                match tokio::time::timeout(budget, adapter.fetch(opts.lookahead_days)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(budget)),
                };

            let raw = match result {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(
                        "Source '{}' failed ({}): {}",
                        adapter.name(),
                        e.kind(),
                        e
                    );
                    continue;
                }
            };

            let raw_count = raw.len();
            let fixtures = normalize(raw, opts);
            if !fixtures.is_empty() {
                info!(
                    "Source '{}' returned {} fixtures ({} raw)",
                    adapter.name(),
                    fixtures.len(),
                    raw_count
                );
                return fixtures;
            }

            match self.empty_policy {
                EmptyPolicy::Stop => {
                    info!(
                        "Source '{}' has no fixtures in window; trusting empty result",
                        adapter.name()
                    );
                    return fixtures;
                }
                EmptyPolicy::Continue => {
                    info!(
                        "Source '{}' has no fixtures in window ({} raw); falling back",
                        adapter.name(),
                        raw_count
                    );
                }
            }
        }

        warn!(
            "All {} fixture sources failed or were empty",
            self.adapters.len()
        );
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::{fixture, StubSource};
    use chrono::{DateTime, FixedOffset, Utc};

    fn opts() -> NormalizeOptions {
        NormalizeOptions {
            display_offset: FixedOffset::east_opt(0).unwrap(),
            window_start: DateTime::parse_from_rfc3339("2025-01-01T08:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            lookahead_days: 2,
            upcoming_only: true,
        }
    }

    fn three() -> Vec<Fixture> {
        vec![
            fixture("Arsenal", "Chelsea", "2025-01-01T15:00:00Z"),
            fixture("Leeds", "Hull", "2025-01-01T12:00:00Z"),
            fixture("Spurs", "Wolves", "2025-01-02T19:45:00Z"),
        ]
    }

    #[tokio::test]
    async fn test_falls_back_and_stops_at_first_success() {
        let a = StubSource::failing("a", FetchError::Http(500));
        let b = StubSource::ok("b", three());
        let c = StubSource::ok("c", three());
        let chain = SourceChain::new(
            vec![a.boxed(), b.boxed(), c.boxed()],
            EmptyPolicy::Continue,
        );

        let out = chain.fetch_all(&opts()).await;
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|f| f.source_id == "b"));
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
        assert_eq!(c.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_result_continues_by_default() {
        let a = StubSource::ok("a", vec![]);
        let b = StubSource::ok("b", three());
        let chain = SourceChain::new(vec![a.boxed(), b.boxed()], EmptyPolicy::Continue);

        let out = chain.fetch_all(&opts()).await;
        assert_eq!(out.len(), 3);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_out_of_window_result_counts_as_empty() {
        let a = StubSource::ok("a", vec![fixture("Old", "Match", "2024-11-01T15:00:00Z")]);
        let b = StubSource::ok("b", three());
        let chain = SourceChain::new(vec![a.boxed(), b.boxed()], EmptyPolicy::Continue);

        let out = chain.fetch_all(&opts()).await;
        assert!(out.iter().all(|f| f.source_id == "b"));
    }

    #[tokio::test]
    async fn test_stop_policy_trusts_empty_result() {
        let a = StubSource::ok("a", vec![]);
        let b = StubSource::ok("b", three());
        let chain = SourceChain::new(vec![a.boxed(), b.boxed()], EmptyPolicy::Stop);

        assert!(chain.fetch_all(&opts()).await.is_empty());
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_stop_policy_still_skips_failures() {
        let a = StubSource::failing("a", FetchError::Parse("bad".into()));
        let b = StubSource::ok("b", three());
        let chain = SourceChain::new(vec![a.boxed(), b.boxed()], EmptyPolicy::Stop);

        assert_eq!(chain.fetch_all(&opts()).await.len(), 3);
    }

    #[tokio::test]
    async fn test_total_failure_is_empty_not_error() {
        let chain = SourceChain::new(
            vec![
                StubSource::failing("a", FetchError::Http(503)).boxed(),
                StubSource::ok("b", vec![]).boxed(),
            ],
            EmptyPolicy::Continue,
        );
        assert!(chain.fetch_all(&opts()).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_source_times_out() {
        let slow = StubSource::ok("slow", three())
            .with_delay(Duration::from_secs(30))
            .with_timeout(Duration::from_secs(2));
        let fast = StubSource::ok("fast", three());
        let chain = SourceChain::new(vec![slow.boxed(), fast.boxed()], EmptyPolicy::Continue);

        let started = tokio::time::Instant::now();
        let out = chain.fetch_all(&opts()).await;
        assert!(out.iter().all(|f| f.source_id == "fast"));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_identity_and_latency() {
        let chain = SourceChain::new(
            vec![
                StubSource::ok("a", vec![]).with_timeout(Duration::from_secs(4)).boxed(),
                StubSource::ok("b", vec![]).with_timeout(Duration::from_secs(3)).boxed(),
            ],
            EmptyPolicy::Continue,
        );
        assert_eq!(chain.identity(), "a>b");
        assert_eq!(chain.worst_case_latency(), Duration::from_secs(7));
    }
}
