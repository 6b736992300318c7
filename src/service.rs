use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::FixtureCache;
use crate::fixtures::{Fixture, NormalizeOptions};
use crate::sources::SourceChain;

/// Knobs that shape one fixture request.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub ttl: Duration,
    pub lookahead_days: u32,
    pub display_offset: FixedOffset,
    pub upcoming_only: bool,
}

/// Cache-fronted access to the source chain. Cheap to clone; handlers get
/// their own copy through the router state.
#[derive(Clone)]
pub struct FixtureService {
    chain: Arc<SourceChain>,
    cache: FixtureCache,
    settings: FeedSettings,
}

impl FixtureService {
    pub fn new(chain: SourceChain, cache: FixtureCache, settings: FeedSettings) -> Self {
        FixtureService {
            chain: Arc::new(chain),
            cache,
            settings,
        }
    }

    pub fn cache(&self) -> &FixtureCache {
        &self.cache
    }

    /// Cache key for requests made at `now`: chain identity, window length
    /// and the calendar day in the display offset. The key changes at local
    /// midnight, so yesterday's entry is simply never read again.
    pub fn cache_key(&self, now: DateTime<Utc>) -> String {
        let day = now.with_timezone(&self.settings.display_offset).date_naive();
        format!(
            "{}|{}d|{}",
            self.chain.identity(),
            self.settings.lookahead_days,
            day.format("%Y-%m-%d")
        )
    }

    /// Fixtures for today plus the lookahead window.
    pub async fn fixtures(&self) -> Arc<Vec<Fixture>> {
        self.fixtures_at(Utc::now()).await
    }

    pub async fn fixtures_at(&self, now: DateTime<Utc>) -> Arc<Vec<Fixture>> {
        let key = self.cache_key(now);
        let opts = NormalizeOptions {
            display_offset: self.settings.display_offset,
            window_start: now,
            lookahead_days: self.settings.lookahead_days,
            upcoming_only: self.settings.upcoming_only,
        };
        debug!("Fixture request for key '{}'", key);

        let chain = Arc::clone(&self.chain);
        self.cache
            .get_or_fetch(&key, self.settings.ttl, || async move {
                chain.fetch_all(&opts).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::{fixture, StubSource};
    use crate::sources::{EmptyPolicy, FetchError};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn settings(offset_hours: i32) -> FeedSettings {
        FeedSettings {
            ttl: Duration::from_secs(300),
            lookahead_days: 1,
            display_offset: FixedOffset::east_opt(offset_hours * 3600).unwrap(),
            upcoming_only: true,
        }
    }

    fn service(sources: &[&StubSource], offset_hours: i32) -> FixtureService {
        let chain = SourceChain::new(
            sources.iter().map(|s| s.boxed()).collect(),
            EmptyPolicy::Continue,
        );
        FixtureService::new(chain, FixtureCache::new(), settings(offset_hours))
    }

    #[test]
    fn test_cache_key_rolls_over_at_local_midnight() {
        let a = StubSource::ok("a", vec![]);
        let svc = service(&[&a], 2);
        assert_eq!(svc.cache_key(at("2025-01-01T21:59:00Z")), "a|1d|2025-01-01");
        assert_eq!(svc.cache_key(at("2025-01-01T22:00:00Z")), "a|1d|2025-01-02");
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_request_within_ttl_hits_cache() {
        let a = StubSource::failing("a", FetchError::Http(500));
        let b = StubSource::ok("b", vec![fixture("Arsenal", "Chelsea", "2025-01-01T15:00:00Z")]);
        let svc = service(&[&a, &b], 0);
        let now = at("2025-01-01T09:00:00Z");

        let first = svc.fixtures_at(now).await;
        let second = svc.fixtures_at(now).await;

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dedup_across_merged_sources_prefers_priority() {
        use crate::sources::{MergedSource, SourceAdapter};

        let high = StubSource::ok("high", vec![fixture("Arsenal", "Chelsea", "2025-01-01T15:00:00Z")]);
        let low = StubSource::ok("low", vec![fixture("Arsenal", "Chelsea", "2025-01-01T15:00:00Z")]);
        let merged: Arc<dyn SourceAdapter> =
            Arc::new(MergedSource::new("pl", vec![high.boxed(), low.boxed()]));
        let chain = SourceChain::new(vec![merged], EmptyPolicy::Continue);
        let svc = FixtureService::new(chain, FixtureCache::new(), settings(0));

        let out = svc.fixtures_at(at("2025-01-01T09:00:00Z")).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source_id, "high");
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_fresh_result_is_not_retried() {
        let a = StubSource::ok("a", vec![]);
        let svc = service(&[&a], 0);
        let now = at("2025-01-01T09:00:00Z");

        assert!(svc.fixtures_at(now).await.is_empty());
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(svc.fixtures_at(now).await.is_empty());
        assert_eq!(a.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_kickoffs_leave_in_display_offset() {
        let a = StubSource::ok("a", vec![fixture("Arsenal", "Chelsea", "2025-01-01T15:00:00Z")]);
        let svc = service(&[&a], 1);

        let out = svc.fixtures_at(at("2025-01-01T09:00:00Z")).await;
        assert_eq!(out[0].kickoff.to_rfc3339(), "2025-01-01T16:00:00+01:00");
    }
}
