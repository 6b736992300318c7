use async_trait::async_trait;
use std::time::Duration;

use super::error::FetchError;
use crate::fixtures::Fixture;

/// Trait that every upstream fixture provider must implement.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Fetch fixtures from today through `lookahead_days` days ahead.
    ///
    /// Kickoffs are returned in UTC; window filtering and display-offset
    /// conversion happen in the normalizer.
    async fn fetch(&self, lookahead_days: u32) -> Result<Vec<Fixture>, FetchError>;

    /// Human-readable name for logging and `Fixture::source_id`.
    fn name(&self) -> &str;

    /// Upper bound on one `fetch` call.
    fn timeout(&self) -> Duration;
}
