use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::error::FetchError;
use super::provider::SourceAdapter;
use crate::fixtures::Fixture;

/// Composite adapter that queries several members concurrently (typically one
/// per league) and concatenates their fixtures in member order.
///
/// Member order is priority order: the normalizer keeps the first of any
/// duplicate, so overlapping coverage resolves in favour of earlier members.
/// The merge fails only when every member fails.
pub struct MergedSource {
    name: String,
    members: Vec<Arc<dyn SourceAdapter>>,
}

impl MergedSource {
    pub fn new(name: impl Into<String>, members: Vec<Arc<dyn SourceAdapter>>) -> Self {
        MergedSource {
            name: name.into(),
            members,
        }
    }
}

#[async_trait]
impl SourceAdapter for MergedSource {
    fn name(&self) -> &str {
        &self.name
    }

    /// Members run concurrently, so the slowest one bounds the call.
    fn timeout(&self) -> Duration {
        self.members
            .iter()
            .map(|m| m.timeout())
            .max()
            .unwrap_or(Duration::ZERO)
    }

    async fn fetch(&self, lookahead_days: u32) -> Result<Vec<Fixture>, FetchError> {
        let calls = self.members.iter().map(|m| {
            let m = Arc::clone(m);
            async move {
                match tokio::time::timeout(m.timeout(), m.fetch(lookahead_days)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(m.timeout())),
                }
            }
        });
        let results = futures_util::future::join_all(calls).await;

        let mut merged = Vec::new();
        let mut last_err = None;
        let mut any_ok = false;
        for (member, result) in self.members.iter().zip(results) {
            match result {
                Ok(fixtures) => {
                    any_ok = true;
                    merged.extend(fixtures);
                }
                Err(e) => {
                    warn!(
                        "{}: member '{}' failed ({}): {}",
                        self.name,
                        member.name(),
                        e.kind(),
                        e
                    );
                    last_err = Some(e);
                }
            }
        }

        match (any_ok, last_err) {
            (false, Some(e)) => Err(e),
            _ => Ok(merged),
        }
    }
}
