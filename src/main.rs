use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info};

mod cache;
mod config;
mod dashboard;
mod fixtures;
mod predict;
mod service;
mod sources;

use cache::FixtureCache;
use config::Config;
use dashboard::AppState;
use service::FixtureService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let chain = config.build_chain()?;
    info!(
        "Configured {} fixture source(s): {} (worst case {:?})",
        chain.len(),
        chain.identity(),
        chain.worst_case_latency()
    );

    let service = FixtureService::new(chain, FixtureCache::new(), config.feed_settings()?);

    if config.once {
        let fixtures = service.fixtures().await;
        println!("{}", serde_json::to_string_pretty(fixtures.as_slice())?);
        return Ok(());
    }

    // Warm the cache so the first request does not pay for the chain
    let warmed = service.fixtures().await;
    info!("Startup fetch returned {} fixture(s)", warmed.len());

    if config.warm_interval_secs > 0 {
        let warm_service = service.clone();
        let period = Duration::from_secs(config.warm_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // First tick fires immediately; startup already warmed
            interval.tick().await;
            loop {
                interval.tick().await;
                let fixtures = warm_service.fixtures().await;
                let purged = warm_service.cache().purge_stale().await;
                debug!(
                    "Cache warm: {} fixture(s), {} stale key(s) purged",
                    fixtures.len(),
                    purged
                );
            }
        });
    }

    let app = dashboard::router(AppState { fixtures: service });
    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("Fixture API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
