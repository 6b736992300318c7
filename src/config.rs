use anyhow::{Context, Result};
use chrono::FixedOffset;
use clap::Parser;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::service::FeedSettings;
use crate::sources::{
    ApiFootball, EmptyPolicy, EspnScoreboard, MergedSource, OpenLigaDb, SourceAdapter,
    SourceChain, TheSportsDb,
};

/// Longest a full pass over the chain may take when every source hangs.
const MAX_CHAIN_LATENCY: Duration = Duration::from_secs(15);
/// Allowed per-source timeout.
const SOURCE_TIMEOUT_RANGE: std::ops::RangeInclusive<Duration> =
    Duration::from_secs(2)..=Duration::from_secs(5);
/// Furthest ahead a request may look; providers page far less than this.
const MAX_LOOKAHEAD_DAYS: u32 = 31;
/// Entries are keyed by day, so a longer TTL would never be read.
const MAX_TTL_SECS: u64 = 86_400;

/// Football fixture aggregator
#[derive(Parser, Debug, Clone)]
#[command(name = "fixture-feed", version, about)]
pub struct Config {
    /// Fixture sources in priority order, comma-separated.
    /// Forms: `api-football:<league-id>`, `espn:<slug>[+<slug>...]`,
    /// `openligadb:<league>`, `thesportsdb:<league-id>`; append `@<secs>`
    /// to override the source timeout.
    #[arg(
        long,
        env = "FIXTURE_SOURCES",
        value_delimiter = ',',
        default_value = "api-football:39,espn:eng.1+esp.1+ger.1,openligadb:bl1,thesportsdb:4328"
    )]
    pub sources: Vec<AdapterSpec>,

    /// Cache time-to-live in seconds
    #[arg(long, env = "CACHE_TTL_SECS", default_value = "600")]
    pub ttl_seconds: u64,

    /// Days ahead to include, not counting today
    #[arg(long, env = "LOOKAHEAD_DAYS", default_value = "7")]
    pub lookahead_days: u32,

    /// Display timezone as a whole-hour offset from UTC
    #[arg(long, env = "DISPLAY_TZ_OFFSET_HOURS", default_value = "0", allow_hyphen_values = true)]
    pub display_tz_offset_hours: i32,

    /// Also return finished matches from the window
    #[arg(long, env = "INCLUDE_FINISHED", default_value = "false")]
    pub include_finished: bool,

    /// What an empty result from a source means
    #[arg(long, env = "EMPTY_POLICY", value_enum, default_value = "continue")]
    pub empty_policy: EmptyPolicy,

    /// RapidAPI key for API-Football; api-football sources are skipped without it
    #[arg(long, env = "RAPIDAPI_KEY")]
    pub rapidapi_key: Option<String>,

    /// TheSportsDB API key (defaults to the public free-tier key)
    #[arg(long, env = "THESPORTSDB_API_KEY")]
    pub thesportsdb_api_key: Option<String>,

    /// API listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// Re-warm the cache every N seconds in the background (0 = off)
    #[arg(long, env = "WARM_INTERVAL_SECS", default_value = "0")]
    pub warm_interval_secs: u64,

    /// Fetch once, print the fixtures as JSON and exit
    #[arg(long)]
    pub once: bool,
}

/// One entry of the source priority list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterSpec {
    pub kind: AdapterKind,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterKind {
    ApiFootball { league_id: u32 },
    /// Several slugs become one merged source, first slug first
    Espn { leagues: Vec<String> },
    OpenLigaDb { league: String },
    TheSportsDb { league_id: u32 },
}

impl AdapterSpec {
    /// Effective timeout, falling back to the provider default.
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(match self.kind {
            AdapterKind::ApiFootball { .. } => ApiFootball::DEFAULT_TIMEOUT,
            AdapterKind::Espn { .. } => EspnScoreboard::DEFAULT_TIMEOUT,
            AdapterKind::OpenLigaDb { .. } => OpenLigaDb::DEFAULT_TIMEOUT,
            AdapterKind::TheSportsDb { .. } => TheSportsDb::DEFAULT_TIMEOUT,
        })
    }

    /// Build the adapter, or `None` when a required key is missing.
    pub fn build(&self, config: &Config) -> Result<Option<Arc<dyn SourceAdapter>>> {
        let timeout = Some(self.timeout());
        let adapter: Arc<dyn SourceAdapter> = match &self.kind {
            AdapterKind::ApiFootball { league_id } => match config.rapidapi_key.as_deref() {
                Some(key) => Arc::new(ApiFootball::new(key, *league_id, None, None, timeout)?),
                None => {
                    warn!("Skipping source '{}': RAPIDAPI_KEY not set", self);
                    return Ok(None);
                }
            },
            AdapterKind::Espn { leagues } if leagues.len() == 1 => {
                Arc::new(EspnScoreboard::new(&leagues[0], None, timeout)?)
            }
            AdapterKind::Espn { leagues } => {
                let members = leagues
                    .iter()
                    .map(|slug| {
                        EspnScoreboard::new(slug, None, timeout)
                            .map(|s| Arc::new(s) as Arc<dyn SourceAdapter>)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Arc::new(MergedSource::new(self.to_string(), members))
            }
            AdapterKind::OpenLigaDb { league } => {
                Arc::new(OpenLigaDb::new(league, None, None, timeout)?)
            }
            AdapterKind::TheSportsDb { league_id } => Arc::new(TheSportsDb::new(
                config.thesportsdb_api_key.as_deref(),
                *league_id,
                None,
                timeout,
            )?),
        };
        Ok(Some(adapter))
    }
}

impl FromStr for AdapterSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (body, timeout) = match s.split_once('@') {
            Some((body, secs)) => {
                let secs: u64 = secs
                    .parse()
                    .with_context(|| format!("invalid timeout in source '{}'", s))?;
                (body, Some(Duration::from_secs(secs)))
            }
            None => (s, None),
        };

        let (provider, arg) = body
            .split_once(':')
            .with_context(|| format!("source '{}' must look like <provider>:<league>", s))?;
        if arg.is_empty() {
            anyhow::bail!("source '{}' is missing its league", s);
        }
        let league_id = || {
            arg.parse::<u32>()
                .with_context(|| format!("source '{}' needs a numeric league id", s))
        };

        let kind = match provider.to_lowercase().as_str() {
            "api-football" | "apifootball" | "rapidapi" => AdapterKind::ApiFootball {
                league_id: league_id()?,
            },
            "espn" => {
                let leagues: Vec<String> = arg
                    .split('+')
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                if leagues.is_empty() {
                    anyhow::bail!("source '{}' is missing its league", s);
                }
                AdapterKind::Espn { leagues }
            }
            "openligadb" => AdapterKind::OpenLigaDb {
                league: arg.to_string(),
            },
            "thesportsdb" => AdapterKind::TheSportsDb {
                league_id: league_id()?,
            },
            other => anyhow::bail!("unknown source provider '{}'", other),
        };

        Ok(AdapterSpec { kind, timeout })
    }
}

impl fmt::Display for AdapterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AdapterKind::ApiFootball { league_id } => write!(f, "api-football:{}", league_id),
            AdapterKind::Espn { leagues } => write!(f, "espn:{}", leagues.join("+")),
            AdapterKind::OpenLigaDb { league } => write!(f, "openligadb:{}", league),
            AdapterKind::TheSportsDb { league_id } => write!(f, "thesportsdb:{}", league_id),
        }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sources.is_empty() {
            anyhow::bail!("at least one fixture source is required");
        }
        if self.ttl_seconds == 0 || self.ttl_seconds > MAX_TTL_SECS {
            anyhow::bail!("ttl_seconds must be between 1 and {}", MAX_TTL_SECS);
        }
        if self.lookahead_days > MAX_LOOKAHEAD_DAYS {
            anyhow::bail!("lookahead_days must be at most {}", MAX_LOOKAHEAD_DAYS);
        }
        if !(-12..=14).contains(&self.display_tz_offset_hours) {
            anyhow::bail!("display_tz_offset_hours must be between -12 and 14");
        }
        for spec in &self.sources {
            let t = spec.timeout();
            if !SOURCE_TIMEOUT_RANGE.contains(&t) {
                anyhow::bail!(
                    "timeout for source '{}' must be between {:?} and {:?}",
                    spec,
                    SOURCE_TIMEOUT_RANGE.start(),
                    SOURCE_TIMEOUT_RANGE.end()
                );
            }
        }
        let worst: Duration = self.sources.iter().map(AdapterSpec::timeout).sum();
        if worst > MAX_CHAIN_LATENCY {
            anyhow::bail!(
                "summed source timeouts ({:?}) exceed {:?}; drop a source or shorten timeouts",
                worst,
                MAX_CHAIN_LATENCY
            );
        }
        Ok(())
    }

    pub fn display_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.display_tz_offset_hours * 3600)
            .context("display offset out of range")
    }

    pub fn feed_settings(&self) -> Result<FeedSettings> {
        Ok(FeedSettings {
            ttl: Duration::from_secs(self.ttl_seconds),
            lookahead_days: self.lookahead_days,
            display_offset: self.display_offset()?,
            upcoming_only: !self.include_finished,
        })
    }

    /// Build the source chain, skipping sources whose keys are missing.
    pub fn build_chain(&self) -> Result<SourceChain> {
        let mut adapters = Vec::new();
        for spec in &self.sources {
            if let Some(adapter) = spec.build(self)? {
                adapters.push(adapter);
            }
        }
        let chain = SourceChain::new(adapters, self.empty_policy);
        if chain.is_empty() {
            anyhow::bail!("no usable fixture sources (check API keys)");
        }
        Ok(chain)
    }
}
