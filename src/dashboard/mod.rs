use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::cache::Snapshot;
use crate::fixtures::Fixture;
use crate::predict::{predict, Prediction, Verdict};
use crate::service::FixtureService;

/// Shown when the sources had nothing; never replaced by invented fixtures.
const NO_MATCHES: &str = "No matches available";

#[derive(Clone)]
pub struct AppState {
    pub fixtures: FixtureService,
}

/// Build the Axum router for the fixtures API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/api/fixtures", get(fixtures_handler))
        .route("/api/predict", get(predict_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

#[derive(Debug, Deserialize)]
struct FixturesQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct FixturesResponse {
    /// False when no source produced fixtures; the UI decides what to show.
    available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    fixtures: Vec<FixtureView>,
}

#[derive(Debug, Serialize)]
struct FixtureView {
    #[serde(flatten)]
    fixture: Fixture,
    prediction: PredictionView,
}

#[derive(Debug, Serialize)]
struct PredictionView {
    #[serde(flatten)]
    split: Prediction,
    verdict: Verdict,
    confidence: f64,
}

impl From<Prediction> for PredictionView {
    fn from(split: Prediction) -> Self {
        PredictionView {
            verdict: split.verdict(),
            confidence: split.confidence(),
            split,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    cached_keys: usize,
    /// Today's entry is being fetched upstream right now.
    refreshing: bool,
    /// Seconds since today's entry was fetched, if there is one.
    cache_age_secs: Option<u64>,
    cached_fixtures: Option<usize>,
}

/// Never waits on an upstream refresh.
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let cache = state.fixtures.cache();
    let key = state.fixtures.cache_key(Utc::now());
    let snapshot = cache.peek(&key).await;
    let entry = match &snapshot {
        Snapshot::Entry(entry) => Some(entry),
        Snapshot::Missing | Snapshot::Refreshing => None,
    };

    Json(HealthResponse {
        status: "ok",
        cached_keys: cache.len().await,
        refreshing: matches!(snapshot, Snapshot::Refreshing),
        cache_age_secs: entry.map(|e| e.fetched_at.elapsed().as_secs()),
        cached_fixtures: entry.map(|e| e.fixtures.len()),
    })
}

/// GET /api/fixtures?limit=10
async fn fixtures_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<FixturesQuery>,
) -> Json<FixturesResponse> {
    let fixtures = state.fixtures.fixtures().await;
    let limit = q.limit.unwrap_or(usize::MAX);

    let views: Vec<FixtureView> = fixtures
        .iter()
        .take(limit)
        .map(|f| FixtureView {
            prediction: predict(&f.home_team, &f.away_team).into(),
            fixture: f.clone(),
        })
        .collect();

    Json(FixturesResponse {
        available: !fixtures.is_empty(),
        message: fixtures.is_empty().then_some(NO_MATCHES),
        fixtures: views,
    })
}

#[derive(Debug, Deserialize)]
struct PredictQuery {
    home: Option<String>,
    away: Option<String>,
}

/// GET /api/predict?home=Arsenal&away=Chelsea
async fn predict_handler(
    Query(q): Query<PredictQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let home = q.home.as_deref().map(str::trim).unwrap_or_default();
    let away = q.away.as_deref().map(str::trim).unwrap_or_default();
    if home.is_empty() || away.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "both 'home' and 'away' are required".to_string(),
        ));
    }
    Ok(Json(PredictionView::from(predict(home, away))))
}
