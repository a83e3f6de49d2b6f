// Branch Insights - Web Server
// REST API with Axum: every analysis over one export loaded at startup

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use branch_insights::logging;
use branch_insights::{
    AnalyticsConfig, AnomalyDetector, CustomerSegmenter, Dataset, Forecaster, GroupKey,
    HealthEngine, MarketingPlanner, ReorderPlanner,
    compare_branches, compare_periods, declining_branches, leaderboard, parse_instant,
    resolve_bounds,
};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Parser, Debug)]
#[command(name = "insights-server", version, about = "Branch analytics over HTTP")]
struct ServerArgs {
    /// JSON export with transactions, bookings and products
    #[arg(long)]
    data: PathBuf,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "0.0.0.0:3000")]
    addr: String,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    dataset: Arc<Dataset>,
    config: Arc<AnalyticsConfig>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        let body = Self {
            success: true,
            data: Some(data),
            error: None,
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}

fn bad_request(error: impl std::fmt::Display) -> Response {
    let body = ApiResponse::<()> {
        success: false,
        data: None,
        error: Some(error.to_string()),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Query parameters shared by every analysis endpoint
#[derive(Debug, Default, Deserialize)]
struct AnalysisQuery {
    as_of: Option<String>,
    branch: Option<String>,
    start: Option<String>,
    end: Option<String>,
    by: Option<String>,
    top: Option<usize>,
    threshold: Option<f64>,
}

impl AnalysisQuery {
    fn as_of(&self) -> branch_insights::Result<DateTime<Utc>> {
        match &self.as_of {
            Some(raw) => parse_instant(raw, true),
            None => Ok(Utc::now()),
        }
    }

    fn bounds(&self, as_of: DateTime<Utc>) -> branch_insights::Result<(DateTime<Utc>, DateTime<Utc>)> {
        resolve_bounds(self.start.as_deref(), self.end.as_deref(), as_of, 30)
    }

    /// Bounds for endpoints that always compare every branch
    fn cross_branch_bounds(&self) -> std::result::Result<(DateTime<Utc>, DateTime<Utc>), String> {
        if self.branch.is_some() {
            return Err("'branch' is not accepted here: results always cover every branch".to_string());
        }
        let as_of = self.as_of().map_err(|e| e.to_string())?;
        self.bounds(as_of).map_err(|e| e.to_string())
    }
}

impl AppState {
    /// The whole export, or only one branch's records
    fn scoped(&self, query: &AnalysisQuery) -> Arc<Dataset> {
        match &query.branch {
            Some(branch) => Arc::new(self.dataset.for_branch(branch)),
            None => Arc::clone(&self.dataset),
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Liveness check
async fn liveness() -> Response {
    ApiResponse::ok("OK")
}

/// GET /api/summary - Period comparison
async fn get_summary(State(state): State<AppState>, Query(query): Query<AnalysisQuery>) -> Response {
    let (start, end) = match query.as_of().and_then(|as_of| query.bounds(as_of)) {
        Ok(bounds) => bounds,
        Err(e) => return bad_request(e),
    };
    let dataset = state.scoped(&query);
    ApiResponse::ok(compare_periods(&dataset.transactions, start, end))
}

/// GET /api/branches - Per-branch revenue comparison
async fn get_branches(State(state): State<AppState>, Query(query): Query<AnalysisQuery>) -> Response {
    let (start, end) = match query.cross_branch_bounds() {
        Ok(bounds) => bounds,
        Err(e) => return bad_request(e),
    };
    ApiResponse::ok(compare_branches(&state.dataset.transactions, start, end))
}

/// GET /api/declines - Branches below the decline threshold
async fn get_declines(State(state): State<AppState>, Query(query): Query<AnalysisQuery>) -> Response {
    let (start, end) = match query.cross_branch_bounds() {
        Ok(bounds) => bounds,
        Err(e) => return bad_request(e),
    };
    let threshold = query.threshold.unwrap_or(state.config.report.decline_threshold_pct);
    ApiResponse::ok(declining_branches(&state.dataset.transactions, start, end, threshold))
}

/// GET /api/health-score - Weighted business health
async fn get_health_score(State(state): State<AppState>, Query(query): Query<AnalysisQuery>) -> Response {
    let as_of = match query.as_of() {
        Ok(as_of) => as_of,
        Err(e) => return bad_request(e),
    };
    let dataset = state.scoped(&query);
    let report = HealthEngine::new(state.config.health.clone()).score(
        &dataset.transactions,
        &dataset.bookings,
        &dataset.products,
        as_of,
    );
    ApiResponse::ok(report)
}

/// GET /api/anomalies - Unusual amounts and daily volumes
async fn get_anomalies(State(state): State<AppState>, Query(query): Query<AnalysisQuery>) -> Response {
    let as_of = match query.as_of() {
        Ok(as_of) => as_of,
        Err(e) => return bad_request(e),
    };
    let dataset = state.scoped(&query);
    ApiResponse::ok(AnomalyDetector::new(state.config.anomaly.clone()).detect(&dataset.transactions, as_of))
}

/// GET /api/forecast - Daily revenue forecast
async fn get_forecast(State(state): State<AppState>, Query(query): Query<AnalysisQuery>) -> Response {
    let as_of = match query.as_of() {
        Ok(as_of) => as_of,
        Err(e) => return bad_request(e),
    };
    let dataset = state.scoped(&query);
    ApiResponse::ok(Forecaster::new(state.config.forecast.clone()).forecast(&dataset.transactions, as_of))
}

/// GET /api/forecast/monthly - Monthly trend projection
async fn get_monthly(State(state): State<AppState>, Query(query): Query<AnalysisQuery>) -> Response {
    let as_of = match query.as_of() {
        Ok(as_of) => as_of,
        Err(e) => return bad_request(e),
    };
    let dataset = state.scoped(&query);
    let forecaster = Forecaster::new(state.config.forecast.clone());
    ApiResponse::ok(forecaster.monthly_projection(&dataset.transactions, as_of))
}

/// GET /api/segments - Customer segmentation
async fn get_segments(State(state): State<AppState>, Query(query): Query<AnalysisQuery>) -> Response {
    let as_of = match query.as_of() {
        Ok(as_of) => as_of,
        Err(e) => return bad_request(e),
    };
    let dataset = state.scoped(&query);
    let segmenter = CustomerSegmenter::new(state.config.segmentation.clone());
    ApiResponse::ok(segmenter.segment(&dataset.transactions, as_of))
}

/// GET /api/leaderboard?by=barber&top=10
async fn get_leaderboard(State(state): State<AppState>, Query(query): Query<AnalysisQuery>) -> Response {
    let key = match query.by.as_deref().unwrap_or("barber").parse::<GroupKey>() {
        Ok(key) => key,
        Err(e) => return bad_request(e),
    };
    let dataset = state.scoped(&query);
    let top_n = query.top.unwrap_or(state.config.report.top_n);
    ApiResponse::ok(leaderboard(&dataset.transactions, key, top_n))
}

/// GET /api/reorder - Reorder suggestions
async fn get_reorder(State(state): State<AppState>, Query(query): Query<AnalysisQuery>) -> Response {
    let as_of = match query.as_of() {
        Ok(as_of) => as_of,
        Err(e) => return bad_request(e),
    };
    let dataset = state.scoped(&query);
    let planner = ReorderPlanner::new(state.config.inventory.clone());
    ApiResponse::ok(planner.plan(&dataset.products, &dataset.transactions, as_of))
}

/// GET /api/marketing - Campaign and targeting suggestions
async fn get_marketing(State(state): State<AppState>, Query(query): Query<AnalysisQuery>) -> Response {
    let as_of = match query.as_of() {
        Ok(as_of) => as_of,
        Err(e) => return bad_request(e),
    };
    let dataset = state.scoped(&query);
    let planner = MarketingPlanner::new(state.config.marketing.clone(), state.config.segmentation.clone());
    ApiResponse::ok(planner.plan(&dataset.transactions, &dataset.bookings, as_of))
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(liveness))
        .route("/summary", get(get_summary))
        .route("/branches", get(get_branches))
        .route("/declines", get(get_declines))
        .route("/health-score", get(get_health_score))
        .route("/anomalies", get(get_anomalies))
        .route("/forecast", get(get_forecast))
        .route("/forecast/monthly", get(get_monthly))
        .route("/segments", get(get_segments))
        .route("/leaderboard", get(get_leaderboard))
        .route("/reorder", get(get_reorder))
        .route("/marketing", get(get_marketing))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_server_logger();
    let args = ServerArgs::parse();

    let dataset = Dataset::load(&args.data)
        .with_context(|| format!("Failed to load data from {}", args.data.display()))?;
    let config = match &args.config {
        Some(path) => AnalyticsConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalyticsConfig::default(),
    };

    let state = AppState {
        dataset: Arc::new(dataset),
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", args.addr))?;
    tracing::info!(addr = %args.addr, "Server running");

    axum::serve(listener, router(state))
        .await
        .context("Server stopped unexpectedly")?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
