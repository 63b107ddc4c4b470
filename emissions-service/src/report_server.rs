use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use warehouse_client::{
    analytics::{CountryRank, CubeRow, LatestComparison, MovingAverage, SectorContribution},
    domain::MissingReference,
    ReportSet,
};

#[derive(Clone)]
struct SharedReports {
    reports: Arc<ReportSet>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ReportIndex {
    pub fingerprint: String,
    pub joined_rows: usize,
    pub reports: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct WindowParams {
    window: Option<usize>,
}

pub fn router(reports: Arc<ReportSet>) -> Router {
    Router::new()
        .route("/reports", get(index))
        .route("/reports/cube", get(cube_report))
        .route("/reports/country_rank", get(country_rank_report))
        .route("/reports/latest_comparison", get(latest_comparison_report))
        .route("/reports/moving_average", get(moving_average_report))
        .route("/reports/sector_contribution", get(sector_contribution_report))
        .route("/reports/exclusions", get(exclusions_report))
        .with_state(SharedReports { reports })
}

/// Serve the report set until the process is stopped.
pub async fn serve(bind_addr: &str, reports: Arc<ReportSet>) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server.bind_addr '{bind_addr}': {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, fingerprint = %reports.fingerprint, "report server listening");

    axum::serve(listener, router(reports).into_make_service()).await?;
    Ok(())
}

fn record_request(report: &'static str) {
    metrics::counter!("report_requests_total", "report" => report).increment(1);
}

async fn index(State(shared): State<SharedReports>) -> Json<ReportIndex> {
    record_request("index");
    let r = &shared.reports;
    Json(ReportIndex {
        fingerprint: r.fingerprint.clone(),
        joined_rows: r.joined_rows,
        reports: r.kinds().iter().map(|k| k.to_string()).collect(),
    })
}

async fn cube_report(State(shared): State<SharedReports>) -> Json<Vec<CubeRow>> {
    record_request("cube");
    Json(shared.reports.cube.clone())
}

async fn country_rank_report(State(shared): State<SharedReports>) -> Json<Vec<CountryRank>> {
    record_request("country_rank");
    Json(shared.reports.country_rank.clone())
}

async fn latest_comparison_report(
    State(shared): State<SharedReports>,
) -> Json<Vec<LatestComparison>> {
    record_request("latest_comparison");
    Json(shared.reports.latest_comparison.clone())
}

/// Without `?window=`, the smallest computed window is served.
async fn moving_average_report(
    State(shared): State<SharedReports>,
    Query(params): Query<WindowParams>,
) -> Result<Json<Vec<MovingAverage>>, (StatusCode, String)> {
    record_request("moving_average");
    let window = params
        .window
        .or_else(|| shared.reports.moving_averages.keys().next().copied())
        .ok_or((StatusCode::NOT_FOUND, "no moving average computed".to_string()))?;

    shared
        .reports
        .moving_average(window)
        .map(|rows| Json(rows.to_vec()))
        .map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))
}

async fn sector_contribution_report(
    State(shared): State<SharedReports>,
) -> Json<Vec<SectorContribution>> {
    record_request("sector_contribution");
    Json(shared.reports.sector_contribution.clone())
}

async fn exclusions_report(State(shared): State<SharedReports>) -> Json<Vec<MissingReference>> {
    record_request("exclusions");
    Json(shared.reports.exclusions.clone())
}
