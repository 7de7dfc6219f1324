use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use kimp_core::query;
use kimp_core::{HealthReport, KimpService, PremiumRecord, Symbol, UpstreamFailure, UtcDateTime};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<KimpService>,
}

/// Create the API router.
///
/// Fixed `/kimp/...` paths are registered ahead of `/kimp/:symbol`.
pub fn create_router(service: Arc<KimpService>) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .route("/kimp", get(get_all))
        .route("/kimp/negative", get(get_negative))
        .route("/kimp/top/:n", get(get_top))
        .route("/kimp/:symbol", get(get_symbol))
        .route("/exchange-rate", get(get_exchange_rate))
        .route("/symbols", get(get_symbols))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ===== Route Handlers =====

async fn service_info() -> Json<serde_json::Value> {
    Json(json!({
        "service": "kimp",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Kimchi premium: Upbit KRW prices against Binance USDT prices converted at the live USD/KRW rate",
        "endpoints": {
            "/kimp": "premium for every tracked asset, highest first",
            "/kimp/{symbol}": "premium for one asset (case-insensitive)",
            "/kimp/top/{n}": "the n highest premiums (1-50)",
            "/kimp/negative": "assets trading below the converted foreign price",
            "/exchange-rate": "current USD/KRW rate",
            "/symbols": "assets present in the latest calculation",
            "/health": "upstream circuit states",
        },
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.service.health())
}

async fn get_all(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.service.snapshot().await;
    let records = query::require_data(&snapshot)?;

    Ok(Json(KimpListResponse {
        count: records.len(),
        exchange_rate: snapshot.exchange_rate.usd_to_domestic,
        is_fallback_rate: snapshot.exchange_rate.is_fallback,
        timestamp: snapshot.generated_at,
        data: records,
        warnings: &snapshot.failures,
    })
    .into_response())
}

async fn get_symbol(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Response, ApiError> {
    let snapshot = state.service.snapshot().await;
    let record = query::find_by_symbol(&snapshot, &symbol)?;

    Ok(Json(SymbolResponse {
        symbol: &record.display_name,
        exchange_rate: snapshot.exchange_rate.usd_to_domestic,
        timestamp: snapshot.generated_at,
        data: record,
    })
    .into_response())
}

async fn get_top(
    State(state): State<AppState>,
    Path(raw_n): Path<String>,
) -> Result<Response, ApiError> {
    // Rejected before any upstream call.
    let n = query::parse_top_n(&raw_n)?;
    let snapshot = state.service.snapshot().await;
    let records = query::top_n(&snapshot, n)?;

    Ok(Json(TopResponse {
        count: records.len(),
        top_n: n,
        exchange_rate: snapshot.exchange_rate.usd_to_domestic,
        timestamp: snapshot.generated_at,
        data: records,
    })
    .into_response())
}

async fn get_negative(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.service.snapshot().await;
    let records = query::negative(&snapshot)?;

    Ok(Json(NegativeResponse {
        count: records.len(),
        exchange_rate: snapshot.exchange_rate.usd_to_domestic,
        timestamp: snapshot.generated_at,
        data: records,
    })
    .into_response())
}

async fn get_exchange_rate(State(state): State<AppState>) -> Json<ExchangeRateResponse> {
    let rate = state.service.exchange_rate().await;
    Json(ExchangeRateResponse {
        usd_krw: rate.usd_to_domestic,
        is_fallback: rate.is_fallback,
        timestamp: UtcDateTime::now(),
    })
}

async fn get_symbols(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.service.snapshot().await;
    let symbols = query::symbols(&snapshot)?;

    Ok(Json(SymbolsResponse {
        count: symbols.len(),
        symbols,
        timestamp: snapshot.generated_at,
    })
    .into_response())
}

// ===== Response Types =====

#[derive(Serialize)]
struct KimpListResponse<'a> {
    count: usize,
    exchange_rate: f64,
    is_fallback_rate: bool,
    timestamp: UtcDateTime,
    data: &'a [PremiumRecord],
    warnings: &'a [UpstreamFailure],
}

#[derive(Serialize)]
struct SymbolResponse<'a> {
    symbol: &'a Symbol,
    exchange_rate: f64,
    timestamp: UtcDateTime,
    data: &'a PremiumRecord,
}

#[derive(Serialize)]
struct TopResponse<'a> {
    count: usize,
    top_n: usize,
    exchange_rate: f64,
    timestamp: UtcDateTime,
    data: &'a [PremiumRecord],
}

#[derive(Serialize)]
struct NegativeResponse<'a> {
    count: usize,
    exchange_rate: f64,
    timestamp: UtcDateTime,
    data: Vec<&'a PremiumRecord>,
}

#[derive(Serialize)]
struct ExchangeRateResponse {
    usd_krw: f64,
    is_fallback: bool,
    timestamp: UtcDateTime,
}

#[derive(Serialize)]
struct SymbolsResponse<'a> {
    count: usize,
    symbols: Vec<&'a Symbol>,
    timestamp: UtcDateTime,
}
