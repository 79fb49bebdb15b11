use axum::{
    extract::{FromRequestParts, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::services::cache::CachedSnapshot;
use crate::services::charts::{change_series, price_series};
use crate::services::export::{to_csv, EXPORT_FILE_NAME};
use crate::services::ranking::{annotate_sign, top_n};
use crate::types::models::Timeframe;
use super::error::ApiError;
use super::state::AppState;

pub const MIN_TOP: usize = 1;
pub const MAX_TOP: usize = 100;
pub const DEFAULT_TOP: usize = 20;

/// `Query` whose rejections are reported as JSON `ApiError`s.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(Deserialize)]
pub struct TopParams {
    #[serde(default = "default_top")]
    pub top: usize,
}

#[derive(Deserialize)]
pub struct ChangeParams {
    #[serde(default = "default_top")]
    pub top: usize,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

fn default_top() -> usize {
    DEFAULT_TOP
}

fn default_timeframe() -> String {
    Timeframe::OneHour.label().to_string()
}

fn check_top(top: usize) -> Result<usize, ApiError> {
    if (MIN_TOP..=MAX_TOP).contains(&top) {
        Ok(top)
    } else {
        Err(ApiError::BadRequest(format!(
            "top must be between {} and {}, got {}",
            MIN_TOP, MAX_TOP, top
        )))
    }
}

fn snapshot_meta(cached: &CachedSnapshot) -> Value {
    json!({
        "generation": cached.generation,
        "fetched_at": cached.snapshot.fetched_at,
        "rows": cached.snapshot.len(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.cache.peek().await.map(|c| snapshot_meta(&c));
    Json(json!({ "status": "ok", "snapshot": snapshot }))
}

pub async fn get_coins(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TopParams>,
) -> Result<Json<Value>, ApiError> {
    let top = check_top(params.top)?;
    let cached = state.cache.current().await?;
    let view = top_n(&cached.snapshot, top);

    let rows: Vec<&[Value]> = view.rows.iter().map(|r| r.cells.as_slice()).collect();
    Ok(Json(json!({
        "columns": view.columns,
        "rows": rows,
        "dimension": { "rows": view.len(), "columns": view.columns.len() },
        "fetched_at": cached.snapshot.fetched_at,
        "snapshot": snapshot_meta(&cached),
    })))
}

pub async fn download_csv(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TopParams>,
) -> Result<impl IntoResponse, ApiError> {
    let top = check_top(params.top)?;
    let cached = state.cache.current().await?;
    let body = to_csv(&top_n(&cached.snapshot, top))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        body,
    ))
}

pub async fn price_chart(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TopParams>,
) -> Result<Json<Value>, ApiError> {
    let top = check_top(params.top)?;
    let cached = state.cache.current().await?;
    let view = top_n(&cached.snapshot, top);

    Ok(Json(json!({
        "top": view.len(),
        "bars": price_series(&view),
    })))
}

pub async fn change_chart(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ChangeParams>,
) -> Result<Json<Value>, ApiError> {
    let top = check_top(params.top)?;
    let timeframe: Timeframe = params.timeframe.parse().map_err(ApiError::BadRequest)?;
    let cached = state.cache.current().await?;
    let view = top_n(&cached.snapshot, top);

    let annotated = annotate_sign(&view.rows, &state.cache.mapping().change_columns());
    let series = change_series(&annotated, timeframe)
        .ok_or_else(|| ApiError::NotFound(format!("no change column for {}", timeframe)))?;

    Ok(Json(json!(series)))
}

pub async fn get_insights(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    if !state.insights_enabled {
        return Err(ApiError::NotFound("insights are disabled".to_string()));
    }
    let cached = state.cache.current().await?;
    let insights = cached.insights();

    Ok(Json(json!({
        "most_traded": insights.most_traded,
        "highest_ytd": insights.highest_ytd,
        "steady_growth": insights.steady_growth,
        "display": insights.display(),
        "snapshot": snapshot_meta(&cached),
    })))
}

pub async fn refresh(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    if state.refresh_limiter.check().is_err() {
        tracing::warn!("Rejected snapshot refresh: rate limit reached");
        return Err(ApiError::RateLimited);
    }

    let cached = state.cache.refresh().await?;
    Ok(Json(json!({ "refreshed": true, "snapshot": snapshot_meta(&cached) })))
}
