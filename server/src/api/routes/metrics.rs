//! Metric read and update endpoints

use axum::Json;
use axum::extract::{Path, State};
use axum::response::Html;
use osmetrics::model::{Metric, MetricKind};
use serde::Deserialize;

use crate::api::AppState;
use crate::api::extractors::JsonBody;
use crate::api::types::ApiError;

/// Body of `POST /value`
#[derive(Debug, Deserialize)]
pub struct ValueRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

async fn find_metric(state: &AppState, kind: &str, id: &str) -> Result<Metric, ApiError> {
    let kind: MetricKind = kind.parse()?;
    state
        .store
        .get_metric(id)
        .await?
        .filter(|metric| metric.kind() == kind)
        .ok_or_else(|| ApiError::metric_not_found(kind.as_str(), id))
}

/// `GET /` - every known metric id as an HTML list
pub async fn list_page(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let ids = state.store.known_metrics().await?;

    let mut page = String::from("<!DOCTYPE html>\n<html><head><title>Metrics</title></head><body>\n<ul>\n");
    for id in &ids {
        page.push_str("<li>");
        page.push_str(&escape_html(id));
        page.push_str("</li>\n");
    }
    page.push_str("</ul>\n</body></html>\n");
    Ok(Html(page))
}

/// `GET /value/{type}/{name}` - stored value as plain text
pub async fn get_value(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<String, ApiError> {
    let metric = find_metric(&state, &kind, &id).await?;
    Ok(metric.value().to_string())
}

/// `POST /value` - stored metric as JSON
pub async fn post_value(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<ValueRequest>,
) -> Result<Json<Metric>, ApiError> {
    let metric = find_metric(&state, &request.kind, &request.id).await?;
    Ok(Json(metric))
}

/// `POST /update/{type}/{name}/{value}` - save from raw path segments
pub async fn update_from_path(
    State(state): State<AppState>,
    Path((kind, id, raw)): Path<(String, String, String)>,
) -> Result<String, ApiError> {
    let metric = Metric::parse(&kind, &id, &raw)?;
    let stored = state.store.save_metric(metric).await?;
    tracing::debug!(id = stored.id(), kind = %stored.kind(), "Metric updated");
    Ok(stored.value().to_string())
}

/// `POST /update` - save one JSON metric
pub async fn update_json(
    State(state): State<AppState>,
    JsonBody(metric): JsonBody<Metric>,
) -> Result<Json<Metric>, ApiError> {
    let stored = state.store.save_metric(metric).await?;
    tracing::debug!(id = stored.id(), kind = %stored.kind(), "Metric updated");
    Ok(Json(stored))
}

/// `POST /updates` - save a JSON batch as one unit
pub async fn update_batch(
    State(state): State<AppState>,
    JsonBody(batch): JsonBody<Vec<Metric>>,
) -> Result<Json<Vec<Metric>>, ApiError> {
    if batch.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let count = batch.len();
    let stored = state.store.save_all_metrics(batch).await?;
    tracing::debug!(count, "Metric batch updated");
    Ok(Json(stored))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
