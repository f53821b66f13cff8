use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use porchlight_core::service;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub days: Option<i64>,
}

/// `GET /api/analytics/stats` — aggregate statistics over the trailing
/// `days` window (default 30, clamped to [1, 365]).
#[tracing::instrument(skip(state))]
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (stats, meta) =
        service::get_stats(state.store.as_ref(), query.days, chrono::Utc::now()).await?;
    Ok(Json(json!({
        "success": true,
        "data": stats,
        "meta": meta,
    })))
}
