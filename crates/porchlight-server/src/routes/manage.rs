use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use porchlight_core::service::{self, BulkDeleteRequest};

use crate::{error::AppError, state::AppState};

/// `DELETE /api/analytics/visitor/{id}` — remove one record by id.
#[tracing::instrument(skip(state))]
pub async fn delete_visitor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    service::delete_visitor(state.store.as_ref(), &id).await?;
    tracing::info!(id = %id, "Deleted visitor record");
    Ok(Json(json!({
        "success": true,
        "message": "Visitor record deleted successfully",
    })))
}

/// `DELETE /api/analytics/bulk` — bulk delete by explicit id list or by
/// filter set with an optional trailing-day bound.
#[tracing::instrument(skip(state, body))]
pub async fn bulk_delete(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BulkDeleteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = service::bulk_delete(state.store.as_ref(), body, Utc::now()).await?;
    tracing::info!(deleted, "Bulk-deleted visitor records");
    Ok(Json(json!({
        "success": true,
        "data": { "deletedCount": deleted },
    })))
}

#[derive(Debug, Deserialize)]
pub struct ClearQuery {
    pub days: Option<i64>,
}

/// `DELETE /api/analytics/clear` — delete records older than `days` days,
/// or every record when `days` is absent. Deletes commit in batches; a
/// mid-run failure leaves earlier batches deleted.
#[tracing::instrument(skip(state))]
pub async fn clear_visitors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClearQuery>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = service::clear_visitors(state.store.as_ref(), query.days, Utc::now()).await?;
    tracing::info!(deleted, days = ?query.days, "Cleared visitor records");
    Ok(Json(json!({
        "success": true,
        "data": { "deletedCount": deleted },
    })))
}
