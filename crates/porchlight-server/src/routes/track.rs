use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use porchlight_core::{event::TrackPayload, service};

use crate::{error::AppError, state::AppState};

/// `POST /api/analytics/track` — ingest one page-view event.
///
/// Validates presence of `page`, `sessionId`, `deviceType`, `browser`,
/// length bounds on `page`/`sessionId`, and `deviceType` enum membership.
/// Any violation rejects the whole submission with `VALIDATION_ERROR` and
/// writes nothing. On success every optional free-text field is sanitised
/// and capped, the store assigns id and timestamp, and the stored record is
/// returned with `201 Created`.
#[tracing::instrument(skip(state, payload))]
pub async fn track(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TrackPayload>,
) -> Result<impl IntoResponse, AppError> {
    let record = service::track(state.store.as_ref(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Analytics event tracked successfully",
            "data": record,
        })),
    ))
}
