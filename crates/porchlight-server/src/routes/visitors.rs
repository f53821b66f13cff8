use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use porchlight_core::{
    event::DeviceType,
    service::{self, FilterRequest, ListRequest},
    store::VisitorFilter,
};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub days: Option<i64>,
}

/// `GET /api/analytics/visitors` — paginated newest-first listing over the
/// trailing `days` window.
#[tracing::instrument(skip(state))]
pub async fn list_visitors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let req = ListRequest {
        page: query.page,
        limit: query.limit,
        days: query.days,
    };
    let (page, meta) = service::list_visitors(state.store.as_ref(), req, Utc::now()).await?;
    Ok(Json(json!({
        "success": true,
        "data": page.data,
        "pagination": page.pagination,
        "meta": meta,
    })))
}

/// Query string for the filter endpoint. `pagePath` is the page-dimension
/// filter; plain `page` stays the pagination cursor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub days: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub page_path: Option<String>,
}

fn parse_date(raw: &str, name: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::BadRequest(format!("{name} must be an RFC 3339 timestamp")))
}

/// `GET /api/analytics/filter` — paginated retrieval with equality
/// filters and an optional explicit date range. An explicit `startDate`
/// replaces the `days` window; `endDate` is honored only alongside
/// `startDate`.
#[tracing::instrument(skip(state))]
pub async fn filter_visitors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<impl IntoResponse, AppError> {
    let start_date = query
        .start_date
        .as_deref()
        .map(|s| parse_date(s, "startDate"))
        .transpose()?;
    let end_date = query
        .end_date
        .as_deref()
        .map(|s| parse_date(s, "endDate"))
        .transpose()?;
    let device_type = query
        .device_type
        .as_deref()
        .map(|raw| {
            DeviceType::parse(raw).ok_or_else(|| {
                AppError::BadRequest(
                    "Invalid deviceType. Must be one of: mobile, tablet, desktop".to_string(),
                )
            })
        })
        .transpose()?;

    let req = FilterRequest {
        page: query.page,
        limit: query.limit,
        days: query.days,
        start_date,
        end_date,
        filter: VisitorFilter {
            country: query.country,
            city: query.city,
            device_type,
            browser: query.browser,
            os: query.os,
            page: query.page_path,
        },
    };
    let (page, meta) = service::filter_visitors(state.store.as_ref(), req, Utc::now()).await?;
    Ok(Json(json!({
        "success": true,
        "data": page.data,
        "pagination": page.pagination,
        "meta": meta,
    })))
}
