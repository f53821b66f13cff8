//! The analytics service layer: every operation the HTTP API exposes,
//! implemented over the [`VisitorStore`] trait. Handlers stay thin; all
//! window clamping, validation, pagination math, in-memory end-date
//! filtering, and delete chunking lives here, with `now` passed in
//! explicitly so each operation is deterministic under test.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::event::{DeviceType, NewVisitorEvent, TrackPayload, VisitorEvent};
use crate::sanitize::{
    clean, sanitize, BROWSER_MAX_LEN, CITY_MAX_LEN, COUNTRY_MAX_LEN, LANGUAGE_MAX_LEN, OS_MAX_LEN,
    PAGE_MAX_LEN, REFERRER_MAX_LEN, SCREEN_RESOLUTION_MAX_LEN, SESSION_ID_MAX_LEN,
    TIMEZONE_MAX_LEN, USER_AGENT_MAX_LEN,
};
use crate::stats::{compute_stats, AnalyticsStats};
use crate::store::{StoreQuery, VisitorFilter, VisitorStore, DELETE_BATCH_SIZE};

pub const DEFAULT_DAYS: i64 = 30;
pub const MAX_DAYS: i64 = 365;
pub const DEFAULT_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 100;

pub fn clamp_days(raw: Option<i64>) -> i64 {
    raw.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS)
}

pub fn clamp_limit(raw: Option<u32>) -> u32 {
    raw.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

pub fn clamp_page(raw: Option<u32>) -> u32 {
    raw.unwrap_or(1).max(1)
}

/// The effective window a stats or list response was computed over.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowMeta {
    pub days: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_count: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Clone)]
pub struct VisitorPage {
    pub data: Vec<VisitorEvent>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct FilterRequest {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub days: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub filter: VisitorFilter,
}

/// Date range and filters echoed back by the filter endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<i64>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub filters: VisitorFilter,
}

/// Body of DELETE /api/analytics/bulk: either an explicit id list or a
/// filter set with an optional lower-bound day count.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRequest {
    pub ids: Option<Vec<String>>,
    pub filters: Option<VisitorFilter>,
    pub days: Option<i64>,
}

/// Validate and sanitise a track submission into a storable event.
///
/// Required-field and enum violations reject the whole submission; every
/// optional free-text field is trimmed, angle-bracket-stripped, and capped.
pub fn build_event(payload: TrackPayload) -> Result<NewVisitorEvent, AnalyticsError> {
    let page = payload.page.as_deref().unwrap_or("");
    let session_id = payload.session_id.as_deref().unwrap_or("");
    let device_type_raw = payload.device_type.as_deref().unwrap_or("");
    let browser = payload.browser.as_deref().unwrap_or("");

    if page.is_empty() || session_id.is_empty() || device_type_raw.is_empty() || browser.is_empty()
    {
        return Err(AnalyticsError::Validation(
            "Missing required fields: page, sessionId, deviceType, browser".to_string(),
        ));
    }
    if page.chars().count() > PAGE_MAX_LEN {
        return Err(AnalyticsError::Validation(format!(
            "Page must be between 1 and {PAGE_MAX_LEN} characters"
        )));
    }
    if session_id.chars().count() > SESSION_ID_MAX_LEN {
        return Err(AnalyticsError::Validation(format!(
            "Session ID must be between 1 and {SESSION_ID_MAX_LEN} characters"
        )));
    }
    let device_type = DeviceType::parse(device_type_raw).ok_or_else(|| {
        AnalyticsError::Validation(
            "Invalid deviceType. Must be one of: mobile, tablet, desktop".to_string(),
        )
    })?;

    let optional = |value: &Option<String>, max: usize| {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(|v| clean(v, max))
    };

    Ok(NewVisitorEvent {
        page: sanitize(page),
        session_id: sanitize(session_id),
        is_new_session: payload.is_new_session.unwrap_or(false),
        device_type,
        browser: clean(browser, BROWSER_MAX_LEN),
        os: optional(&payload.os, OS_MAX_LEN).unwrap_or_default(),
        user_agent: optional(&payload.user_agent, USER_AGENT_MAX_LEN).unwrap_or_default(),
        referrer: optional(&payload.referrer, REFERRER_MAX_LEN).unwrap_or_default(),
        language: optional(&payload.language, LANGUAGE_MAX_LEN).unwrap_or_default(),
        screen_resolution: optional(&payload.screen_resolution, SCREEN_RESOLUTION_MAX_LEN)
            .unwrap_or_default(),
        timezone: optional(&payload.timezone, TIMEZONE_MAX_LEN).unwrap_or_default(),
        country: optional(&payload.country, COUNTRY_MAX_LEN),
        city: optional(&payload.city, CITY_MAX_LEN),
        ip: payload.ip.as_deref().filter(|v| !v.is_empty()).map(sanitize),
    })
}

/// Ingest one event: validate, sanitise, append exactly one record, return
/// it with the store-assigned id and timestamp.
pub async fn track(
    store: &dyn VisitorStore,
    payload: TrackPayload,
) -> Result<VisitorEvent, AnalyticsError> {
    let event = build_event(payload)?;
    Ok(store.insert(event).await?)
}

/// Compute aggregate statistics over the trailing `days` window.
pub async fn get_stats(
    store: &dyn VisitorStore,
    days: Option<i64>,
    now: DateTime<Utc>,
) -> Result<(AnalyticsStats, WindowMeta), AnalyticsError> {
    let days = clamp_days(days);
    let start = now - Duration::days(days);
    let events = store.query(&StoreQuery::since(start)).await?;
    let stats = compute_stats(&events);
    Ok((
        stats,
        WindowMeta {
            days,
            start_date: start,
            end_date: now,
        },
    ))
}

/// Paginated, unfiltered listing over the trailing `days` window.
pub async fn list_visitors(
    store: &dyn VisitorStore,
    req: ListRequest,
    now: DateTime<Utc>,
) -> Result<(VisitorPage, WindowMeta), AnalyticsError> {
    let page = clamp_page(req.page);
    let limit = clamp_limit(req.limit);
    let days = clamp_days(req.days);
    let start = now - Duration::days(days);

    let query = StoreQuery {
        since: Some(start),
        filter: VisitorFilter::default(),
        limit: Some(limit),
        offset: offset_for(page, limit),
    };
    let data = store.query(&query).await?;
    let total_count = store.count(&query.unpaginated()).await?;

    Ok((
        VisitorPage {
            data,
            pagination: paginate(page, limit, total_count),
        },
        WindowMeta {
            days,
            start_date: start,
            end_date: now,
        },
    ))
}

/// Paginated, filtered retrieval.
///
/// The store supports only a lower-bound timestamp filter alongside equality
/// filters, so when both `startDate` and `endDate` are present the upper
/// bound is applied in memory to the already-paginated page — the page may
/// come back shorter than `limit` even when more matches exist, and the
/// total comes from a second unpaginated query filtered the same way. The
/// two store calls are not transactional; concurrent writes can skew the
/// count against the page. An `endDate` without a `startDate` is ignored.
pub async fn filter_visitors(
    store: &dyn VisitorStore,
    req: FilterRequest,
    now: DateTime<Utc>,
) -> Result<(VisitorPage, FilterMeta), AnalyticsError> {
    let page = clamp_page(req.page);
    let limit = clamp_limit(req.limit);

    let (since, until, days) = match (req.start_date, req.end_date) {
        (Some(start), Some(end)) => (start, Some(end), None),
        (Some(start), None) => (start, None, None),
        _ => {
            let days = clamp_days(req.days);
            (now - Duration::days(days), None, Some(days))
        }
    };

    let query = StoreQuery {
        since: Some(since),
        filter: req.filter.clone(),
        limit: Some(limit),
        offset: offset_for(page, limit),
    };

    let mut data = store.query(&query).await?;
    if let Some(until) = until {
        data.retain(|e| e.timestamp <= until);
    }

    let total_count = match until {
        Some(until) => {
            let mut all = store.query(&query.unpaginated()).await?;
            all.retain(|e| e.timestamp <= until);
            all.len() as u64
        }
        None => store.count(&query.unpaginated()).await?,
    };

    Ok((
        VisitorPage {
            data,
            pagination: paginate(page, limit, total_count),
        },
        FilterMeta {
            days,
            start_date: since,
            end_date: until.unwrap_or(now),
            filters: req.filter,
        },
    ))
}

/// Delete one record by id, verifying existence first.
pub async fn delete_visitor(
    store: &dyn VisitorStore,
    id: &str,
) -> Result<VisitorEvent, AnalyticsError> {
    let existing = store
        .get(id)
        .await?
        .ok_or_else(|| AnalyticsError::NotFound("Visitor record not found".to_string()))?;
    store.delete_batch(std::slice::from_ref(&existing.id)).await?;
    Ok(existing)
}

/// Bulk delete by explicit id list or by filter set.
///
/// The id-list path commits one atomic batch and reports the input length —
/// unknown ids count toward the total, by contract. The filter path reports
/// the verified number of matched records.
pub async fn bulk_delete(
    store: &dyn VisitorStore,
    req: BulkDeleteRequest,
    now: DateTime<Utc>,
) -> Result<u64, AnalyticsError> {
    if let Some(ids) = req.ids.filter(|ids| !ids.is_empty()) {
        if ids.len() > DELETE_BATCH_SIZE {
            return Err(AnalyticsError::Validation(format!(
                "At most {DELETE_BATCH_SIZE} ids per bulk delete"
            )));
        }
        store.delete_batch(&ids).await?;
        return Ok(ids.len() as u64);
    }

    let filter = req.filters.unwrap_or_default();
    if filter.is_empty() {
        return Err(AnalyticsError::Validation(
            "Provide ids or at least one filter".to_string(),
        ));
    }

    let query = StoreQuery {
        since: req.days.map(|d| now - Duration::days(d.clamp(1, MAX_DAYS))),
        filter,
        limit: None,
        offset: 0,
    };
    let matched = store.query(&query).await?;
    let ids: Vec<String> = matched.into_iter().map(|e| e.id).collect();
    let mut deleted = 0u64;
    for chunk in ids.chunks(DELETE_BATCH_SIZE) {
        store.delete_batch(chunk).await?;
        deleted += chunk.len() as u64;
    }
    Ok(deleted)
}

/// Delete every record older than `now - days` (all records when `days` is
/// absent), committing sequential batches of at most [`DELETE_BATCH_SIZE`].
/// `days` clamps to `[1, MAX_DAYS]` like every other day window.
///
/// A failed batch aborts the operation; batches already committed stay
/// deleted. Re-invoking resumes naturally since deleted ids no longer match.
pub async fn clear_visitors(
    store: &dyn VisitorStore,
    days: Option<i64>,
    now: DateTime<Utc>,
) -> Result<u64, AnalyticsError> {
    let cutoff = days.map(|d| now - Duration::days(d.clamp(1, MAX_DAYS)));
    let ids = store.ids_older_than(cutoff).await?;
    let mut deleted = 0u64;
    for chunk in ids.chunks(DELETE_BATCH_SIZE) {
        store.delete_batch(chunk).await?;
        deleted += chunk.len() as u64;
    }
    Ok(deleted)
}

/// Row offset of `page`, in 64 bits so no clamped page/limit pair can
/// overflow.
fn offset_for(page: u32, limit: u32) -> u64 {
    (page as u64 - 1) * limit as u64
}

fn paginate(page: u32, limit: u32, total_count: u64) -> Pagination {
    let total_pages = total_count.div_ceil(limit as u64);
    Pagination {
        page,
        limit,
        total_count,
        total_pages,
        has_next: (page as u64) < total_pages,
        has_prev: page > 1,
    }
}
