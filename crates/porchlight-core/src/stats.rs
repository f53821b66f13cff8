//! Aggregate statistics over a window of visitor events.
//!
//! Computed fresh on every stats request from the full window scan; nothing
//! here is persisted. O(events-in-window), which is fine at personal-site
//! traffic volumes.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::event::VisitorEvent;

/// Breakdowns by page and country report at most this many rows.
pub const TOP_LIMIT: usize = 10;
/// `recentVisitors` carries at most this many records.
pub const RECENT_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct PageCount {
    pub page: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountryCount {
    pub country: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceCount {
    #[serde(rename = "type")]
    pub device_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrowserCount {
    pub browser: String,
    pub count: u64,
}

/// The stats report. `totalVisitors` always equals `pageViews` — an
/// intentional simplification, kept for wire compatibility.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsStats {
    pub total_visitors: u64,
    pub unique_visitors: u64,
    pub page_views: u64,
    pub top_pages: Vec<PageCount>,
    pub top_countries: Vec<CountryCount>,
    pub device_types: Vec<DeviceCount>,
    pub browsers: Vec<BrowserCount>,
    pub recent_visitors: Vec<VisitorEvent>,
}

impl AnalyticsStats {
    pub fn empty() -> Self {
        Self {
            total_visitors: 0,
            unique_visitors: 0,
            page_views: 0,
            top_pages: Vec::new(),
            top_countries: Vec::new(),
            device_types: Vec::new(),
            browsers: Vec::new(),
            recent_visitors: Vec::new(),
        }
    }
}

/// Compute the full stats report from a newest-first window of events.
pub fn compute_stats(events: &[VisitorEvent]) -> AnalyticsStats {
    if events.is_empty() {
        return AnalyticsStats::empty();
    }

    let page_views = events.len() as u64;
    let unique_visitors = events
        .iter()
        .map(|e| e.session_id.as_str())
        .collect::<HashSet<_>>()
        .len() as u64;

    let top_pages = sorted_counts(count_by(events.iter().map(|e| e.page.as_str())), Some(TOP_LIMIT))
        .into_iter()
        .map(|(page, count)| PageCount { page, count })
        .collect();

    let top_countries = sorted_counts(
        count_by(events.iter().filter_map(|e| e.country.as_deref())),
        Some(TOP_LIMIT),
    )
    .into_iter()
    .map(|(country, count)| CountryCount { country, count })
    .collect();

    let device_types = sorted_counts(
        count_by(events.iter().map(|e| e.device_type.as_str())),
        None,
    )
    .into_iter()
    .map(|(device_type, count)| DeviceCount { device_type, count })
    .collect();

    let browsers = sorted_counts(count_by(events.iter().map(|e| e.browser.as_str())), None)
        .into_iter()
        .map(|(browser, count)| BrowserCount { browser, count })
        .collect();

    let recent_visitors = events.iter().take(RECENT_LIMIT).cloned().collect();

    AnalyticsStats {
        total_visitors: page_views,
        unique_visitors,
        page_views,
        top_pages,
        top_countries,
        device_types,
        browsers,
        recent_visitors,
    }
}

fn count_by<'a>(values: impl Iterator<Item = &'a str>) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for value in values {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Sort counts descending. Equal counts tie-break lexicographically on the
/// key so rankings are deterministic regardless of store result order.
fn sorted_counts(counts: HashMap<String, u64>, limit: Option<usize>) -> Vec<(String, u64)> {
    let mut rows: Vec<(String, u64)> = counts.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}
