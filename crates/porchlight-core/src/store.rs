//! Visitor store abstraction.
//!
//! The store is treated as an external collaborator with a deliberately
//! narrow query surface: a lower-bound timestamp filter, equality filters on
//! the enumerated dimensions, newest-first ordering, limit/offset, and a
//! batched delete capped at [`DELETE_BATCH_SIZE`] ids. There is no native
//! upper-bound range filter in combination with equality filters; the
//! service layer applies `endDate` in memory on top of these primitives.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{DeviceType, NewVisitorEvent, VisitorEvent};

/// Maximum number of ids a single `delete_batch` call may carry. One batch
/// commits atomically; anything larger must be chunked by the caller.
pub const DELETE_BATCH_SIZE: usize = 500;

/// Closed set of equality filters. One optional field per supported
/// dimension — arbitrary field names never reach the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisitorFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
}

impl VisitorFilter {
    pub fn is_empty(&self) -> bool {
        self.country.is_none()
            && self.city.is_none()
            && self.device_type.is_none()
            && self.browser.is_none()
            && self.os.is_none()
            && self.page.is_none()
    }
}

/// One store query: lower-bound timestamp, equality filters, newest-first
/// ordering, optional limit/offset pagination.
#[derive(Debug, Clone, Default)]
pub struct StoreQuery {
    /// Inclusive lower bound on `timestamp`. `None` scans the whole collection.
    pub since: Option<DateTime<Utc>>,
    pub filter: VisitorFilter,
    pub limit: Option<u32>,
    /// `u64` so `(page - 1) * limit` cannot overflow for any valid page.
    pub offset: u64,
}

impl StoreQuery {
    pub fn since(since: DateTime<Utc>) -> Self {
        Self {
            since: Some(since),
            ..Self::default()
        }
    }

    /// The same query without pagination, as used for total counts.
    pub fn unpaginated(&self) -> Self {
        Self {
            since: self.since,
            filter: self.filter.clone(),
            limit: None,
            offset: 0,
        }
    }
}

/// The external document store holding visitor events.
///
/// Implementations assign `id` and `timestamp` at insert time; `timestamp`
/// must be monotonically non-decreasing per write so it can serve as the
/// ordering key. All query results are ordered newest-first.
#[async_trait]
pub trait VisitorStore: Send + Sync + 'static {
    /// Append one record, assigning id and write timestamp. Returns the
    /// stored record.
    async fn insert(&self, event: NewVisitorEvent) -> anyhow::Result<VisitorEvent>;

    /// Fetch records matching `query`, newest-first, honouring limit/offset.
    async fn query(&self, query: &StoreQuery) -> anyhow::Result<Vec<VisitorEvent>>;

    /// Count records matching `query`, ignoring its limit/offset.
    async fn count(&self, query: &StoreQuery) -> anyhow::Result<u64>;

    /// Look up a single record by id.
    async fn get(&self, id: &str) -> anyhow::Result<Option<VisitorEvent>>;

    /// Ids of all records with `timestamp < cutoff`; every id when `cutoff`
    /// is `None`. Used by the age-based clear operation.
    async fn ids_older_than(&self, cutoff: Option<DateTime<Utc>>) -> anyhow::Result<Vec<String>>;

    /// Delete up to [`DELETE_BATCH_SIZE`] records in one atomic batch.
    /// Unknown ids are no-ops. Implementations must reject larger batches.
    async fn delete_batch(&self, ids: &[String]) -> anyhow::Result<()>;

    /// Lightweight liveness check for the health endpoint.
    async fn ping(&self) -> anyhow::Result<()>;
}
