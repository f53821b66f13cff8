//! In-memory `VisitorStore` used by the service-layer tests. Mirrors the
//! store contract (newest-first ordering, equality filters, capped atomic
//! batches) and records the size of every committed delete batch so tests
//! can assert chunking behaviour.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use porchlight_core::event::{DeviceType, NewVisitorEvent, VisitorEvent};
use porchlight_core::store::{StoreQuery, VisitorStore, DELETE_BATCH_SIZE};

#[derive(Default)]
pub struct MemoryStore {
    events: Mutex<Vec<VisitorEvent>>,
    batches: Mutex<Vec<usize>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn assign_id(&self) -> String {
        format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Insert with an explicit timestamp, bypassing the trait's server-time
    /// assignment. Returns the stored record.
    pub fn seed(&self, event: NewVisitorEvent, timestamp: DateTime<Utc>) -> VisitorEvent {
        let record = event.into_record(self.assign_id(), timestamp);
        self.events
            .lock()
            .expect("events lock")
            .push(record.clone());
        record
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("events lock").len()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().expect("batches lock").clone()
    }

    fn matches(event: &VisitorEvent, query: &StoreQuery) -> bool {
        if let Some(since) = query.since {
            if event.timestamp < since {
                return false;
            }
        }
        let f = &query.filter;
        f.country.as_deref().is_none_or(|v| event.country.as_deref() == Some(v))
            && f.city.as_deref().is_none_or(|v| event.city.as_deref() == Some(v))
            && f.device_type.is_none_or(|v| event.device_type == v)
            && f.browser.as_deref().is_none_or(|v| event.browser == v)
            && f.os.as_deref().is_none_or(|v| event.os == v)
            && f.page.as_deref().is_none_or(|v| event.page == v)
    }

    fn matching(&self, query: &StoreQuery) -> Vec<VisitorEvent> {
        let events = self.events.lock().expect("events lock");
        let mut rows: Vec<(usize, VisitorEvent)> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| Self::matches(e, query))
            .map(|(i, e)| (i, e.clone()))
            .collect();
        // Newest-first; insertion order (descending) breaks timestamp ties.
        rows.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp).then(b.0.cmp(&a.0)));
        rows.into_iter().map(|(_, e)| e).collect()
    }
}

#[async_trait]
impl VisitorStore for MemoryStore {
    async fn insert(&self, event: NewVisitorEvent) -> anyhow::Result<VisitorEvent> {
        Ok(self.seed(event, Utc::now()))
    }

    async fn query(&self, query: &StoreQuery) -> anyhow::Result<Vec<VisitorEvent>> {
        let rows = self.matching(query);
        let start = (query.offset as usize).min(rows.len());
        let end = match query.limit {
            Some(limit) => (start + limit as usize).min(rows.len()),
            None => rows.len(),
        };
        Ok(rows[start..end].to_vec())
    }

    async fn count(&self, query: &StoreQuery) -> anyhow::Result<u64> {
        Ok(self.matching(&query.unpaginated()).len() as u64)
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<VisitorEvent>> {
        let events = self.events.lock().expect("events lock");
        Ok(events.iter().find(|e| e.id == id).cloned())
    }

    async fn ids_older_than(
        &self,
        cutoff: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<String>> {
        let events = self.events.lock().expect("events lock");
        Ok(events
            .iter()
            .filter(|e| cutoff.is_none_or(|c| e.timestamp < c))
            .map(|e| e.id.clone())
            .collect())
    }

    async fn delete_batch(&self, ids: &[String]) -> anyhow::Result<()> {
        if ids.len() > DELETE_BATCH_SIZE {
            anyhow::bail!("batch of {} exceeds {DELETE_BATCH_SIZE}", ids.len());
        }
        if ids.is_empty() {
            return Ok(());
        }
        let mut events = self.events.lock().expect("events lock");
        events.retain(|e| !ids.contains(&e.id));
        self.batches.lock().expect("batches lock").push(ids.len());
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A minimal valid pre-insert event for tests.
pub fn make_event(page: &str, session: &str, browser: &str) -> NewVisitorEvent {
    NewVisitorEvent {
        page: page.to_string(),
        session_id: session.to_string(),
        is_new_session: false,
        device_type: DeviceType::Desktop,
        browser: browser.to_string(),
        os: "Linux".to_string(),
        user_agent: "ua".to_string(),
        referrer: String::new(),
        language: "en".to_string(),
        screen_resolution: "1920x1080".to_string(),
        timezone: "UTC".to_string(),
        country: None,
        city: None,
        ip: None,
    }
}
