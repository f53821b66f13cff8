//! [`VisitorStore`] implementation over DuckDB.
//!
//! The store exposes only the primitives the service layer is written
//! against: a lower-bound `ts` filter combined with equality filters,
//! newest-first ordering, limit/offset, count, id lookup, age-cutoff id
//! scans, and an atomic batched delete capped at [`DELETE_BATCH_SIZE`] ids.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use porchlight_core::event::{DeviceType, NewVisitorEvent, VisitorEvent};
use porchlight_core::store::{StoreQuery, VisitorStore, DELETE_BATCH_SIZE};

use crate::DuckDbStore;

const COLUMNS: &str = "id, epoch_us(ts), page, session_id, is_new_session, device_type, \
     browser, os, user_agent, referrer, language, screen_resolution, timezone, \
     country, city, ip";

/// Format a UTC instant for DuckDB TIMESTAMP parameters.
fn ts_param(ts: &DateTime<Utc>) -> String {
    ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Raw column values read inside `query_map`, converted to [`VisitorEvent`]
/// outside the closure so conversion failures surface as store errors.
struct RawRow {
    id: String,
    ts_us: i64,
    page: String,
    session_id: String,
    is_new_session: bool,
    device_type: String,
    browser: String,
    os: String,
    user_agent: String,
    referrer: String,
    language: String,
    screen_resolution: String,
    timezone: String,
    country: Option<String>,
    city: Option<String>,
    ip: Option<String>,
}

fn read_row(row: &duckdb::Row<'_>) -> duckdb::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        ts_us: row.get(1)?,
        page: row.get(2)?,
        session_id: row.get(3)?,
        is_new_session: row.get(4)?,
        device_type: row.get(5)?,
        browser: row.get(6)?,
        os: row.get(7)?,
        user_agent: row.get(8)?,
        referrer: row.get(9)?,
        language: row.get(10)?,
        screen_resolution: row.get(11)?,
        timezone: row.get(12)?,
        country: row.get(13)?,
        city: row.get(14)?,
        ip: row.get(15)?,
    })
}

fn to_event(raw: RawRow) -> Result<VisitorEvent> {
    let timestamp = DateTime::from_timestamp_micros(raw.ts_us)
        .ok_or_else(|| anyhow!("timestamp out of range: {}", raw.ts_us))?;
    let device_type = DeviceType::parse(&raw.device_type)
        .ok_or_else(|| anyhow!("unknown device_type in store: {}", raw.device_type))?;
    Ok(VisitorEvent {
        id: raw.id,
        timestamp,
        page: raw.page,
        session_id: raw.session_id,
        is_new_session: raw.is_new_session,
        device_type,
        browser: raw.browser,
        os: raw.os,
        user_agent: raw.user_agent,
        referrer: raw.referrer,
        language: raw.language,
        screen_resolution: raw.screen_resolution,
        timezone: raw.timezone,
        country: raw.country,
        city: raw.city,
        ip: raw.ip,
    })
}

/// Append the lower-bound and equality predicates of `query` to `sql`,
/// pushing one positional parameter per predicate.
fn append_predicates(
    query: &StoreQuery,
    sql: &mut String,
    params: &mut Vec<Box<dyn duckdb::types::ToSql + Send>>,
    param_idx: &mut usize,
) {
    if let Some(since) = query.since {
        sql.push_str(&format!(" AND ts >= ?{}", *param_idx));
        params.push(Box::new(ts_param(&since)));
        *param_idx += 1;
    }
    let f = &query.filter;
    if let Some(ref country) = f.country {
        sql.push_str(&format!(" AND country = ?{}", *param_idx));
        params.push(Box::new(country.clone()));
        *param_idx += 1;
    }
    if let Some(ref city) = f.city {
        sql.push_str(&format!(" AND city = ?{}", *param_idx));
        params.push(Box::new(city.clone()));
        *param_idx += 1;
    }
    if let Some(device_type) = f.device_type {
        sql.push_str(&format!(" AND device_type = ?{}", *param_idx));
        params.push(Box::new(device_type.as_str().to_string()));
        *param_idx += 1;
    }
    if let Some(ref browser) = f.browser {
        sql.push_str(&format!(" AND browser = ?{}", *param_idx));
        params.push(Box::new(browser.clone()));
        *param_idx += 1;
    }
    if let Some(ref os) = f.os {
        sql.push_str(&format!(" AND os = ?{}", *param_idx));
        params.push(Box::new(os.clone()));
        *param_idx += 1;
    }
    if let Some(ref page) = f.page {
        sql.push_str(&format!(" AND page = ?{}", *param_idx));
        params.push(Box::new(page.clone()));
        *param_idx += 1;
    }
}

#[async_trait]
impl VisitorStore for DuckDbStore {
    async fn insert(&self, event: NewVisitorEvent) -> Result<VisitorEvent> {
        let id = uuid::Uuid::new_v4().to_string();
        let timestamp = Utc::now();
        let record = event.into_record(id, timestamp);

        let conn = self.conn.lock().await;
        conn.execute(
            r#"INSERT INTO visitors (
                id, ts, page, session_id, is_new_session, device_type,
                browser, os, user_agent, referrer, language,
                screen_resolution, timezone, country, city, ip
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16
            )"#,
            duckdb::params![
                record.id,
                ts_param(&record.timestamp),
                record.page,
                record.session_id,
                record.is_new_session,
                record.device_type.as_str(),
                record.browser,
                record.os,
                record.user_agent,
                record.referrer,
                record.language,
                record.screen_resolution,
                record.timezone,
                record.country,
                record.city,
                record.ip,
            ],
        )?;
        Ok(record)
    }

    async fn query(&self, query: &StoreQuery) -> Result<Vec<VisitorEvent>> {
        let mut sql = format!("SELECT {COLUMNS} FROM visitors WHERE 1=1");
        let mut params: Vec<Box<dyn duckdb::types::ToSql + Send>> = Vec::new();
        let mut param_idx = 1;
        append_predicates(query, &mut sql, &mut params, &mut param_idx);
        sql.push_str(" ORDER BY ts DESC");
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT ?{}", param_idx));
            params.push(Box::new(limit as i64));
            param_idx += 1;
            sql.push_str(&format!(" OFFSET ?{}", param_idx));
            params.push(Box::new(query.offset as i64));
        }

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let refs: Vec<&dyn duckdb::types::ToSql> = params.iter().map(|p| p.as_ref() as &dyn duckdb::types::ToSql).collect();
        let mapped = stmt.query_map(refs.as_slice(), read_row)?;
        let mut events = Vec::new();
        for raw in mapped {
            events.push(to_event(raw?)?);
        }
        Ok(events)
    }

    async fn count(&self, query: &StoreQuery) -> Result<u64> {
        let mut sql = "SELECT COUNT(*) FROM visitors WHERE 1=1".to_string();
        let mut params: Vec<Box<dyn duckdb::types::ToSql + Send>> = Vec::new();
        let mut param_idx = 1;
        append_predicates(query, &mut sql, &mut params, &mut param_idx);

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let refs: Vec<&dyn duckdb::types::ToSql> = params.iter().map(|p| p.as_ref() as &dyn duckdb::types::ToSql).collect();
        let count: i64 = stmt.query_row(refs.as_slice(), |row| row.get(0))?;
        Ok(count as u64)
    }

    async fn get(&self, id: &str) -> Result<Option<VisitorEvent>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM visitors WHERE id = ?1"))?;
        let mut mapped = stmt.query_map(duckdb::params![id], read_row)?;
        match mapped.next() {
            Some(raw) => Ok(Some(to_event(raw?)?)),
            None => Ok(None),
        }
    }

    async fn ids_older_than(&self, cutoff: Option<DateTime<Utc>>) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        let ids = match cutoff {
            Some(cutoff) => {
                let mut stmt = conn.prepare("SELECT id FROM visitors WHERE ts < ?1")?;
                let mapped = stmt.query_map(duckdb::params![ts_param(&cutoff)], |row| row.get(0))?;
                mapped.collect::<duckdb::Result<Vec<String>>>()?
            }
            None => {
                let mut stmt = conn.prepare("SELECT id FROM visitors")?;
                let mapped = stmt.query_map([], |row| row.get(0))?;
                mapped.collect::<duckdb::Result<Vec<String>>>()?
            }
        };
        Ok(ids)
    }

    async fn delete_batch(&self, ids: &[String]) -> Result<()> {
        if ids.len() > DELETE_BATCH_SIZE {
            anyhow::bail!(
                "delete batch of {} exceeds the {DELETE_BATCH_SIZE}-id limit",
                ids.len()
            );
        }
        if ids.is_empty() {
            return Ok(());
        }

        // One transaction per batch: the chunk commits fully or not at all.
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for id in ids {
            tx.execute("DELETE FROM visitors WHERE id = ?1", duckdb::params![id])?;
        }
        tx.commit()?;
        tracing::info!(count = ids.len(), "Deleted visitor batch");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.ping_conn().await
    }
}
