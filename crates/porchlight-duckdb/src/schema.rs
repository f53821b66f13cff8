/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup (idempotent).
///
/// `memory_limit` is a DuckDB size string such as `"1GB"` or `"512MB"`,
/// passed at runtime from `Config.duckdb_memory_limit`. An explicit limit is
/// always set — the DuckDB default (80% of system RAM) is not acceptable for
/// a server process. `SET threads = 2` keeps the background thread pool
/// small for single-writer embedded use.
///
/// `ts` is the only ordering and range key; every window and clear query
/// goes through the index on it.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- VISITORS
-- ===========================================
-- One row per tracked page view. Rows are immutable once written; the only
-- mutation ever applied is deletion.
CREATE TABLE IF NOT EXISTS visitors (
    id                VARCHAR PRIMARY KEY,       -- uuid v4, assigned at insert
    ts                TIMESTAMP NOT NULL,        -- server-assigned write time (UTC)
    page              VARCHAR NOT NULL,
    session_id        VARCHAR NOT NULL,
    is_new_session    BOOLEAN NOT NULL DEFAULT FALSE,
    device_type       VARCHAR NOT NULL,          -- 'mobile' | 'tablet' | 'desktop'
    browser           VARCHAR NOT NULL,
    os                VARCHAR NOT NULL,
    user_agent        VARCHAR NOT NULL,
    referrer          VARCHAR NOT NULL,
    language          VARCHAR NOT NULL,
    screen_resolution VARCHAR NOT NULL,
    timezone          VARCHAR NOT NULL,
    country           VARCHAR,                   -- absent when geo lookup failed
    city              VARCHAR,
    ip                VARCHAR
);

CREATE INDEX IF NOT EXISTS idx_visitors_ts ON visitors (ts);
"#
    )
}
