#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    /// Shared secret expected in the `X-API-Key` header on all analytics
    /// routes. `None` disables the gate (local development).
    pub api_key: Option<String>,
    pub rate_limit_max: usize,
    pub rate_limit_window_secs: u64,
    pub rate_limit_disable: bool,
    pub duckdb_memory_limit: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("PORCHLIGHT_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("PORCHLIGHT_DATA_DIR")
                .unwrap_or_else(|_| "./data".to_string()),
            api_key: std::env::var("PORCHLIGHT_API_KEY").ok().filter(|k| !k.is_empty()),
            rate_limit_max: std::env::var("PORCHLIGHT_RATE_LIMIT_MAX")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .unwrap_or(50),
            rate_limit_window_secs: std::env::var("PORCHLIGHT_RATE_LIMIT_WINDOW_SECS")
                .unwrap_or_else(|_| "900".to_string())
                .parse()
                .unwrap_or(900),
            rate_limit_disable: std::env::var("PORCHLIGHT_RATE_LIMIT_DISABLE")
                .map(|v| v == "true")
                .unwrap_or(false),
            duckdb_memory_limit: std::env::var("PORCHLIGHT_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
        })
    }
}
