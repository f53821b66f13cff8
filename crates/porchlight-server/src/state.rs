use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use porchlight_core::config::Config;
use porchlight_core::store::VisitorStore;

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
///
/// All fields are safe to clone cheaply — heavy resources are wrapped in
/// `Arc` or `Arc<Mutex<_>>`.
pub struct AppState {
    /// The visitor store. Held as a trait object so integration tests and
    /// the server binary can wire different backends.
    pub store: Arc<dyn VisitorStore>,

    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    /// Per-IP sliding-window rate limiter for all analytics routes.
    ///
    /// Key: IP address string. Value: deque of request timestamps within the
    /// configured window. Quota and window come from the config (default 50
    /// requests per 15 minutes per IP).
    rate_limiter: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn VisitorStore>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
            rate_limiter: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check whether `ip` is within the configured rate limit.
    ///
    /// Returns `true` if the request should proceed, `false` if it should be
    /// rejected with 429. Slides the window on every call.
    pub async fn check_rate_limit(&self, ip: &str) -> bool {
        if self.config.rate_limit_disable {
            return true;
        }
        let mut map = self.rate_limiter.lock().await;
        let window = map.entry(ip.to_string()).or_default();
        let cutoff = Instant::now() - Duration::from_secs(self.config.rate_limit_window_secs);
        // Drop timestamps that have slid out of the window.
        while window.front().is_some_and(|t| *t < cutoff) {
            window.pop_front();
        }
        if window.len() >= self.config.rate_limit_max {
            return false;
        }
        window.push_back(Instant::now());
        true
    }
}
