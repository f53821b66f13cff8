use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use porchlight_server::state::AppState;

/// `porchlight health` — liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$PORCHLIGHT_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("PORCHLIGHT_PORT").unwrap_or_else(|_| "8080".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Health-check subcommand — must be handled before tokio runtime
    // initialisation so the binary stays fast as a Docker HEALTHCHECK probe.
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }
    // Structured JSON logging. Level controlled via RUST_LOG env var.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("porchlight=info".parse()?),
        )
        .json()
        .init();

    let cfg = porchlight_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    // Ensure data directory exists before opening DuckDB.
    std::fs::create_dir_all(&cfg.data_dir)?;
    let db_path = format!("{}/porchlight.db", cfg.data_dir);

    let store = porchlight_duckdb::DuckDbStore::open(&db_path, &cfg.duckdb_memory_limit)?;

    if cfg.api_key.is_none() {
        tracing::warn!(
            "PORCHLIGHT_API_KEY not set — all analytics routes are open. \
             Set it before exposing the server beyond localhost."
        );
    }

    let addr = format!("0.0.0.0:{}", cfg.port);
    let state = Arc::new(AppState::new(Arc::new(store), cfg.clone()));
    let app = porchlight_server::app::build_app(Arc::clone(&state));

    info!(port = cfg.port, "Porchlight listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
