use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{middleware, routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// `/health` stays outside the analytics gate so load balancers can probe
/// it without credentials. Every `/api/analytics` route passes the rate
/// limiter first, then the API-key check, then the handler. `TraceLayer`
/// and a permissive `CorsLayer` wrap the whole router — the tracking
/// snippet posts from the portfolio's own pages, but a permissive policy
/// also keeps local dashboard development friction-free.
pub fn build_app(state: Arc<AppState>) -> Router {
    let analytics = Router::new()
        .route("/track", post(routes::track::track))
        .route("/stats", get(routes::stats::get_stats))
        .route("/visitors", get(routes::visitors::list_visitors))
        .route("/filter", get(routes::visitors::filter_visitors))
        .route("/visitor/{id}", delete(routes::manage::delete_visitor))
        .route("/bulk", delete(routes::manage::bulk_delete))
        .route("/clear", delete(routes::manage::clear_visitors))
        .layer(from_fn_with_state(state.clone(), middleware::require_api_key))
        .layer(from_fn_with_state(state.clone(), middleware::rate_limit));

    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/api/analytics", analytics)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
