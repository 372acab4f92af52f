use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render))
        // Ticks
        .route("/ticks", get(handlers::ticks::list))
        .route("/ticks/count", get(handlers::ticks::count))
        // Extrinsics
        .route("/extrinsics", get(handlers::extrinsics::list))
        .route("/extrinsics/count", get(handlers::extrinsics::count))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Read-only API: any method and header, origins from config (`*` allows all).
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let values: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(values)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
