//! REST API module using Axum
//!
//! HTTP surface for the wind-farm monitoring dashboard: a versioned JSON API
//! under `/api/v1` with a consistent response envelope. Mutations go through
//! the farm controller; reads come from the shared in-memory view.

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::ApiContext;

use axum::http::{header, Method, Uri};
use axum::response::Response;
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use envelope::ApiErrorResponse;

/// Keep unmatched paths inside the envelope instead of an empty 404.
async fn unmatched_route(uri: Uri) -> Response {
    ApiErrorResponse::not_found(format!("no route for {uri}"))
}

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `WINDWARD_CORS_ORIGINS` to a comma-separated list of allowed origins
/// for development (e.g., `http://localhost:5173` for the Vite dev server).
fn build_cors_layer() -> CorsLayer {
    match std::env::var("WINDWARD_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<_> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        }
        Err(_) => {
            // No cross-origin allowed; the dashboard is served same-origin
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        }
    }
}

/// Create the complete application router.
pub fn create_app(context: ApiContext) -> Router {
    let cors = build_cors_layer();

    Router::new()
        .nest("/api/v1", routes::api_routes(context))
        .fallback(unmatched_route)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
