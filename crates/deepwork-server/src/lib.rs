//! HTTP API for Deep Work sessions.
//!
//! A thin axum layer over [`deepwork_core::SessionService`]: it checks
//! request shapes, forwards to the core, and maps core errors to status
//! codes.

pub mod api;
pub mod error;
pub mod state;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use tracing_subscriber::EnvFilter;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, Service, SharedClock};

/// Build the application router.
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    api::routes()
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the browser frontend. Credentials are allowed, so methods and
/// headers mirror the request instead of using a wildcard.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("deepwork_server=info,deepwork_core=info,tower_http=info"));
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .try_init();
}
