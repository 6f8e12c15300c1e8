//! tracer-api: REST transport for the TRACER case engine.
//!
//! A thin axum layer: every route parses its input, calls one engine
//! operation and serializes the result. Bodies mirror the stored case
//! document shape.

pub mod error;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;

use std::sync::Arc;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use tracer_core::config::ApiSettings;
use tracer_engine::CaseEngine;
use tracer_store::DefaultRepository;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CaseEngine<DefaultRepository>>,
}

impl AppState {
    pub fn new(engine: CaseEngine<DefaultRepository>) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

/// CORS policy from settings. `*` allows any origin; origins that are not
/// valid header values are skipped with a warning.
pub fn cors_layer(settings: &ApiSettings) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if settings.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
