//! IMERG Service Library
//!
//! HTTP handlers, router and OpenAPI document for the precipitation service.
//! This library is used by both the imerg-service binary and integration tests.

pub mod handlers;
pub mod render;

use std::sync::Arc;

use axum::{routing::get, Router};
use imerg::ImergService;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across handlers.
pub struct AppState {
    /// Extraction pipeline over the data directory.
    pub service: ImergService,
}

// Re-export commonly used types for convenience
pub use handlers::{ApiError, DataQuery, GridQuery, HealthResponse};

/// OpenAPI documentation for the IMERG service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "IMERG Precipitation Service",
        version = "0.1.0",
        description = "Crop GPM IMERG precipitation granules to a bounding box and serve them as heatmaps, dense grids or sparse point clouds.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        handlers::list_files,
        handlers::plot,
        handlers::grid,
        handlers::cloud_data,
        handlers::health_check,
    ),
    components(
        schemas(
            handlers::BoundsSchema,
            handlers::CloudMetaSchema,
            handlers::CloudDataSchema,
            handlers::GridSchema,
            handlers::HealthResponse,
        )
    ),
    tags(
        (name = "files", description = "Granule discovery"),
        (name = "precipitation", description = "Precipitation extraction endpoints"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;

/// Build the application router with docs, tracing and CORS.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/files", get(handlers::list_files))
        .route("/plot", get(handlers::plot))
        .route("/grid", get(handlers::grid))
        .route("/data", get(handlers::cloud_data))
        .route("/health", get(handlers::health_check))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}
