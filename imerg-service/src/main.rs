//! IMERG Service - HTTP microservice for GPM precipitation extraction.
//!
//! Serves cropped IMERG grids as PNG heatmaps, dense JSON grids and sparse
//! point clouds for visualization clients.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `IMERG_DATA_DIR` | Directory containing granules | Current directory |
//! | `IMERG_THRESHOLD` | Default sparse threshold (mm/hr) | 0.1 |
//! | `IMERG_PORT` | HTTP server port | 8080 |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `GET /files` - List granules in the data directory
//! - `GET /plot?filename=F&toplat=..&bottomlat=..&leftlon=..&rightlon=..` - PNG heatmap
//! - `GET /grid?...` - Dense grid as JSON
//! - `GET /data?...&threshold=T&format=json|bin` - Sparse points
//! - `GET /health` - Health check
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;

use imerg::ImergServiceBuilder;
use imerg_service::{router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imerg_service=info,imerg=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load port from environment (service-specific config)
    let port: u16 = std::env::var("IMERG_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    // The library handles IMERG_DATA_DIR and IMERG_THRESHOLD
    let service = match ImergServiceBuilder::from_env() {
        Ok(builder) => builder.build(),
        Err(e) => {
            tracing::warn!(error = %e, "Falling back to current directory");
            ImergServiceBuilder::new(".").build()
        }
    };

    tracing::info!(
        data_dir = %service.data_dir().display(),
        threshold = service.default_threshold(),
        backend = service.backend_name(),
        port = port,
        "Starting IMERG service"
    );

    let app = router(Arc::new(AppState { service }));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
