//! HTTP request handlers for the precipitation service.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use imerg::filename::parse_granule;
use imerg::{BoundingBox, DenseGridJson, EncodedResponse, ErrorKind, Format, ImergError};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::render::render_png;
use crate::AppState;

/// Response header carrying the granule label of a rendered heatmap.
pub const GRANULE_HEADER: &str = "x-imerg-granule";

/// Query parameters for grid endpoints (`/plot`, `/grid`).
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GridQuery {
    /// Granule filename in the data directory.
    pub filename: String,
    /// Northern edge in decimal degrees.
    pub toplat: f64,
    /// Southern edge in decimal degrees.
    pub bottomlat: f64,
    /// Western edge in decimal degrees.
    pub leftlon: f64,
    /// Eastern edge in decimal degrees.
    pub rightlon: f64,
}

impl GridQuery {
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.toplat, self.bottomlat, self.leftlon, self.rightlon)
    }
}

/// Query parameters for the sparse cloud endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DataQuery {
    /// Granule filename in the data directory.
    pub filename: String,
    pub toplat: f64,
    pub bottomlat: f64,
    pub leftlon: f64,
    pub rightlon: f64,
    /// Minimum rate in mm/hr; cells must exceed it. Defaults to the service threshold.
    pub threshold: Option<f32>,
    /// Payload format: `json` or `bin`.
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub format: Format,
}

impl DataQuery {
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.toplat, self.bottomlat, self.leftlon, self.rightlon)
    }
}

/// Bounding box as echoed in sparse JSON payloads.
#[derive(Debug, Serialize, ToSchema)]
pub struct BoundsSchema {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

/// `meta` object of the sparse JSON payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct CloudMetaSchema {
    /// Number of points.
    pub count: usize,
    /// Grid maximum in mm/hr, rounded to 2 decimals.
    pub max_val: f64,
    pub bounds: BoundsSchema,
}

/// Sparse JSON payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct CloudDataSchema {
    pub meta: CloudMetaSchema,
    /// Latitudes, rounded to 3 decimals.
    pub lats: Vec<f64>,
    /// Longitudes, rounded to 3 decimals.
    pub lons: Vec<f64>,
    /// Rates in mm/hr, rounded to 2 decimals.
    pub vals: Vec<f64>,
}

/// Dense grid payload; `values[i][j]` is the cell at `lats[i]`, `lons[j]`.
#[derive(Debug, Serialize, ToSchema)]
pub struct GridSchema {
    pub lats: Vec<f32>,
    pub lons: Vec<f32>,
    /// Rows of rates in mm/hr; missing cells are `null`.
    pub values: Vec<Vec<Option<f32>>>,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Failure of a request.
///
/// The response body is the stable message of the error's [`ErrorKind`];
/// the full error only goes to the log.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Imerg(#[from] ImergError),

    #[error("Failed to render heatmap: {0}")]
    Render(#[from] image::ImageError),

    #[error("Pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Imerg(e) => e.kind(),
            ApiError::Render(_) | ApiError::Task(_) => ErrorKind::ProcessingFailure,
        }
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::OpenFailure => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::VariableNotFound => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ProcessingFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        tracing::error!(kind = kind.code(), error = %self, "Request failed");
        (status_for(kind), kind.public_message()).into_response()
    }
}

/// Run a pipeline call on the blocking pool.
async fn run_blocking<T, E, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?.map_err(Into::into)
}

/// List granule files in the data directory.
///
/// Returns filenames ending in `.HDF5`, `.nc` or `.nc4`, sorted.
#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    responses(
        (status = 200, description = "Sorted granule filenames", body = Vec<String>)
    )
)]
pub async fn list_files(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    let files = run_blocking(move || Ok::<_, ImergError>(state.service.list_files())).await?;
    tracing::debug!(count = files.len(), "Listed files");
    Ok(Json(files))
}

/// Render the cropped grid as a PNG heatmap.
#[utoipa::path(
    get,
    path = "/plot",
    tag = "precipitation",
    params(GridQuery),
    responses(
        (status = 200, description = "PNG heatmap, north up", content_type = "image/png", body = Vec<u8>),
        (status = 400, description = "Invalid filename"),
        (status = 404, description = "File not found"),
        (status = 422, description = "No precipitation variable"),
        (status = 500, description = "Open or processing failure")
    )
)]
pub async fn plot(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GridQuery>,
) -> Result<Response, ApiError> {
    let bounds = query.bounds();
    let filename = query.filename.clone();

    let png = run_blocking(move || -> Result<Vec<u8>, ApiError> {
        let grid = state.service.dense_grid(&filename, &bounds)?;
        Ok(render_png(&grid)?)
    })
    .await?;

    tracing::info!(filename = %query.filename, bytes = png.len(), "Rendered heatmap");

    let mut response = ([(header::CONTENT_TYPE, "image/png")], png).into_response();
    if let Some(label) = parse_granule(&query.filename)
        .and_then(|g| HeaderValue::from_str(&g.label()).ok())
    {
        response.headers_mut().insert(GRANULE_HEADER, label);
    }
    Ok(response)
}

/// Cropped dense grid as JSON.
#[utoipa::path(
    get,
    path = "/grid",
    tag = "precipitation",
    params(GridQuery),
    responses(
        (status = 200, description = "Dense (lat, lon) grid", body = GridSchema),
        (status = 400, description = "Invalid filename"),
        (status = 404, description = "File not found"),
        (status = 422, description = "No precipitation variable"),
        (status = 500, description = "Open or processing failure")
    )
)]
pub async fn grid(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GridQuery>,
) -> Result<Response, ApiError> {
    let bounds = query.bounds();
    let grid = run_blocking(move || state.service.dense_grid(&query.filename, &bounds)).await?;
    Ok(encoded_response(EncodedResponse::DenseGrid(grid)))
}

/// Sparse points above a threshold, as JSON or binary.
///
/// The binary payload is little-endian: `u32` count, `f32` grid maximum,
/// then `count` latitudes, longitudes and values as `f32`.
#[utoipa::path(
    get,
    path = "/data",
    tag = "precipitation",
    params(DataQuery),
    responses(
        (status = 200, description = "Sparse points, by `format`", content(
            (CloudDataSchema = "application/json"),
            (Vec<u8> = "application/octet-stream")
        )),
        (status = 400, description = "Invalid filename or query"),
        (status = 404, description = "File not found"),
        (status = 422, description = "No precipitation variable"),
        (status = 500, description = "Open or processing failure")
    )
)]
pub async fn cloud_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DataQuery>,
) -> Result<Response, ApiError> {
    let bounds = query.bounds();
    let format = query.format;
    let threshold = query.threshold;
    let filename = query.filename.clone();

    let encoded = run_blocking(move || {
        state
            .service
            .cloud_data(&filename, &bounds, threshold, format)
    })
    .await?;

    tracing::info!(filename = %query.filename, %format, "Served cloud data");
    Ok(encoded_response(encoded))
}

/// Turn an encoded pipeline result into an HTTP response.
pub fn encoded_response(encoded: EncodedResponse) -> Response {
    match encoded {
        EncodedResponse::DenseGrid(grid) => Json(DenseGridJson::from(&grid)).into_response(),
        EncodedResponse::JsonSparse(json) => Json(json).into_response(),
        EncodedResponse::BinarySparse(bytes) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
    }
}

/// Health check endpoint.
///
/// Returns service status and version.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_query_defaults() {
        let query: DataQuery = serde_json::from_str(
            r#"{"filename": "a.nc4", "toplat": 1.0, "bottomlat": -1.0, "leftlon": 100.0, "rightlon": 101.0}"#,
        )
        .unwrap();
        assert_eq!(query.format, Format::Json);
        assert!(query.threshold.is_none());
        assert_eq!(query.bounds(), BoundingBox::new(1.0, -1.0, 100.0, 101.0));
    }

    #[test]
    fn test_encoded_dense_grid_response() {
        let grid = imerg::CroppedGrid::new(
            vec![0.0, 1.0],
            vec![10.0],
            ndarray::array![[2.5], [f32::NAN]],
        )
        .unwrap();

        let response = encoded_response(EncodedResponse::DenseGrid(grid));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::InvalidRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::OpenFailure), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(ErrorKind::VariableNotFound), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_for(ErrorKind::ProcessingFailure),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_api_error_kind() {
        let err = ApiError::from(ImergError::FileNotFound {
            path: "/secret/path/a.nc4".into(),
        });
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_health_response_serialize() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("0.1.0"));
    }
}
