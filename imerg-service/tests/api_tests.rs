//! Integration tests for the HTTP API.

use std::fs;
use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use imerg::dataset::GRID_GROUP;
use imerg::{ImergServiceBuilder, MemoryBackend, MemoryDataset};
use imerg_service::{router, AppState};
use ndarray::{array, Array2};
use serde_json::Value;
use tempfile::TempDir;

const GRANULE: &str = "3B-HHR.MS.MRG.3IMERG.20230815-S013000-E015959.0090.V07B.HDF5";
const BOX: &str = "toplat=1&bottomlat=-1&leftlon=100&rightlon=101";

/// IMERG-style field stored `(lon, lat)`: 3 longitudes by 2 latitudes.
fn granule() -> MemoryDataset {
    MemoryDataset::new()
        .with_coordinate("lon", vec![100.05, 100.15, 100.25])
        .with_coordinate("lat", vec![-0.05, 0.05])
        .with_variable(
            "precipitation",
            &["lon", "lat"],
            array![[0.0, 0.2], [0.05, 5.0], [1.0, 0.0]],
        )
}

/// Create a test server over an in-memory backend.
///
/// The data directory holds the grouped granule, a flat export, a file no
/// layout can open and a file without a precipitation variable.
fn create_test_server(temp_dir: &TempDir) -> TestServer {
    for name in [GRANULE, "flat.nc4", "broken.nc", "rain.nc", "notes.txt"] {
        fs::write(temp_dir.path().join(name), b"").unwrap();
    }

    let no_precip = MemoryDataset::new()
        .with_coordinate("lat", vec![0.0])
        .with_coordinate("lon", vec![100.0])
        .with_variable("rain", &["lat", "lon"], Array2::<f32>::ones((1, 1)));

    let backend = MemoryBackend::new()
        .with_group(GRANULE, GRID_GROUP, granule())
        .with_flat("flat.nc4", granule())
        .with_flat("rain.nc", no_precip);

    let service = ImergServiceBuilder::new(temp_dir.path())
        .backend(backend)
        .build();

    TestServer::new(router(Arc::new(AppState { service }))).unwrap()
}

#[tokio::test]
async fn test_files_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.get("/files").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(
        json,
        serde_json::json!([GRANULE, "broken.nc", "flat.nc4", "rain.nc"])
    );
}

#[tokio::test]
async fn test_data_endpoint_json() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .get(&format!("/data?filename={}&{}", GRANULE, BOX))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["meta"]["count"], 3);
    assert_eq!(json["meta"]["max_val"], 5.0);
    assert_eq!(json["meta"]["bounds"]["top"], 1.0);
    assert_eq!(json["meta"]["bounds"]["left"], 100.0);
    // Row-major over (lat, lon)
    assert_eq!(json["vals"], serde_json::json!([1.0, 0.2, 5.0]));
    assert_eq!(json["lats"], serde_json::json!([-0.05, 0.05, 0.05]));
    assert_eq!(json["lons"], serde_json::json!([100.25, 100.05, 100.15]));
}

#[tokio::test]
async fn test_data_endpoint_binary() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .get(&format!("/data?filename=flat.nc4&{}&format=bin", BOX))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header("content-type"),
        "application/octet-stream"
    );

    let body = response.as_bytes();
    assert_eq!(body.len(), 8 + 12 * 3);
    assert_eq!(u32::from_le_bytes(body[0..4].try_into().unwrap()), 3);
    assert_eq!(f32::from_le_bytes(body[4..8].try_into().unwrap()), 5.0);
    // Values block follows the latitude and longitude blocks
    let first_val = f32::from_le_bytes(body[32..36].try_into().unwrap());
    assert_eq!(first_val, 1.0);
}

#[tokio::test]
async fn test_data_endpoint_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .get(&format!("/data?filename={}&{}&threshold=1.0", GRANULE, BOX))
        .await;
    let json: Value = response.json();
    assert_eq!(json["meta"]["count"], 1);
    assert_eq!(json["vals"], serde_json::json!([5.0]));

    // Nothing passes, but the grid maximum is still reported
    let response = server
        .get(&format!("/data?filename={}&{}&threshold=10", GRANULE, BOX))
        .await;
    let json: Value = response.json();
    assert_eq!(json["meta"]["count"], 0);
    assert_eq!(json["meta"]["max_val"], 5.0);
    assert_eq!(json["vals"], serde_json::json!([]));
}

#[tokio::test]
async fn test_data_endpoint_outside_box_serves_full_extent() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .get(&format!(
            "/data?filename={}&toplat=50&bottomlat=40&leftlon=0&rightlon=10",
            GRANULE
        ))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["meta"]["count"], 3);
    assert_eq!(json["meta"]["bounds"]["top"], 50.0);
}

#[tokio::test]
async fn test_data_endpoint_invalid_query() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .get(&format!("/data?filename={}&{}&format=xml", GRANULE, BOX))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server.get(&format!("/data?filename={}", GRANULE)).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_error_statuses() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server
        .get(&format!("/data?filename=missing.HDF5&{}", BOX))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.text(), "file not found");

    let response = server
        .get(&format!("/data?filename=../secret.nc&{}", BOX))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "invalid request");

    let response = server.get(&format!("/grid?filename=rain.nc&{}", BOX)).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.text(), "no precipitation variable in dataset");

    let response = server
        .get(&format!("/plot?filename=broken.nc&{}", BOX))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.text();
    assert_eq!(body, "dataset could not be opened");
    assert!(!body.contains(&temp_dir.path().display().to_string()));
}

#[tokio::test]
async fn test_grid_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.get(&format!("/grid?filename={}&{}", GRANULE, BOX)).await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["lats"].as_array().unwrap().len(), 2);
    assert_eq!(json["lons"].as_array().unwrap().len(), 3);
    assert_eq!(json["values"][0][2], 1.0);
    assert_eq!(json["values"][1][1], 5.0);
}

#[tokio::test]
async fn test_plot_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.get(&format!("/plot?filename={}&{}", GRANULE, BOX)).await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "image/png");
    assert_eq!(
        response.header("x-imerg-granule"),
        "3B-HHR 2023-08-15 01:30-01:59 UTC (V07B)"
    );
    assert_eq!(&response.as_bytes()[..8], b"\x89PNG\r\n\x1a\n");

    // Names that do not follow the granule convention get no label
    let response = server.get(&format!("/plot?filename=flat.nc4&{}", BOX)).await;
    response.assert_status_ok();
    assert!(response.headers().get("x-imerg-granule").is_none());
}

#[tokio::test]
async fn test_health_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.get("/health").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].as_str().is_some());
}

#[tokio::test]
async fn test_openapi_document() {
    let temp_dir = TempDir::new().unwrap();
    let server = create_test_server(&temp_dir);

    let response = server.get("/api-docs/openapi.json").await;

    response.assert_status_ok();
    let json: Value = response.json();
    for path in ["/files", "/plot", "/grid", "/data", "/health"] {
        assert!(json["paths"][path].is_object(), "missing {}", path);
    }
}
