//! End-to-end tests for the items endpoints, served from a temporary
//! GeoPackage through the full router.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use tower::ServiceExt;

use datasources::{DatasourceConfig, GeoPackageConfig};
use features_api::build_router;
use features_api::config::{CollectionConfig, LimitConfig, ServerConfig};
use features_api::state::AppState;

const BASE_URL: &str = "http://localhost:8084";

/// GeoPackage blob for a 2D point: GP header without envelope plus
/// little-endian ISO WKB.
fn gpkg_point(x: f64, y: f64) -> Vec<u8> {
    let mut blob = vec![0x47, 0x50, 0x00, 0x01];
    blob.extend_from_slice(&4326i32.to_le_bytes());
    blob.push(0x01); // little endian wkb
    blob.extend_from_slice(&1u32.to_le_bytes()); // point
    blob.extend_from_slice(&x.to_le_bytes());
    blob.extend_from_slice(&y.to_le_bytes());
    blob
}

async fn seed_geopackage(path: &Path, feature_count: i64) {
    let mut conn = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .connect()
        .await
        .unwrap();
    sqlx::query(
        "CREATE TABLE buildings (
            fid INTEGER PRIMARY KEY,
            geom BLOB,
            name TEXT,
            minx REAL, miny REAL, maxx REAL, maxy REAL
        )",
    )
    .execute(&mut conn)
    .await
    .unwrap();

    for i in 1..=feature_count {
        let x = i as f64;
        sqlx::query(
            "INSERT INTO buildings (fid, geom, name, minx, miny, maxx, maxy)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(i)
        .bind(gpkg_point(x, 52.0))
        .bind(format!("building {}", i))
        .bind(x)
        .bind(52.0)
        .bind(x)
        .bind(52.0)
        .execute(&mut conn)
        .await
        .unwrap();
    }
    conn.close().await.unwrap();
}

async fn build_app(gpkg: &Path, max_limit: usize) -> Router {
    let config = ServerConfig {
        base_url: BASE_URL.to_string(),
        limits: LimitConfig {
            default_limit: 10,
            max_limit,
        },
        datasource: DatasourceConfig {
            geopackage: Some(GeoPackageConfig {
                file: gpkg.to_path_buf(),
            }),
            postgis: None,
        },
        collections: vec![CollectionConfig {
            id: "buildings".to_string(),
            title: Some("Buildings".to_string()),
            description: None,
            table: None,
            fid_column: None,
            geom_column: None,
        }],
    };
    let state = Arc::new(AppState::new(config).await.unwrap());
    build_router(state)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn feature_ids(body: &str) -> Vec<i64> {
    let json: Value = serde_json::from_str(body).unwrap();
    json["features"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["id"].as_i64().unwrap())
        .collect()
}

/// The href of the link with the given rel, as a request path.
fn link(body: &str, rel: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).unwrap();
    json["links"].as_array().and_then(|links| {
        links
            .iter()
            .find(|l| l["rel"] == rel)
            .map(|l| l["href"].as_str().unwrap().to_string())
    })
}

fn as_uri(href: &str) -> String {
    href.strip_prefix(BASE_URL).unwrap().to_string()
}

#[tokio::test]
async fn test_pagination_walk() {
    let dir = tempfile::tempdir().unwrap();
    let gpkg = dir.path().join("test.gpkg");
    seed_geopackage(&gpkg, 5).await;
    let app = build_app(&gpkg, 1000).await;

    // first page
    let (status, page1) = get(&app, "/collections/buildings/items?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feature_ids(&page1), vec![1, 2]);
    assert!(link(&page1, "prev").is_none());
    let next = link(&page1, "next").expect("first page should link to the next");

    // second page
    let (status, page2) = get(&app, &as_uri(&next)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feature_ids(&page2), vec![3, 4]);
    let prev = link(&page2, "prev").expect("second page should link back");
    let next = link(&page2, "next").expect("second page should link forward");

    // last page
    let (status, page3) = get(&app, &as_uri(&next)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feature_ids(&page3), vec![5]);
    assert!(link(&page3, "next").is_none());
    assert!(link(&page3, "prev").is_some());

    // back to the first page: same features, same links, byte for byte
    let (status, page1_again) = get(&app, &as_uri(&prev)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feature_ids(&page1_again), vec![1, 2]);
    assert!(link(&page1_again, "prev").is_none());
    assert_eq!(page1, page1_again);
}

#[tokio::test]
async fn test_stale_cursor_restarts_pagination() {
    let dir = tempfile::tempdir().unwrap();
    let gpkg = dir.path().join("test.gpkg");
    seed_geopackage(&gpkg, 5).await;
    let app = build_app(&gpkg, 1000).await;

    let (_, page1) = get(&app, "/collections/buildings/items?limit=2").await;
    let next = link(&page1, "next").unwrap();

    // same cursor with an added bbox filter: the position was minted
    // under different filters, pagination restarts at the first page of
    // the filtered set
    let tampered = format!("{}&bbox=0,0,90,90", as_uri(&next));
    let (status, body) = get(&app, &tampered).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feature_ids(&body), vec![1, 2]);
}

#[tokio::test]
async fn test_bbox_filters_features() {
    let dir = tempfile::tempdir().unwrap();
    let gpkg = dir.path().join("test.gpkg");
    seed_geopackage(&gpkg, 5).await;
    let app = build_app(&gpkg, 1000).await;

    // seeded points sit at x = 1..5, y = 52
    let (status, body) = get(&app, "/collections/buildings/items?bbox=1.5,50,3.5,53").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feature_ids(&body), vec![2, 3]);
}

#[tokio::test]
async fn test_limit_is_clamped_to_max() {
    let dir = tempfile::tempdir().unwrap();
    let gpkg = dir.path().join("test.gpkg");
    seed_geopackage(&gpkg, 5).await;
    let app = build_app(&gpkg, 3).await;

    let (status, body) = get(&app, "/collections/buildings/items?limit=999999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feature_ids(&body), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_parameter_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    let gpkg = dir.path().join("test.gpkg");
    seed_geopackage(&gpkg, 2).await;
    let app = build_app(&gpkg, 1000).await;

    let (status, body) = get(&app, "/collections/buildings/items?foo=bar").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("unknown query parameter"));
    assert!(body.contains("foo=bar"));

    let (status, body) = get(&app, "/collections/buildings/items?bbox=1,2,3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("exactly 4"));

    let (status, body) = get(&app, "/collections/buildings/items?limit=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("numeric"));

    let (status, body) = get(&app, "/collections/buildings/items?datetime=2024-01-01").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("datetime param is currently not supported"));

    let (status, body) = get(&app, "/collections/buildings/items?f=html").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("html"));

    let (status, body) = get(
        &app,
        "/collections/buildings/items?bbox=1,2,3,4\
         &bbox-crs=http://www.opengis.net/def/crs/EPSG/0/28992\
         &filter=name\
         &filter-crs=http://www.opengis.net/def/crs/EPSG/0/4326",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("need to be equal"));
}

#[tokio::test]
async fn test_unknown_collection_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let gpkg = dir.path().join("test.gpkg");
    seed_geopackage(&gpkg, 2).await;
    let app = build_app(&gpkg, 1000).await;

    let (status, body) = get(&app, "/collections/rivers/items").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Collection not found: rivers"));

    let (status, _) = get(&app, "/collections/rivers/items/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_single_feature() {
    let dir = tempfile::tempdir().unwrap();
    let gpkg = dir.path().join("test.gpkg");
    seed_geopackage(&gpkg, 3).await;
    let app = build_app(&gpkg, 1000).await;

    let (status, body) = get(&app, "/collections/buildings/items/2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["id"], 2);
    assert_eq!(json["type"], "Feature");
    assert_eq!(json["properties"]["name"], "building 2");
    assert_eq!(json["geometry"]["type"], "Point");
    assert_eq!(
        link(&body, "self").unwrap(),
        format!("{}/collections/buildings/items/2?f=json", BASE_URL)
    );
    assert!(link(&body, "collection").is_some());

    let (status, body) = get(&app, "/collections/buildings/items/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Feature 99 not found"));

    let (status, body) = get(&app, "/collections/buildings/items/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("feature ID must be a number"));
}

#[tokio::test]
async fn test_content_type_and_collection_shape() {
    let dir = tempfile::tempdir().unwrap();
    let gpkg = dir.path().join("test.gpkg");
    seed_geopackage(&gpkg, 2).await;
    let app = build_app(&gpkg, 1000).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/collections/buildings/items?f=json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/geo+json"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["type"], "FeatureCollection");
    assert_eq!(json["numberReturned"], 2);
    assert_eq!(json["features"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let gpkg = dir.path().join("test.gpkg");
    seed_geopackage(&gpkg, 1).await;
    let app = build_app(&gpkg, 1000).await;

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ok"));
}
