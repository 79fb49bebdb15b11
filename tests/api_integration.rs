use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crypto_monitor::api::routes::create_router;
use crypto_monitor::api::state::AppState;
use crypto_monitor::config::ColumnMapping;
use crypto_monitor::services::cache::SnapshotCache;
use crypto_monitor::services::listing::{RawTable, SnapshotSource};
use crypto_monitor::types::errors::AcquisitionError;

const COLUMNS: &str = r#"{
    "select_columns": ["name", "price", "volume", "c1h", "c24h", "c7d", "c30d", "c60d", "c90d", "ytd"],
    "new_col_names": ["Cryptocurrency", "Price", "Volume24h", "PercentChange1h", "PercentChange24h",
                      "PercentChange7d", "PercentChange30d", "PercentChange60d", "PercentChange90d",
                      "YTDPricePercentChange"],
    "period_column_mapping": {
        "1h": "PercentChange1h", "24h": "PercentChange24h", "7d": "PercentChange7d",
        "30d": "PercentChange30d", "60d": "PercentChange60d", "90d": "PercentChange90d"
    }
}"#;

/// Serves the three-coin listing, or fails every fetch when `broken`.
struct FixedSource {
    broken: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl SnapshotSource for FixedSource {
    async fn fetch(&self) -> Result<RawTable, AcquisitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err(AcquisitionError::Status(503));
        }

        let rows = json!([
            { "name": "A", "price": 100.0, "volume": 50.0, "c1h": 1.0, "c24h": 2.0, "c7d": 3.0,
              "c30d": -4.0, "c60d": 0.0, "c90d": 9.0, "ytd": 10.0 },
            { "name": "B", "price": 200.0, "volume": 500.0, "c1h": -1.0, "c24h": 2.0, "c7d": 3.0,
              "c30d": 5.0, "c60d": 1.0, "c90d": -9.0, "ytd": 50.0 },
            { "name": "C", "price": 50.0, "volume": 10.0, "c1h": 0.5, "c24h": 1.0, "c7d": 1.5,
              "c30d": 0.0, "c60d": -1.0, "c90d": 2.0, "ytd": 5.0 }
        ]);
        Ok(serde_json::from_value(rows).unwrap())
    }
}

/// An established coin next to a young one whose long-window changes are null.
struct YoungCoinSource;

#[async_trait]
impl SnapshotSource for YoungCoinSource {
    async fn fetch(&self) -> Result<RawTable, AcquisitionError> {
        let rows = json!([
            { "name": "Old", "price": 10.0, "volume": 5.0, "c1h": 1.0, "c24h": 1.0, "c7d": 1.0,
              "c30d": 1.0, "c60d": 2.0, "c90d": 3.0, "ytd": 4.0 },
            { "name": "Young", "price": 1.0, "volume": 1.0, "c1h": 0.1, "c24h": 0.2, "c7d": 0.3,
              "c30d": null, "c60d": null, "c90d": null, "ytd": null }
        ]);
        Ok(serde_json::from_value(rows).unwrap())
    }
}

fn router_for(source: Arc<dyn SnapshotSource>, insights_enabled: bool, refreshes_per_minute: u32) -> Router {
    let mapping = ColumnMapping::from_json(COLUMNS).unwrap();
    let cache = Arc::new(SnapshotCache::new(
        source,
        Arc::new(mapping),
        Duration::from_secs(300),
    ));
    let state = AppState::new(cache, refreshes_per_minute, insights_enabled);
    create_router(state)
}

fn app_with(broken: bool, insights_enabled: bool, refreshes_per_minute: u32) -> (Router, Arc<FixedSource>) {
    let source = Arc::new(FixedSource {
        broken,
        calls: AtomicUsize::new(0),
    });
    let router = router_for(source.clone(), insights_enabled, refreshes_per_minute);
    (router, source)
}

fn app() -> Router {
    app_with(false, true, 6).0
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, "GET", uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn names(rows: &Value, index: usize) -> Vec<String> {
    rows.as_array()
        .unwrap()
        .iter()
        .map(|row| row[index].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_coins_top_n_by_price() {
    let app = app();
    let (status, body) = get_json(&app, "/coins?top=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["columns"][0], "Cryptocurrency");
    assert_eq!(names(&body["rows"], 0), vec!["B", "A"]);
    assert_eq!(body["dimension"], json!({ "rows": 2, "columns": 10 }));
    assert_eq!(body["snapshot"]["generation"], 1);
    assert!(body["fetched_at"].is_string());
    assert_eq!(body["fetched_at"], body["snapshot"]["fetched_at"]);
}

#[tokio::test]
async fn test_top_beyond_row_count_is_clamped() {
    let (status, body) = get_json(&app(), "/coins?top=100").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body["rows"], 0), vec!["B", "A", "C"]);
}

#[tokio::test]
async fn test_top_out_of_range_rejected() {
    let app = app();
    for uri in [
        "/coins?top=0",
        "/coins?top=101",
        "/coins?top=abc",
        "/coins?top=-1",
        "/charts/price?top=0",
        "/charts/change?top=1.5",
        "/coins.csv?top=500",
    ] {
        let (status, body) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["code"], 400);
    }
}

#[tokio::test]
async fn test_insights() {
    let (status, body) = get_json(&app(), "/insights").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["most_traded"], json!(["B", "A", "C"]));
    assert_eq!(body["highest_ytd"], json!(["B", "A", "C"]));
    assert_eq!(body["steady_growth"], json!({ "status": "found", "coins": ["A", "C"] }));
    assert_eq!(body["display"]["steady_growth"], "A, C");
}

#[tokio::test]
async fn test_insights_ignore_top_n() {
    let app = app();
    get_json(&app, "/coins?top=1").await;
    let (_, body) = get_json(&app, "/insights").await;
    assert_eq!(body["most_traded"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_insights_disabled() {
    let (app, _) = app_with(false, false, 6);
    let (status, _) = get_json(&app, "/insights").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_price_chart_ascending() {
    let (status, body) = get_json(&app(), "/charts/price?top=3").await;
    assert_eq!(status, StatusCode::OK);
    let bars: Vec<&str> = body["bars"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["name"].as_str().unwrap())
        .collect();
    assert_eq!(bars, vec!["C", "A", "B"]);
}

#[tokio::test]
async fn test_change_chart() {
    let (status, body) = get_json(&app(), "/charts/change?top=3&timeframe=30d").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timeframe"], "30d");
    assert_eq!(body["column"], "PercentChange30d");
    assert_eq!(
        body["bars"],
        json!([
            { "name": "A", "change": -4.0, "positive": false, "color": "red" },
            { "name": "C", "change": 0.0, "positive": false, "color": "red" },
            { "name": "B", "change": 5.0, "positive": true, "color": "green" }
        ])
    );
}

#[tokio::test]
async fn test_change_chart_null_change() {
    let app = router_for(Arc::new(YoungCoinSource), true, 6);
    let (status, body) = get_json(&app, "/charts/change?top=2&timeframe=60d").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["bars"],
        json!([
            { "name": "Old", "change": 2.0, "positive": true, "color": "green" },
            { "name": "Young", "change": null, "positive": false, "color": "red" }
        ])
    );

    let (_, coins) = get_json(&app, "/coins?top=2").await;
    assert_eq!(coins["rows"][1][6], Value::Null);
}

#[tokio::test]
async fn test_change_chart_unknown_timeframe() {
    let (status, body) = get_json(&app(), "/charts/change?timeframe=2w").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("2w"));
}

#[tokio::test]
async fn test_csv_download() {
    let app = app();
    let request = Request::builder()
        .uri("/coins.csv?top=2")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"crypto_price.csv\""
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let mut reader = csv::Reader::from_reader(body.as_ref());
    assert_eq!(reader.headers().unwrap().len(), 10);
    let first: Vec<String> = reader
        .records()
        .map(|r| r.unwrap()[0].to_string())
        .collect();
    assert_eq!(first, vec!["B", "A"]);
}

#[tokio::test]
async fn test_snapshot_fetched_once_across_requests() {
    let (app, source) = app_with(false, true, 6);
    get_json(&app, "/coins?top=5").await;
    get_json(&app, "/coins?top=1").await;
    get_json(&app, "/charts/change?timeframe=7d").await;
    get_json(&app, "/insights").await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let (app, _) = app_with(true, true, 6);
    let (status, body) = get_json(&app, "/coins").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("503"));

    let (_, health) = get_json(&app, "/health").await;
    assert_eq!(health["snapshot"], Value::Null);
}

#[tokio::test]
async fn test_refresh_is_rate_limited() {
    let (app, source) = app_with(false, true, 1);

    let (status, body) = send(&app, "POST", "/refresh").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["snapshot"]["generation"], 1);

    let (status, _) = send(&app, "POST", "/refresh").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}
