use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use leadgen_client::AppsScriptSink;
use leadgen_core::{ProcessedTracker, ResultStore, SheetSync, TracingSyncReporter};

use crate::integration::common::{
    BLOCKED_PEER, SLOW_CATEGORY, build_app, setup_test_app, setup_test_app_from, start_upstream,
    test_config,
};

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn search_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/search")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health() {
    let app = setup_test_app(None);

    let response = app.router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["search_configured"], false);
    assert_eq!(json["sync_configured"], false);
}

#[tokio::test]
async fn test_health_reports_configured_clients() {
    let upstream = start_upstream().await;
    let app = setup_test_app(Some(&upstream));

    let json = body_json(app.router.oneshot(get("/health")).await.unwrap()).await;
    assert_eq!(json["search_configured"], true);
    assert_eq!(json["sync_configured"], true);
}

// ---------------------------------------------------------------------------
// Allow-list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_search_from_unlisted_address_is_forbidden() {
    let upstream = start_upstream().await;
    let app = setup_test_app_from(Some(&upstream), BLOCKED_PEER);

    let response = app
        .router
        .oneshot(search_request(serde_json::json!({
            "site": "example.com", "location": "NY", "category": "bakery"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(
        json,
        serde_json::json!({"error": "Access denied: Unauthorized IP"})
    );
    assert!(upstream.log.search_calls.lock().unwrap().is_empty());
    assert!(!app.data_dir.exists());
}

#[tokio::test]
async fn test_ipv4_mapped_loopback_is_allowed() {
    let upstream = start_upstream().await;
    let app = setup_test_app_from(Some(&upstream), "[::ffff:127.0.0.1]:5000");

    let response = app
        .router
        .oneshot(search_request(serde_json::json!({
            "site": "example.com", "location": "NY", "category": "bakery"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_file_routes_are_public() {
    let app = setup_test_app_from(None, BLOCKED_PEER);

    let response = app.router.oneshot(get("/api/files")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_search_scrapes_saves_and_syncs_once() {
    let upstream = start_upstream().await;
    let app = setup_test_app(Some(&upstream));

    let response = app
        .router
        .clone()
        .oneshot(search_request(serde_json::json!({
            "site": "example.com", "location": "NY", "category": "bakery", "num": 5
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let records = body_json(response).await;
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["title"], "Sunrise Bakery");
    assert_eq!(
        records[0]["emails"],
        serde_json::json!(["hello@sunrise.com", "hello@sunrise.com"])
    );
    assert_eq!(records[1]["title"], "Gone Bakery");
    assert_eq!(records[1]["emails"], serde_json::json!([]));
    assert_eq!(records[2]["emails"], serde_json::json!(["orders@cornercakes.io"]));
    assert_eq!(records[2]["website"], "");
    assert_eq!(records[2]["location"], "");

    {
        let calls = upstream.log.search_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["engine"], "google");
        assert_eq!(calls[0]["q"], "site:example.com NY bakery");
        assert_eq!(calls[0]["num"], "5");
        assert_eq!(calls[0]["api_key"], "test-key");
    }

    let store = ResultStore::new(&app.data_dir);
    let files = store.list_json().await.unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("site_example_com_NY_bakery_"));

    let saved: serde_json::Value =
        serde_json::from_str(&store.read(&files[0]).await.unwrap()).unwrap();
    assert_eq!(saved.as_array().unwrap().len(), 3);

    let tracker = Arc::new(ProcessedTracker::new(&app.processed_file));
    let sink = AppsScriptSink::new(app.config.google_script_url.clone().unwrap()).unwrap();
    let sync = SheetSync::new(store, tracker, sink);

    let first = sync.run_cycle(&TracingSyncReporter).await.unwrap();
    assert_eq!(first.forwarded, 1);
    let second = sync.run_cycle(&TracingSyncReporter).await.unwrap();
    assert_eq!(second.forwarded, 0);
    assert_eq!(second.already_processed, 1);

    let processed = sync.tracker().load().await;
    assert_eq!(processed.files(), [files[0].clone()]);

    let posts = upstream.log.sheet_posts.lock().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(
        posts[0]["sheetName"],
        files[0].trim_end_matches(".json")
    );
    assert_eq!(posts[0]["data"], saved);
}

#[tokio::test]
async fn test_search_finishes_and_saves_after_caller_disconnects() {
    let upstream = start_upstream().await;
    let app = setup_test_app(Some(&upstream));

    let request = app.router.clone().oneshot(search_request(serde_json::json!({
        "site": "example.com", "location": "NY", "category": SLOW_CATEGORY
    })));
    let caller = tokio::spawn(request);

    // The provider has been queried, so the fan-out task is running.
    for _ in 0..200 {
        if !upstream.log.search_calls.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(upstream.log.search_calls.lock().unwrap().len(), 1);
    assert!(!caller.is_finished());

    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());

    let store = ResultStore::new(&app.data_dir);
    let mut files = Vec::new();
    for _ in 0..300 {
        files = store.list_all().await.unwrap();
        if !files.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("site_example_com_NY_slowpoke_"));

    let saved: serde_json::Value =
        serde_json::from_str(&store.read(&files[0]).await.unwrap()).unwrap();
    let saved = saved.as_array().unwrap();
    assert_eq!(saved.len(), 4);
    assert_eq!(saved[3]["emails"], serde_json::json!(["late@slowoven.com"]));
}

#[tokio::test]
async fn test_search_defaults_num_to_ten() {
    let upstream = start_upstream().await;
    let app = setup_test_app(Some(&upstream));

    let response = app
        .router
        .oneshot(search_request(serde_json::json!({
            "site": "example.com", "location": "NY", "category": "bakery"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let calls = upstream.log.search_calls.lock().unwrap();
    assert_eq!(calls[0]["num"], "10");
}

#[tokio::test]
async fn test_search_without_provider_key_fails() {
    let app = setup_test_app(None);

    let response = app
        .router
        .oneshot(search_request(serde_json::json!({
            "site": "example.com", "location": "NY", "category": "bakery"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!app.data_dir.exists());
}

#[tokio::test]
async fn test_search_provider_failure_is_bad_gateway() {
    let upstream = start_upstream().await;
    let tmp = tempfile::tempdir().unwrap();
    let mut config = test_config(&tmp, Some(&upstream));
    config.serp_api_base_url = upstream.failing_search_url();
    let app = build_app(config, tmp, "127.0.0.1:1");

    let response = app
        .router
        .oneshot(search_request(serde_json::json!({
            "site": "example.com", "location": "NY", "category": "bakery"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert!(json["error"].is_string());

    // Nothing is written when the search itself fails.
    let files = ResultStore::new(&app.data_dir).list_all().await.unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_search_rejects_malformed_body() {
    let app = setup_test_app(None);

    let response = app
        .router
        .oneshot(search_request(serde_json::json!({"site": "example.com"})))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_list_files_creates_missing_dir() {
    let app = setup_test_app(None);
    assert!(!app.data_dir.exists());

    let response = app.router.oneshot(get("/api/files")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
    assert!(app.data_dir.is_dir());
}

#[tokio::test]
async fn test_list_files_only_json() {
    let app = setup_test_app(None);
    std::fs::create_dir_all(&app.data_dir).unwrap();
    std::fs::write(app.data_dir.join("b_2.json"), "[]").unwrap();
    std::fs::write(app.data_dir.join("a_1.json"), "[]").unwrap();
    std::fs::write(app.data_dir.join("notes.txt"), "hello").unwrap();

    let response = app.router.oneshot(get("/api/files")).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json, serde_json::json!(["a_1.json", "b_2.json"]));
}

#[tokio::test]
async fn test_get_file_returns_raw_content() {
    let app = setup_test_app(None);
    std::fs::create_dir_all(&app.data_dir).unwrap();
    let content = "[{\"title\": \"A\",  \"emails\": []}]";
    std::fs::write(app.data_dir.join("q_1.json"), content).unwrap();

    let response = app.router.oneshot(get("/api/data/q_1.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    assert_eq!(body_bytes(response).await, content.as_bytes());
}

#[tokio::test]
async fn test_get_file_rejects_traversal() {
    let app = setup_test_app(None);
    std::fs::write(app.config.processed_file.clone(), "{\"sentFiles\":[]}").unwrap();

    let response = app
        .router
        .oneshot(get("/api/data/..%2Fprocessed.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid filename provided.");
}

#[tokio::test]
async fn test_get_missing_file_is_not_found() {
    let app = setup_test_app(None);

    let response = app
        .router
        .oneshot(get("/api/data/nope_1.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "File not found.");
}

#[tokio::test]
async fn test_download_all_bundles_json_files() {
    let app = setup_test_app(None);
    std::fs::create_dir_all(&app.data_dir).unwrap();
    std::fs::write(app.data_dir.join("a_1.json"), "[1]").unwrap();
    std::fs::write(app.data_dir.join("b_2.json"), "[2]").unwrap();
    std::fs::write(app.data_dir.join("skip.txt"), "x").unwrap();

    let response = app.router.oneshot(get("/api/download-all")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"all_scraper_data.zip\""
    );

    let bytes = body_bytes(response).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 2);

    let mut content = String::new();
    archive
        .by_name("b_2.json")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "[2]");
    assert!(archive.by_name("skip.txt").is_err());
}

#[tokio::test]
async fn test_swagger_spec_is_served() {
    let app = setup_test_app(None);

    let response = app
        .router
        .oneshot(get("/api-docs/openapi.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["paths"]["/search"].is_object());
    assert!(json["paths"]["/api/data/{filename}"].is_object());
}
