//! HTTP boundary scenarios: response envelopes, mandatory-field errors, and
//! health probes, driven through the real router.

use base64::{Engine as _, engine::general_purpose};
use image_store::{
    routes,
    services::{
        content_store::ContentStore,
        fetcher::ContentFetcher,
        pipeline::IngestService,
        repository::ImageRepository,
    },
};
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;
use std::{sync::Arc, time::Duration};
use tempfile::TempDir;

async fn serve_api(images_root: &TempDir) -> String {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    let sql = include_str!("../migrations/0001_init.sql");
    for stmt in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(stmt).execute(&pool).await.unwrap();
    }

    let service = IngestService::new(
        ImageRepository::new(Arc::new(pool)),
        ContentStore::new(images_root.path()),
        ContentFetcher::new(Duration::from_secs(5)).unwrap(),
        "http://localhost:3000",
    );
    let app = routes::routes::routes().with_state(service);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

fn inline_payload(name: &str, bytes: &[u8]) -> Value {
    json!({
        "originalName": name,
        "base64": general_purpose::STANDARD.encode(bytes),
    })
}

#[tokio::test]
async fn upload_and_search_use_the_contract_envelopes() {
    let root = TempDir::new().unwrap();
    let base = serve_api(&root).await;
    let client = client();

    let upload = client
        .post(format!("{base}/images"))
        .json(&json!({
            "clientId": "client_1",
            "images": [inline_payload("a.png", b"123456789")],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(upload.status(), 201);

    let body: Value = upload.json().await.unwrap();
    let images = body["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    let record = images[0].as_object().unwrap();
    for key in [
        "id",
        "clientId",
        "originalName",
        "hash",
        "format",
        "sizeBites",
        "url",
        "status",
    ] {
        assert!(record.contains_key(key), "missing {key}");
    }
    assert_eq!(record["format"], "png");
    assert_eq!(record["sizeBites"], 9);

    let search = client
        .get(format!("{base}/images"))
        .json(&json!({ "clientId": "client_1", "search": "a" }))
        .send()
        .await
        .unwrap();
    assert_eq!(search.status(), 200);

    let body: Value = search.json().await.unwrap();
    assert_eq!(body["rows_returned"], 1);
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks[0]["originalName"], "a.png");
}

#[tokio::test]
async fn upload_with_only_skipped_items_still_reports_success() {
    let root = TempDir::new().unwrap();
    let base = serve_api(&root).await;

    let upload = client()
        .post(format!("{base}/images"))
        .json(&json!({
            "clientId": "client_1",
            "images": [inline_payload("a.exe", b"MZ binary")],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(upload.status(), 201);

    let body: Value = upload.json().await.unwrap();
    assert_eq!(body["images"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn search_with_missing_fields_returns_the_mandatory_messages() {
    let root = TempDir::new().unwrap();
    let base = serve_api(&root).await;

    let response = client()
        .get(format!("{base}/images"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Client ID field is mandatory and must be provided"));
    assert!(message.contains("Search field is mandatory and must be provided"));
}

#[tokio::test]
async fn upload_with_missing_images_field_returns_the_mandatory_message() {
    let root = TempDir::new().unwrap();
    let base = serve_api(&root).await;

    let response = client()
        .post(format!("{base}/images"))
        .json(&json!({ "clientId": "client_1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Images field is mandatory and must be provided"));
    assert!(!message.contains("Client ID"));
}

#[tokio::test]
async fn stored_files_are_served_back_with_their_content_type() {
    let root = TempDir::new().unwrap();
    let base = serve_api(&root).await;
    let client = client();

    let upload = client
        .post(format!("{base}/images"))
        .json(&json!({
            "clientId": "client_1",
            "images": [inline_payload("a.png", b"123456789")],
        }))
        .send()
        .await
        .unwrap();
    let body: Value = upload.json().await.unwrap();
    let key = body["images"][0]["url"]
        .as_str()
        .unwrap()
        .rsplit('/')
        .next()
        .unwrap()
        .to_string();

    let download = client
        .get(format!("{base}/files/images/{key}"))
        .send()
        .await
        .unwrap();
    assert_eq!(download.status(), 200);
    assert_eq!(
        download.headers()["content-type"].to_str().unwrap(),
        "image/png"
    );
    assert_eq!(&download.bytes().await.unwrap()[..], b"123456789");

    let missing = client
        .get(format!("{base}/files/images/no-such-key.png"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn healthz_and_readyz_report_their_check_shapes() {
    let root = TempDir::new().unwrap();
    let base = serve_api(&root).await;
    let client = client();

    let health = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert_eq!(health.status(), 200);
    let body: Value = health.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let ready = client.get(format!("{base}/readyz")).send().await.unwrap();
    assert_eq!(ready.status(), 200);
    let body: Value = ready.json().await.unwrap();
    let checks = body["checks"].as_object().unwrap();
    assert_eq!(checks["sqlite"]["ok"], true);
    assert_eq!(checks["disk"]["ok"], true);
}
