//! HTTP handlers for image upload, search, and serving stored files.
//!
//! Request/response framing only; all domain decisions live in the pipeline
//! services. Wire field names (`clientId`, `rows_returned`, `tasks`, ...) are
//! the compatibility contract and must not change.

use crate::{
    errors::AppError,
    services::{
        content_store::ContentStore,
        pipeline::{ImageDescriptor, IngestService},
    },
};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::io::ErrorKind;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

/// Body of `GET /images`. Both fields are mandatory.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(rename = "clientId")]
    pub client_id: Option<String>,
    pub search: Option<String>,
}

/// Body of `POST /images`.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    #[serde(rename = "clientId")]
    pub client_id: Option<String>,
    pub images: Option<Vec<ImageDescriptor>>,
}

/// `GET /images` — search a client's records by hash or name substring.
///
/// Searches either fully succeed or fully fail; a repository failure is
/// fatal to the request.
pub async fn search_images(
    State(service): State<IngestService>,
    Json(request): Json<SearchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut missing = Vec::new();
    if request.client_id.is_none() {
        missing.push("Client ID field is mandatory and must be provided");
    }
    if request.search.is_none() {
        missing.push("Search field is mandatory and must be provided");
    }
    if !missing.is_empty() {
        return Err(AppError::bad_request(missing.join("; ")));
    }
    let client_id = request.client_id.unwrap_or_default();
    let search = request.search.unwrap_or_default();

    let records = service.search(&client_id, &search).await.map_err(|err| {
        tracing::error!(%err, "search query failed");
        AppError::internal("Failed to get images")
    })?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "rows_returned": records.len(),
            "tasks": records,
        })),
    ))
}

/// `POST /images` — ingest a batch of images for a client.
///
/// Per-item skips and faults never fail the request; the response carries
/// whichever records were stored, possibly none.
pub async fn upload_images(
    State(service): State<IngestService>,
    Json(request): Json<UploadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut missing = Vec::new();
    if request.client_id.is_none() {
        missing.push("Client ID field is mandatory and must be provided");
    }
    if request.images.is_none() {
        missing.push("Images field is mandatory and must be provided");
    }
    if !missing.is_empty() {
        return Err(AppError::bad_request(missing.join("; ")));
    }
    let client_id = request.client_id.unwrap_or_default();
    let images = request.images.unwrap_or_default();

    let stored = service.ingest_batch(&client_id, &images).await;

    Ok((StatusCode::CREATED, Json(json!({ "images": stored }))))
}

/// `GET /files/images/{key}` — stream a stored image back.
pub async fn serve_image(
    State(service): State<IngestService>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    if ContentStore::ensure_key_safe(&key).is_err() {
        return Err(AppError::bad_request("invalid image key"));
    }

    let path = service.content_store.path_for(&key);
    let file = File::open(&path).await.map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            AppError::not_found("image not found")
        } else {
            AppError::internal(err.to_string())
        }
    })?;
    let len = file
        .metadata()
        .await
        .map_err(|err| AppError::internal(err.to_string()))?
        .len();

    let body = Body::from_stream(ReaderStream::new(file));
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static(content_type_for(&key)),
    );
    if let Ok(value) = header::HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }

    Ok(response)
}

fn content_type_for(key: &str) -> &'static str {
    match key.rsplit('.').next().unwrap_or("") {
        "gif" => "image/gif",
        "jpeg" | "jpg" => "image/jpeg",
        "png" => "image/png",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}
