//! Defines routes for the image ingestion & retrieval API.
//!
//! ## Structure
//! - `GET  /images`                  — search records by hash or name substring
//! - `POST /images`                  — upload a batch of images (inline or link)
//! - `GET  /files/images/{key}`      — download a stored image
//! - `GET  /healthz`, `GET /readyz`  — liveness / readiness probes
//!
//! The search endpoint takes its query as a JSON body, matching the wire
//! contract of the clients this service was built for.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        image_handlers::{search_images, serve_image, upload_images},
    },
    services::pipeline::IngestService,
};
use axum::{Router, routing::get};

/// Build and return the router for all API routes.
///
/// The router carries shared state (`IngestService`) to all handlers.
pub fn routes() -> Router<IngestService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // pipeline endpoints
        .route("/images", get(search_images).post(upload_images))
        .route("/files/images/{key}", get(serve_image))
}
