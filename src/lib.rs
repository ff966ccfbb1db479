//! Image ingestion & retrieval service.
//!
//! Ingests image files on behalf of client applications (inline base64 or
//! remote link), persists their content under a local images root and their
//! metadata in SQLite, and supports lookup by content hash or name substring.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
