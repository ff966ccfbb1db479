//! Data models for the image ingestion service.
//!
//! The single persisted entity is the image metadata record. It maps to the
//! `tbl_images` table via `sqlx::FromRow` and serializes to the wire shape
//! clients expect via `serde`.

pub mod image;
