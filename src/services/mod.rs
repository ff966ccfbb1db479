//! Pipeline services, leaves first: pure validation, content fetching,
//! durable content storage, metadata persistence, and the orchestrator that
//! ties them together per batch.

pub mod content_store;
pub mod fetcher;
pub mod pipeline;
pub mod repository;
pub mod validate;
