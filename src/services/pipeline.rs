//! The ingestion pipeline: classify each requested image, fetch its content,
//! validate, store, and persist the metadata record.
//!
//! Items are processed independently; one item's skip or fault never aborts
//! the batch. The upload response is simply the collection of records that
//! reached the `Stored` state.

use crate::{
    models::image::ImageRecord,
    services::{
        content_store::ContentStore,
        fetcher::{ContentFetcher, FetchOutcome, SkipReason},
        repository::ImageRepository,
        validate,
    },
};
use serde::Deserialize;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Status marker written by the pipeline; the only value this core produces.
pub const STATUS_SUCCESS: &str = "success";

/// One entry of an upload request: inline content or a remote link.
#[derive(Debug, Deserialize)]
pub struct ImageDescriptor {
    #[serde(rename = "originalName")]
    pub original_name: Option<String>,
    pub base64: Option<String>,
    pub link: Option<String>,
}

/// Terminal state of one batch item.
#[derive(Debug)]
pub enum ItemOutcome {
    Stored(ImageRecord),
    Skipped(SkipReason),
    Faulted,
}

/// Orchestrates the full ingest/search pipeline.
///
/// Cloneable service shared across requests; holds the repository (SQLite
/// pool), the content store root and the HTTP fetcher.
#[derive(Clone)]
pub struct IngestService {
    pub repository: ImageRepository,
    pub content_store: ContentStore,
    pub fetcher: ContentFetcher,
    public_base_url: String,
}

impl IngestService {
    pub fn new(
        repository: ImageRepository,
        content_store: ContentStore,
        fetcher: ContentFetcher,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            content_store,
            fetcher,
            public_base_url: public_base_url.into(),
        }
    }

    /// Process a batch of image descriptors for one client.
    ///
    /// Returns the stored records only; skipped and faulted items are logged
    /// and omitted. The batch itself never fails.
    pub async fn ingest_batch(
        &self,
        client_id: &str,
        images: &[ImageDescriptor],
    ) -> Vec<ImageRecord> {
        let mut stored = Vec::new();
        for (index, descriptor) in images.iter().enumerate() {
            match self.ingest_one(client_id, descriptor).await {
                ItemOutcome::Stored(record) => stored.push(record),
                ItemOutcome::Skipped(reason) => {
                    debug!(index, %reason, "skipping image");
                }
                ItemOutcome::Faulted => {
                    // Fault details were logged where they occurred.
                    debug!(index, "image faulted, continuing with the batch");
                }
            }
        }
        stored
    }

    async fn ingest_one(&self, client_id: &str, descriptor: &ImageDescriptor) -> ItemOutcome {
        let outcome = match (
            &descriptor.original_name,
            &descriptor.base64,
            &descriptor.link,
        ) {
            (Some(name), Some(encoded), _) => self.fetcher.fetch_inline(name, encoded),
            (_, _, Some(link)) => match self.fetcher.fetch_link(link).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(%err, "remote image fetch failed");
                    return ItemOutcome::Faulted;
                }
            },
            _ => return ItemOutcome::Skipped(SkipReason::UnrecognizedDescriptor),
        };

        let image = match outcome {
            FetchOutcome::Fetched(image) => image,
            FetchOutcome::Skip(reason) => return ItemOutcome::Skipped(reason),
        };

        // The fetcher already checked both, but re-validate after derivation.
        if !validate::is_allowed_format(&image.extension) {
            return ItemOutcome::Skipped(SkipReason::DisallowedFormat(image.extension));
        }
        let size_bites = image.bytes.len() as i64;
        if !validate::is_within_size_limit(size_bites) {
            return ItemOutcome::Skipped(SkipReason::TooLarge(size_bites));
        }

        // Generated disk key, never the client-supplied name, so concurrent
        // uploads of like-named files cannot overwrite each other.
        let disk_key = format!("{}.{}", Uuid::new_v4(), image.extension);
        let stored = match self.content_store.store(&image.bytes, &disk_key).await {
            Ok(stored) => stored,
            Err(err) => {
                warn!(%err, %disk_key, "failed to store image content");
                return ItemOutcome::Faulted;
            }
        };

        let url = format!(
            "{}/files/images/{}",
            self.public_base_url.trim_end_matches('/'),
            disk_key
        );

        let pending = match ImageRecord::new(
            None,
            client_id,
            &image.original_name,
            &stored.hash,
            &image.extension,
            size_bites,
            &url,
            STATUS_SUCCESS,
        ) {
            Ok(record) => record,
            Err(err) => {
                warn!(%err, "image record rejected");
                return ItemOutcome::Faulted;
            }
        };

        let id = match self.repository.insert(&pending).await {
            Ok(id) => id,
            Err(err) => {
                error!(%err, "failed to insert image record");
                return ItemOutcome::Faulted;
            }
        };
        match self.repository.fetch_by_id(id).await {
            Ok(record) => ItemOutcome::Stored(record),
            Err(err) => {
                error!(%err, id, "failed to fetch image record after insert");
                ItemOutcome::Faulted
            }
        }
    }

    /// Search a client's records by exact hash or name substring.
    pub async fn search(
        &self,
        client_id: &str,
        term: &str,
    ) -> Result<Vec<ImageRecord>, sqlx::Error> {
        self.repository.search(client_id, term).await
    }
}
