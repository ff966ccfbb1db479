//! The persisted image metadata record.

use serde::Serialize;
use sqlx::FromRow;
use thiserror::Error;

/// `size_bites` may hold at most ten decimal digits.
pub const MAX_SIZE_BITES: i64 = 9_999_999_999;

/// Raised when a field of an image record is malformed or out of range.
///
/// This is the only error the record construction path produces; callers
/// report the message to the client as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("image id must be a positive integer")]
    Id,
    #[error("image client id must match client_<digits> (1-255 characters)")]
    ClientId,
    #[error("image original name must be 1-255 characters")]
    OriginalName,
    #[error("image hash must be 1-255 characters")]
    Hash,
    #[error("image format must be 1-6 characters")]
    Format,
    #[error("image size must be a non-negative integer of at most 10 digits")]
    SizeBites,
    #[error("image url must be 1-255 characters")]
    Url,
}

/// Metadata for one stored image.
///
/// Serialized field names are the wire contract and must stay exactly as
/// written (`clientId`, `originalName`, `sizeBites`, ...). Rust field names
/// double as the `tbl_images` column names for `FromRow`.
///
/// Two records with identical content bytes share a `hash`, but the hash is a
/// fingerprint, not an identity: duplicate uploads create duplicate rows.
#[derive(Serialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct ImageRecord {
    /// Row id assigned by the metadata store on insert; `None` before that.
    pub id: Option<i64>,

    /// Owning tenant, always lowercase `client_<digits>`.
    #[serde(rename = "clientId")]
    pub client_id: String,

    /// Filename as supplied by the client or derived from a link URL.
    #[serde(rename = "originalName")]
    pub original_name: String,

    /// MD5 over the bytes actually written to disk.
    pub hash: String,

    /// Lowercase filename extension, constrained to the format allowlist.
    pub format: String,

    /// Byte length of the stored content.
    #[serde(rename = "sizeBites")]
    pub size_bites: i64,

    /// Externally reachable location of the stored content.
    pub url: String,

    /// Pipeline outcome marker; the ingestion path only ever writes "success".
    pub status: String,
}

impl ImageRecord {
    /// Build a record, validating every field.
    ///
    /// Fails fast on the first violation, checked in order: id, client id,
    /// original name, hash, format, size, url. `client_id` is case-folded to
    /// lowercase before the pattern check. `status` is free-form.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Option<i64>,
        client_id: &str,
        original_name: &str,
        hash: &str,
        format: &str,
        size_bites: i64,
        url: &str,
        status: &str,
    ) -> Result<Self, ValidationError> {
        if let Some(value) = id {
            if value <= 0 {
                return Err(ValidationError::Id);
            }
        }

        let client_id = client_id.to_lowercase();
        if client_id.is_empty() || client_id.len() > 255 || !is_client_id_pattern(&client_id) {
            return Err(ValidationError::ClientId);
        }

        if original_name.is_empty() || original_name.len() > 255 {
            return Err(ValidationError::OriginalName);
        }

        if hash.is_empty() || hash.len() > 255 {
            return Err(ValidationError::Hash);
        }

        if format.is_empty() || format.len() > 6 {
            return Err(ValidationError::Format);
        }

        if !(0..=MAX_SIZE_BITES).contains(&size_bites) {
            return Err(ValidationError::SizeBites);
        }

        if url.is_empty() || url.len() > 255 {
            return Err(ValidationError::Url);
        }

        Ok(Self {
            id,
            client_id,
            original_name: original_name.to_string(),
            hash: hash.to_string(),
            format: format.to_string(),
            size_bites,
            url: url.to_string(),
            status: status.to_string(),
        })
    }
}

/// `client_<digits>` with at least one digit.
fn is_client_id_pattern(value: &str) -> bool {
    value
        .strip_prefix("client_")
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}
