//! Resolves the bytes of an inbound image, either from inline base64 content
//! or from a remote link.
//!
//! The fetcher is the first gate of the pipeline: it derives the extension,
//! obtains a real byte size (for links via a HEAD probe, before any body
//! download) and applies the format/size checks. A failed check yields a
//! [`SkipReason`], not an error; only transport problems surface as
//! [`FetchError`].

use crate::services::validate::{is_allowed_format, is_within_size_limit};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use reqwest::{StatusCode, header};
use std::{fmt, time::Duration};
use thiserror::Error;

/// Content resolved for one batch item, ready for storage.
#[derive(Debug)]
pub struct FetchedImage {
    pub bytes: Bytes,
    pub original_name: String,
    pub extension: String,
}

/// Why a batch item was excluded without being an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Descriptor carries neither inline content nor a link.
    UnrecognizedDescriptor,
    /// No extension could be derived from the name or URL path.
    NoExtension,
    /// Extension is outside the format allowlist.
    DisallowedFormat(String),
    /// Measured or probed size exceeds the ceiling.
    TooLarge(i64),
    /// Remote probe reported no usable Content-Length.
    UnknownSize,
    /// Inline content is not decodable base64.
    UndecodableContent,
    /// Link is not a parseable URL with a file path.
    BadLink,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedDescriptor => write!(f, "neither inline content nor link provided"),
            Self::NoExtension => write!(f, "no file extension"),
            Self::DisallowedFormat(ext) => write!(f, "format `{ext}` is not allowed"),
            Self::TooLarge(size) => write!(f, "size {size} exceeds the limit"),
            Self::UnknownSize => write!(f, "remote size unknown"),
            Self::UndecodableContent => write!(f, "inline content is not valid base64"),
            Self::BadLink => write!(f, "link is not a usable URL"),
        }
    }
}

/// Outcome of resolving one descriptor: content, or a deliberate exclusion.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(FetchedImage),
    Skip(SkipReason),
}

/// Transport-level failure while talking to a remote host. These fault the
/// item rather than skipping it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("requesting `{url}`: {source}")]
    Request {
        url: String,
        source: reqwest::Error,
    },
    #[error("`{url}` returned status {status}")]
    Status { url: String, status: StatusCode },
}

/// Fetches image content with bounded, verified remote requests.
///
/// One `reqwest::Client` is built at startup; its timeout bounds both the
/// size probe and the body download, redirects are followed (reqwest's
/// default policy) and TLS certificates are always verified.
#[derive(Clone)]
pub struct ContentFetcher {
    http: reqwest::Client,
}

impl ContentFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Inline variant: name plus base64-encoded content.
    ///
    /// Accepts both raw base64 and `data:...;base64,` payloads. The byte
    /// length is measured directly from the decoded content.
    pub fn fetch_inline(&self, original_name: &str, encoded: &str) -> FetchOutcome {
        let Some(extension) = extension_of(original_name) else {
            return FetchOutcome::Skip(SkipReason::NoExtension);
        };
        if !is_allowed_format(&extension) {
            return FetchOutcome::Skip(SkipReason::DisallowedFormat(extension));
        }

        let payload = match encoded.split_once(',') {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => encoded,
        };
        let bytes = match general_purpose::STANDARD.decode(payload.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return FetchOutcome::Skip(SkipReason::UndecodableContent),
        };

        let size = bytes.len() as i64;
        if !is_within_size_limit(size) {
            return FetchOutcome::Skip(SkipReason::TooLarge(size));
        }

        FetchOutcome::Fetched(FetchedImage {
            bytes: Bytes::from(bytes),
            original_name: original_name.to_string(),
            extension,
        })
    }

    /// Link variant: probe the remote size first, download only once the
    /// extension and the probed size both pass.
    pub async fn fetch_link(&self, link: &str) -> Result<FetchOutcome, FetchError> {
        let Some((original_name, extension)) = link_name_parts(link) else {
            return Ok(FetchOutcome::Skip(SkipReason::BadLink));
        };
        if extension.is_empty() {
            return Ok(FetchOutcome::Skip(SkipReason::NoExtension));
        }
        if !is_allowed_format(&extension) {
            return Ok(FetchOutcome::Skip(SkipReason::DisallowedFormat(extension)));
        }

        let probed = match self.probe_size(link).await? {
            Some(size) => size,
            None => return Ok(FetchOutcome::Skip(SkipReason::UnknownSize)),
        };
        if !is_within_size_limit(probed) {
            return Ok(FetchOutcome::Skip(SkipReason::TooLarge(probed)));
        }

        let response = self
            .http
            .get(link)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: link.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: link.to_string(),
                status,
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Request {
                url: link.to_string(),
                source,
            })?;

        // The probe is advisory; the download is what counts.
        let size = bytes.len() as i64;
        if !is_within_size_limit(size) {
            return Ok(FetchOutcome::Skip(SkipReason::TooLarge(size)));
        }

        Ok(FetchOutcome::Fetched(FetchedImage {
            bytes,
            original_name,
            extension,
        }))
    }

    /// HEAD request reading `Content-Length` without downloading the body.
    /// `None` when the remote does not report a parseable length.
    async fn probe_size(&self, link: &str) -> Result<Option<i64>, FetchError> {
        let response = self
            .http
            .head(link)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: link.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: link.to_string(),
                status,
            });
        }

        Ok(response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i64>().ok()))
    }
}

/// Last `.`-separated segment of a filename, lowercased.
///
/// A name without a dot yields the whole name; the allowlist decides its
/// fate. A trailing dot yields nothing.
fn extension_of(name: &str) -> Option<String> {
    let last = name.rsplit('.').next().unwrap_or("");
    if last.is_empty() {
        None
    } else {
        Some(last.to_lowercase())
    }
}

/// Derive `(basename, extension)` from a link URL path.
///
/// Query parameters never take part in path parsing; `Url::path_segments`
/// already excludes them.
pub(crate) fn link_name_parts(link: &str) -> Option<(String, String)> {
    let url = reqwest::Url::parse(link).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let basename = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())?
        .to_string();
    let extension = extension_of(&basename).unwrap_or_default();
    Some((basename, extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::validate::MAX_IMAGE_BYTES;

    fn fetcher() -> ContentFetcher {
        ContentFetcher::new(Duration::from_secs(5)).unwrap()
    }

    fn encode(bytes: &[u8]) -> String {
        general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn inline_decodes_and_derives_extension() {
        let outcome = fetcher().fetch_inline("Photo.PNG", &encode(b"123456789"));
        match outcome {
            FetchOutcome::Fetched(image) => {
                assert_eq!(&image.bytes[..], b"123456789");
                assert_eq!(image.extension, "png");
                assert_eq!(image.original_name, "Photo.PNG");
            }
            other => panic!("expected fetched content, got {other:?}"),
        }
    }

    #[test]
    fn inline_accepts_data_url_payloads() {
        let encoded = format!("data:image/png;base64,{}", encode(b"abc"));
        match fetcher().fetch_inline("a.png", &encoded) {
            FetchOutcome::Fetched(image) => assert_eq!(&image.bytes[..], b"abc"),
            other => panic!("expected fetched content, got {other:?}"),
        }
    }

    #[test]
    fn inline_skips_disallowed_extension() {
        match fetcher().fetch_inline("malware.exe", &encode(b"abc")) {
            FetchOutcome::Skip(SkipReason::DisallowedFormat(ext)) => assert_eq!(ext, "exe"),
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn inline_skips_oversized_content() {
        let bytes = vec![0u8; (MAX_IMAGE_BYTES + 1) as usize];
        match fetcher().fetch_inline("big.png", &encode(&bytes)) {
            FetchOutcome::Skip(SkipReason::TooLarge(size)) => {
                assert_eq!(size, MAX_IMAGE_BYTES + 1)
            }
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn inline_skips_undecodable_content() {
        match fetcher().fetch_inline("a.png", "not base64 at all!!!") {
            FetchOutcome::Skip(SkipReason::UndecodableContent) => {}
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn link_parsing_strips_query_parameters() {
        let (name, ext) =
            link_name_parts("https://cdn.example.com/img/cat.JPG?width=400&v=7").unwrap();
        assert_eq!(name, "cat.JPG");
        assert_eq!(ext, "jpg");
    }

    #[test]
    fn link_parsing_rejects_non_http_schemes() {
        assert!(link_name_parts("ftp://example.com/a.png").is_none());
        assert!(link_name_parts("file:///etc/passwd").is_none());
    }

    #[test]
    fn link_parsing_requires_a_path_segment() {
        assert!(link_name_parts("https://example.com/").is_none());
        assert!(link_name_parts("not a url").is_none());
    }

    #[test]
    fn extension_of_handles_dotless_and_trailing_dot_names() {
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of("png").as_deref(), Some("png"));
        assert_eq!(extension_of("name."), None);
    }
}
