//! Durable on-disk storage for image payloads.
//!
//! Bytes are written through a temp file and renamed into place, then the
//! content hash is computed by reading the stored file back so the hash
//! reflects what is actually on disk, not the in-memory buffer.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid storage key")]
    InvalidKey,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result of a successful store: where the bytes landed and their MD5.
#[derive(Debug)]
pub struct StoredContent {
    pub path: PathBuf,
    pub hash: String,
}

/// Writes image payloads beneath a fixed root directory.
///
/// Keys are generated by the caller (uuid + extension), so a collision means
/// the caller reused a key; a second write under the same key replaces the
/// prior file.
#[derive(Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Physical path for a storage key. Does not check existence.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Keys are single path components; anything that could escape the root
    /// is rejected.
    pub fn ensure_key_safe(key: &str) -> Result<(), StoreError> {
        if key.is_empty()
            || key.contains('/')
            || key.contains('\\')
            || key.contains("..")
            || key.bytes().any(|b| b.is_ascii_control())
        {
            return Err(StoreError::InvalidKey);
        }
        Ok(())
    }

    /// Write `bytes` under `key` and return the stored path plus the MD5 of
    /// the bytes read back from disk.
    pub async fn store(&self, bytes: &[u8], key: &str) -> Result<StoredContent, StoreError> {
        Self::ensure_key_safe(key)?;
        fs::create_dir_all(&self.root).await?;

        let final_path = self.path_for(key);
        let tmp_path = self.root.join(format!(".tmp-{}", uuid::Uuid::new_v4()));

        let mut file = File::create(&tmp_path).await?;
        if let Err(err) = write_all_durably(&mut file, bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        drop(file);

        if let Err(err) = fs::rename(&tmp_path, &final_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&final_path).await?;
                fs::rename(&tmp_path, &final_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }

        // Hash the read-back bytes to catch write corruption.
        let stored = fs::read(&final_path).await?;
        let hash = format!("{:x}", md5::compute(&stored));

        Ok(StoredContent {
            path: final_path,
            hash,
        })
    }
}

async fn write_all_durably(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}
