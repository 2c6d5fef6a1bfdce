//! Pictogram attachment storage.
//!
//! File writes are not transactional with the database (see the repository
//! modules): uploads land on disk before a transaction commits, and stale
//! files are removed best-effort after commit. At worst a failed
//! transaction orphans a file; a dangling row reference cannot occur.

use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::NewAttachment;

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Persists the upload and returns the stored path.
    async fn store(&self, upload: &NewAttachment) -> Result<String, CoreError>;

    /// Removes a stored file. Idempotent: a missing path is not an error.
    async fn delete(&self, path: &str) -> Result<(), CoreError>;
}

/// Filesystem-backed store writing uuid-prefixed files under one directory.
#[derive(Debug, Clone)]
pub struct FsAttachmentStore {
    base_dir: PathBuf,
}

impl FsAttachmentStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

#[async_trait]
impl AttachmentStore for FsAttachmentStore {
    async fn store(&self, upload: &NewAttachment) -> Result<String, CoreError> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        let file_name = format!("{}_{}", Uuid::new_v4(), sanitize(&upload.file_name));
        let path = self.base_dir.join(file_name);
        tokio::fs::write(&path, &upload.bytes).await?;
        Ok(path.to_string_lossy().into_owned())
    }

    async fn delete(&self, path: &str) -> Result<(), CoreError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps stored names flat: path separators and parent references in the
/// submitted file name must not escape the base directory.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        String::from("attachment")
    } else {
        cleaned
    }
}
