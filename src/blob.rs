use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::AppError;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `bytes` under `file_name`, returning the name actually used.
    async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<String, AppError>;
}

pub struct DiskBlobStore {
    root: PathBuf,
}

impl DiskBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Strip any directory part a client may have put in the upload name.
pub fn sanitize_file_name(file_name: &str) -> Result<String, AppError> {
    Path::new(file_name.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(format!("invalid file name {file_name:?}")))
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<String, AppError> {
        // unique prefix so equal upload names never share a file
        let name = format!("{}_{}", Uuid::new_v4().simple(), sanitize_file_name(file_name)?);
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(&name);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(name)
    }
}
